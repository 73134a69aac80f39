//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `selector`: 简单 CSS 选择器查询
//! - `serializer`: 序列化功能
//! - `parser`: 属性解析（srcset）
//! - `metadata`: 页面元数据提取
//! - `assets`: 资源地址改写与资源替换表
//! - `utils`: 常量与文本规范化

pub mod assets;
pub mod dom;
pub mod metadata;
pub mod parser;
pub mod selector;
pub mod serializer;
pub mod utils;

pub use assets::{rebase_body_tail, rebase_head_elements, rewrite_resources, ResourceMap};
pub use dom::{
    decode_html, find_nodes, get_node_attr, get_node_name, get_parent_node, parse_html,
    set_node_attr,
};
pub use metadata::{get_body_classes, get_title, parse_page_metadata, PageMetadata};
pub use parser::{parse_srcset, SrcSetItem};
pub use selector::{query_all, query_first, Selector};
pub use serializer::{serialize_children, serialize_node};
pub use utils::{collapse_cjk_gaps, normalize_markup, WHITESPACES};
