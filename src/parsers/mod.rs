//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作、元数据处理、资源改写
//! - `link_rewriter` - 链接重写与内部链接发现

pub mod html;
pub mod link_rewriter;

// Re-export commonly used items for convenience
pub use html::{decode_html, parse_html, parse_page_metadata, PageMetadata};
pub use link_rewriter::{collect_internal_links, rewrite_links_in_dom};
