//! # 构建器模块
//!
//! - `html_builder` - 文档模板组装、重定向页面与辅助客户端脚本
//! - `writer` - 输出写入（`PageWriter`）

pub mod html_builder;
pub mod writer;

// Re-export commonly used items for convenience
pub use html_builder::{HtmlBuilder, HtmlBuilderConfig, PageParts};
pub use writer::{FsPageWriter, PageWriter};
