//! # 工具模块
//!
//! - `url` - URL 解析与绝对化
//! - `page_id` - 页面标识符的规范化与链接过滤

pub mod page_id;
pub mod url;

// Re-export commonly used items for convenience
pub use page_id::{normalize_page_name, PageId};
pub use url::{absolutize, is_root_relative, resolve_url, Url};
