//! # 网络模块
//!
//! - `session` - 页面抓取（`PageFetcher` 抽象与 HTTP 实现）
//! - `feed` - MediaWiki 最近更改源
//! - `sources` - 词典、资源替换表与页面列表的加载

pub mod feed;
pub mod session;
pub mod sources;

// Re-export commonly used items for convenience
pub use feed::RecentChangesFeed;
pub use session::{FetchedPage, HttpFetcher, PageFetcher};
pub use sources::{load_mapping, load_optional_mapping, load_page_list, parse_page_list};
