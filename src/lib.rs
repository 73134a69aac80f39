//! # Wikimirror Library
//!
//! 把远程 MediaWiki 站点增量镜像为本地化的静态副本：沿内部链接发现页面，
//! 按修订号检测变化，改写链接与资源，先术语替换再机器翻译，并持久化状态，
//! 使重复运行既便宜又幂等。
//!
//! ## 模块组织
//!
//! - `core` - 错误类型与单页处理流程
//! - `scheduler` - 抓取队列与并发控制循环
//! - `transform` - 内容转换
//! - `parsers` - HTML 解析、查询与链接改写
//! - `translation` - 术语词典与翻译适配器
//! - `network` - 页面抓取、最近更改源与数据源加载
//! - `storage` - 修订记录与重定向地图
//! - `builders` - 文档组装与输出写入
//! - `config` / `env` - 配置文件与环境变量
//! - `utils` - 页面标识符与 URL 工具

pub mod builders;
pub mod config;
pub mod core;
pub mod env;
pub mod network;
pub mod parsers;
pub mod scheduler;
pub mod storage;
pub mod transform;
pub mod translation;
pub mod utils;

// Re-export commonly used items for convenience
pub use core::{decide_change, ChangeDecision, MirrorError, PageOutcome, PagePipeline, PageResult};
pub use scheduler::{CrawlReport, CrawlStats, ForcePolicy, Frontier, Scheduler, SchedulerOptions};
pub use storage::{RedirectMap, RevisionId, RevisionMap};
pub use transform::{ContentTransformer, TransformSettings};
pub use utils::PageId;
