//! 配置管理模块
//!
//! 支持配置文件（TOML / JSON）、`.env`、环境变量与默认值

pub mod manager;

// Re-export commonly used items for convenience
pub use manager::{
    ConfigManager, CrawlConfig, MirrorConfig, PathsConfig, SiteConfig, TransformConfig,
    TranslationSection,
};

/// 配置常量
pub mod constants {
    pub const DEFAULT_BASE_URL: &str = "https://en.tankiwiki.com";
    pub const DEFAULT_START_PAGE: &str = "Tanki_Online_Wiki";
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "wikimirror.toml",
        ".wikimirror.toml",
        "~/.config/wikimirror/config.toml",
    ];
}
