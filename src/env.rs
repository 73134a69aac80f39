//! 统一的环境变量管理系统
//!
//! 类型安全、可验证的环境变量访问器。所有变量都是可选的覆盖项，
//! 未设置时由配置文件或默认值决定。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::DEFAULT.ok_or_else(|| EnvError {
                variable: Self::NAME.to_string(),
                message: "Environment variable not set".to_string(),
            }),
        }
    }

    /// 已设置但无法解析时记录警告并返回 `None`
    fn get_override() -> Option<T> {
        if env::var_os(Self::NAME).is_none() {
            return None;
        }
        match Self::get() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("忽略环境变量: {}", e);
                None
            }
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "WIKIMIRROR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何非空值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 源站点相关环境变量
pub mod site {
    use super::*;

    pub struct BaseUrl;
    impl EnvVar<String> for BaseUrl {
        const NAME: &'static str = "WIKIMIRROR_BASE_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the mirrored wiki";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    pub struct StartPage;
    impl EnvVar<String> for StartPage {
        const NAME: &'static str = "WIKIMIRROR_START_PAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Seed page, also written as index.html";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 抓取相关环境变量
pub mod crawl {
    use super::*;

    pub struct Concurrency;
    impl EnvVar<usize> for Concurrency {
        const NAME: &'static str = "WIKIMIRROR_CONCURRENCY";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Maximum number of pages processed at once";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 256)
        }
    }

    /// 单页抓取超时（秒）
    pub struct FetchTimeout;
    impl EnvVar<Duration> for FetchTimeout {
        const NAME: &'static str = "WIKIMIRROR_FETCH_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Page fetch timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_positive_usize(value, Self::NAME, 1, 3600).map(|secs| Duration::from_secs(secs as u64))
        }
    }
}

/// 输出路径相关环境变量
pub mod paths {
    use super::*;

    pub struct OutputDir;
    impl EnvVar<String> for OutputDir {
        const NAME: &'static str = "WIKIMIRROR_OUTPUT_DIR";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Directory the mirrored pages are written to";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "WIKIMIRROR_TRANSLATION_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Primary translation API endpoint (DeepLX protocol)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 备用 API URL，空值表示关闭备用服务
    pub struct FallbackUrl;
    impl EnvVar<String> for FallbackUrl {
        const NAME: &'static str = "WIKIMIRROR_TRANSLATION_FALLBACK_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Secondary translation API endpoint, empty to disable";

        fn parse(value: &str) -> EnvResult<String> {
            if value.trim().is_empty() {
                return Ok(String::new());
            }
            parse_http_url(value, Self::NAME)
        }
    }

    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "WIKIMIRROR_TRANSLATION_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language code, e.g. EN";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME)
        }
    }

    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "WIKIMIRROR_TRANSLATION_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language code, e.g. ZH";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME)
        }
    }
}

fn parse_non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    match url::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid URL '{}'. Must be an http(s) URL", value),
        }),
    }
}

fn parse_lang(value: &str, var_name: &str) -> EnvResult<String> {
    let lang = value.trim().to_uppercase();
    let valid = (2..=5).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-');
    if !valid {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid language code '{}'", value),
        });
    }
    Ok(lang)
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let entries = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (site::BaseUrl::NAME, site::BaseUrl::DESCRIPTION),
        (site::StartPage::NAME, site::StartPage::DESCRIPTION),
        (crawl::Concurrency::NAME, crawl::Concurrency::DESCRIPTION),
        (crawl::FetchTimeout::NAME, crawl::FetchTimeout::DESCRIPTION),
        (paths::OutputDir::NAME, paths::OutputDir::DESCRIPTION),
        (translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION),
        (translation::FallbackUrl::NAME, translation::FallbackUrl::DESCRIPTION),
        (translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION),
        (translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION),
    ];

    let mut docs = String::from("# Environment Variables\n\n");
    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(translation::ApiUrl::parse("http://localhost:1188/translate").is_ok());
        assert!(site::BaseUrl::parse("https://en.tankiwiki.com").is_ok());

        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
        assert!(site::BaseUrl::parse("not-a-url").is_err());
        assert_eq!(translation::FallbackUrl::parse("  ").unwrap(), "");
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(crawl::Concurrency::parse("16").unwrap(), 16);
        assert!(crawl::Concurrency::parse("0").is_err());
        assert!(crawl::Concurrency::parse("1000").is_err());
        assert!(crawl::Concurrency::parse("many").is_err());
        assert_eq!(
            crawl::FetchTimeout::parse("90").unwrap(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(translation::TargetLang::parse("zh").unwrap(), "ZH");
        assert_eq!(translation::SourceLang::parse("en-gb").unwrap(), "EN-GB");
        assert!(translation::TargetLang::parse("chinese!").is_err());
    }

    #[test]
    fn test_no_color_accepts_any_value() {
        assert!(core::NoColor::parse("1").unwrap());
        assert!(!core::NoColor::parse("").unwrap());
    }

    #[test]
    fn test_docs_list_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("WIKIMIRROR_BASE_URL"));
        assert!(docs.contains("WIKIMIRROR_TRANSLATION_FALLBACK_URL"));
        assert!(docs.contains("NO_COLOR"));
    }
}
