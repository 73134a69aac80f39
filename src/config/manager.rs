//! 配置管理器
//!
//! 加载顺序：`.env` 文件 → 配置文件（显式路径或搜索路径）→ 环境变量覆盖。
//! 命令行参数由调用方在最后覆盖。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::builders::HtmlBuilderConfig;
use crate::core::MirrorError;
use crate::transform::TransformSettings;
use crate::translation::ProcessorConfig;
use crate::utils::{PageId, Url};

/// 源站点
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub start_page: String,
    /// 最近更改源的 API 路径
    pub api_path: String,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_BASE_URL.to_string(),
            start_page: constants::DEFAULT_START_PAGE.to_string(),
            api_path: "/w/api.php".to_string(),
            user_agent: format!("wikimirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// 总是重新处理的页面
    pub force_pages: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            fetch_timeout_secs: 60,
            force_pages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationSection {
    pub api_url: String,
    /// 备用翻译服务，空字符串表示不使用
    pub fallback_api_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub max_fragment_chars: usize,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
}

impl Default for TranslationSection {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            fallback_api_url: String::new(),
            source_lang: "EN".to_string(),
            target_lang: "ZH".to_string(),
            max_fragment_chars: 990,
            max_attempts: 5,
            retry_delay_ms: 1500,
            request_timeout_secs: 30,
            max_concurrent_requests: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: String,
    /// 相对路径相对于输出目录
    pub revision_file: String,
    pub redirect_file: String,
    /// 文件路径或 http(s) 地址
    pub dictionary: String,
    pub resource_map: String,
    pub template: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: "./output".to_string(),
            revision_file: "last_edit_info.json".to_string(),
            redirect_file: "redirect_map.json".to_string(),
            dictionary: String::new(),
            resource_map: String::new(),
            template: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    pub html_lang: String,
    pub strip_selectors: Vec<String>,
    pub excluded_text_selectors: Vec<String>,
    pub fact_box_selector: String,
    pub facts_file: String,
    pub home_label: String,
    pub color_replacements: BTreeMap<String, String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        let settings = TransformSettings::default();
        let builder = HtmlBuilderConfig::default();
        Self {
            html_lang: builder.lang,
            strip_selectors: settings.strip_selectors,
            excluded_text_selectors: settings.excluded_text_selectors,
            fact_box_selector: settings.fact_box_selector.unwrap_or_default(),
            facts_file: builder.facts_file,
            home_label: builder.home_label,
            color_replacements: settings.color_replacements,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub translation: TranslationSection,
    pub paths: PathsConfig,
    pub transform: TransformConfig,
}

impl MirrorConfig {
    /// 验证配置
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.crawl.concurrency == 0 {
            return Err(MirrorError::Config("并发数不能为0".to_string()));
        }

        if self.translation.max_attempts == 0 {
            return Err(MirrorError::Config("翻译尝试次数不能为0".to_string()));
        }

        if self.translation.max_fragment_chars == 0 {
            return Err(MirrorError::Config("片段最大长度不能为0".to_string()));
        }

        if self.translation.max_concurrent_requests == 0 {
            return Err(MirrorError::Config("翻译并发数不能为0".to_string()));
        }

        self.base_url()?;
        self.start_page()?;
        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{crawl, paths, site, translation, EnvVar};

        if let Some(base_url) = site::BaseUrl::get_override() {
            self.site.base_url = base_url;
        }

        if let Some(start_page) = site::StartPage::get_override() {
            self.site.start_page = start_page;
        }

        if let Some(concurrency) = crawl::Concurrency::get_override() {
            self.crawl.concurrency = concurrency;
        }

        if let Some(timeout) = crawl::FetchTimeout::get_override() {
            self.crawl.fetch_timeout_secs = timeout.as_secs();
        }

        if let Some(output_dir) = paths::OutputDir::get_override() {
            self.paths.output_dir = output_dir;
        }

        if let Some(api_url) = translation::ApiUrl::get_override() {
            self.translation.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.translation.api_url);
        }

        if let Some(fallback) = translation::FallbackUrl::get_override() {
            self.translation.fallback_api_url = fallback;
        }

        if let Some(source_lang) = translation::SourceLang::get_override() {
            self.translation.source_lang = source_lang;
        }

        if let Some(target_lang) = translation::TargetLang::get_override() {
            self.translation.target_lang = target_lang;
        }
    }

    pub fn base_url(&self) -> Result<Url, MirrorError> {
        Url::parse(self.site.base_url.trim()).map_err(|e| {
            MirrorError::Config(format!("无效的站点地址 {}: {}", self.site.base_url, e))
        })
    }

    pub fn start_page(&self) -> Result<PageId, MirrorError> {
        PageId::new(&self.site.start_page).ok_or_else(|| {
            MirrorError::Config(format!("无效的起始页面: '{}'", self.site.start_page))
        })
    }

    /// 最近更改源的完整地址
    pub fn api_url(&self) -> Result<Url, MirrorError> {
        self.base_url()?.join(&self.site.api_path).map_err(|e| {
            MirrorError::Config(format!("无效的 API 路径 {}: {}", self.site.api_path, e))
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl.fetch_timeout_secs)
    }

    pub fn force_pages(&self) -> Vec<PageId> {
        self.crawl
            .force_pages
            .iter()
            .filter_map(|name| PageId::new(name))
            .collect()
    }

    pub fn fallback_api_url(&self) -> Option<&str> {
        Some(self.translation.fallback_api_url.trim()).filter(|url| !url.is_empty())
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.paths.output_dir).into_owned())
    }

    pub fn revision_path(&self) -> PathBuf {
        self.state_path(&self.paths.revision_file)
    }

    pub fn redirect_path(&self) -> PathBuf {
        self.state_path(&self.paths.redirect_file)
    }

    fn state_path(&self, file: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(file).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            self.output_dir().join(expanded)
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        let t = &self.translation;
        ProcessorConfig {
            source_lang: t.source_lang.clone(),
            target_lang: t.target_lang.clone(),
            max_fragment_chars: t.max_fragment_chars,
            max_attempts: t.max_attempts,
            retry_delay: Duration::from_millis(t.retry_delay_ms),
            request_timeout: Duration::from_secs(t.request_timeout_secs),
            max_concurrent_requests: t.max_concurrent_requests,
        }
    }

    pub fn builder_config(&self) -> HtmlBuilderConfig {
        HtmlBuilderConfig {
            template_path: Some(self.paths.template.clone()).filter(|p| !p.trim().is_empty()),
            lang: self.transform.html_lang.clone(),
            home_label: self.transform.home_label.clone(),
            facts_file: self.transform.facts_file.clone(),
        }
    }

    pub fn transform_settings(&self) -> TransformSettings {
        let t = &self.transform;
        TransformSettings {
            strip_selectors: t.strip_selectors.clone(),
            excluded_text_selectors: t.excluded_text_selectors.clone(),
            fact_box_selector: Some(t.fact_box_selector.clone()).filter(|s| !s.trim().is_empty()),
            color_replacements: t.color_replacements.clone(),
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: MirrorConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 加载配置：显式路径必须存在，否则按搜索路径查找
    pub fn load(explicit: Option<&Path>) -> Result<Self, MirrorError> {
        Self::load_dotenv();

        let (mut config, source) = match explicit {
            Some(path) => (Self::load_from_file(path)?, Some(path.to_path_buf())),
            None => match Self::discover() {
                Some(path) => (Self::load_from_file(&path)?, Some(path)),
                None => {
                    tracing::info!("未找到配置文件，使用默认配置");
                    (MirrorConfig::default(), None)
                }
            },
        };

        if let Some(path) = &source {
            tracing::info!("加载配置文件: {}", path.display());
        }

        config.apply_env_overrides();
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn into_config(self) -> MirrorConfig {
        self.config
    }

    /// 实际读取的配置文件
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn discover() -> Option<PathBuf> {
        constants::CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).into_owned()))
            .find(|path| path.exists())
    }

    /// 从指定文件加载配置，按扩展名选择 TOML 或 JSON
    pub fn load_from_file(path: &Path) -> Result<MirrorConfig, MirrorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::Config(format!("读取配置文件 {} 失败: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| MirrorError::Config(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| MirrorError::Config(format!("解析TOML配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &Path) -> Result<(), MirrorError> {
        let content = toml::to_string_pretty(&MirrorConfig::default())
            .map_err(|e| MirrorError::Config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MirrorError::Config(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = MirrorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_page().unwrap().as_str(), "Tanki_Online_Wiki");
        assert_eq!(
            config.api_url().unwrap().as_str(),
            "https://en.tankiwiki.com/w/api.php"
        );
        assert!(config.fallback_api_url().is_none());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = MirrorConfig::default();
        config.crawl.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.translation.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.site.start_page = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wikimirror.toml");
        std::fs::write(
            &path,
            "[crawl]\nconcurrency = 4\nforce_pages = [\"Gold Boxes\"]\n\n[paths]\noutput_dir = \"/srv/mirror\"\n",
        )
        .unwrap();

        let config = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(config.crawl.concurrency, 4);
        assert_eq!(config.crawl.fetch_timeout_secs, 60);
        assert_eq!(config.force_pages(), vec![PageId::new("Gold_Boxes").unwrap()]);
        assert_eq!(config.revision_path(), PathBuf::from("/srv/mirror/last_edit_info.json"));
        assert_eq!(config.translation.max_fragment_chars, 990);
    }

    #[test]
    fn json_config_is_detected_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"translation": {"fallback_api_url": "http://backup:1188/translate"}}"#)
            .unwrap();

        let config = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(config.fallback_api_url(), Some("http://backup:1188/translate"));
    }

    #[test]
    fn example_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("example.toml");
        ConfigManager::generate_example_config(&path).unwrap();

        let config = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(config.transform.facts_file, "facts.json");
        assert_eq!(
            config.transform.color_replacements.get("rgb(70, 223, 17)").map(String::as_str),
            Some("#76FF33")
        );
    }

    #[test]
    fn settings_conversions() {
        let mut config = MirrorConfig::default();
        config.transform.fact_box_selector = String::new();
        config.translation.retry_delay_ms = 10;

        assert!(config.transform_settings().fact_box_selector.is_none());
        assert_eq!(config.processor_config().retry_delay, Duration::from_millis(10));
        assert!(config.builder_config().template_path.is_none());
    }
}
