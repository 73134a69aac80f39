//! 数据源加载
//!
//! 术语词典与资源替换表都是静态的键值映射文档，来源可以是本地文件或
//! http(s) 地址，格式按扩展名识别（`.toml` 为 TOML，其余按 JSON 解析）。
//! 页面列表是按行分隔的纯文本文件。

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use reqwest::Client;

use crate::core::MirrorError;
use crate::utils::url::is_url_and_has_protocol;
use crate::utils::PageId;

/// 映射文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    Json,
    Toml,
}

impl MappingFormat {
    /// 按扩展名识别格式（忽略查询参数）
    pub fn detect(source: &str) -> Self {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        if path.to_ascii_lowercase().ends_with(".toml") {
            MappingFormat::Toml
        } else {
            MappingFormat::Json
        }
    }
}

/// 解析映射文档
pub fn parse_mapping(
    content: &str,
    format: MappingFormat,
    source_name: &str,
) -> Result<BTreeMap<String, String>, MirrorError> {
    let load_error = |reason: String| MirrorError::SourceLoad {
        source_name: source_name.to_string(),
        reason,
    };

    match format {
        MappingFormat::Json => serde_json::from_str(content).map_err(|e| load_error(e.to_string())),
        MappingFormat::Toml => toml::from_str(content).map_err(|e| load_error(e.to_string())),
    }
}

/// 从本地文件或 URL 加载映射文档
pub async fn load_mapping(
    source: &str,
    timeout: Duration,
) -> Result<BTreeMap<String, String>, MirrorError> {
    let format = MappingFormat::detect(source);
    let content = if is_url_and_has_protocol(source) {
        fetch_text(source, timeout).await?
    } else {
        let expanded = shellexpand::tilde(source).into_owned();
        tokio::fs::read_to_string(&expanded)
            .await
            .map_err(|e| MirrorError::SourceLoad {
                source_name: source.to_string(),
                reason: e.to_string(),
            })?
    };

    let mapping = parse_mapping(&content, format, source)?;
    tracing::info!("已加载 {} ({} 条)", source, mapping.len());
    Ok(mapping)
}

/// 加载可选的映射文档：未配置时为空，加载失败时记录错误并返回空映射
pub async fn load_optional_mapping(
    source: Option<&str>,
    timeout: Duration,
) -> BTreeMap<String, String> {
    let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
        return BTreeMap::new();
    };

    match load_mapping(source, timeout).await {
        Ok(mapping) => mapping,
        Err(error) => {
            tracing::error!("{}，将使用空映射", error);
            BTreeMap::new()
        }
    }
}

async fn fetch_text(url: &str, timeout: Duration) -> Result<String, MirrorError> {
    let load_error = |reason: String| MirrorError::SourceLoad {
        source_name: url.to_string(),
        reason,
    };

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| load_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| load_error(e.to_string()))?;
    if !response.status().is_success() {
        return Err(load_error(format!("网络请求失败: {}", response.status())));
    }

    response.text().await.map_err(|e| load_error(e.to_string()))
}

/// 解析页面列表：每行一个页面，忽略空行与 `#` 注释，按首次出现顺序去重
pub fn parse_page_list(content: &str) -> Vec<PageId> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(PageId::new)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// 读取页面列表文件；文件无法读取或列表为空都是错误
pub fn load_page_list(path: &Path) -> Result<Vec<PageId>, MirrorError> {
    let content = std::fs::read_to_string(path).map_err(|e| MirrorError::SourceLoad {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let pages = parse_page_list(&content);
    if pages.is_empty() {
        return Err(MirrorError::SourceLoad {
            source_name: path.display().to_string(),
            reason: "页面列表为空".to_string(),
        });
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection() {
        assert_eq!(MappingFormat::detect("dict.toml"), MappingFormat::Toml);
        assert_eq!(MappingFormat::detect("https://x/dict.TOML?v=2"), MappingFormat::Toml);
        assert_eq!(MappingFormat::detect("https://x/translations.json"), MappingFormat::Json);
    }

    #[test]
    fn json_and_toml_mappings() {
        let json = parse_mapping(r#"{"Tank": "坦克"}"#, MappingFormat::Json, "t").unwrap();
        assert_eq!(json["Tank"], "坦克");

        let toml = parse_mapping("\"Gold Box\" = \"金箱子\"\n", MappingFormat::Toml, "t").unwrap();
        assert_eq!(toml["Gold Box"], "金箱子");

        assert!(matches!(
            parse_mapping("const x = {};", MappingFormat::Json, "t"),
            Err(MirrorError::SourceLoad { .. })
        ));
    }

    #[tokio::test]
    async fn local_files_load_and_missing_optional_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.json");
        std::fs::write(&path, r#"{"https://a/x.png": "https://b/y.png"}"#).unwrap();

        let mapping = load_mapping(path.to_str().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(mapping.len(), 1);

        let missing = dir.path().join("missing.json");
        let empty = load_optional_mapping(missing.to_str(), Duration::from_secs(1)).await;
        assert!(empty.is_empty());
    }

    #[test]
    fn page_lists() {
        let pages = parse_page_list("# changed\nCrystals\n\nGold Boxes\nGold_Boxes\n");
        let names: Vec<&str> = pages.iter().map(PageId::as_str).collect();
        assert_eq!(names, vec!["Crystals", "Gold_Boxes"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.txt");
        std::fs::write(&path, "\n# nothing\n").unwrap();
        assert!(load_page_list(&path).is_err());
        assert!(load_page_list(&dir.path().join("absent.txt")).is_err());
    }
}
