//! HTTP 页面抓取
//!
//! [`PageFetcher`] 是渲染抓取器的抽象边界：给定页面标识符，返回页面源码与
//! 解析出的元数据；超时与网络错误显式返回错误，不会静默成功。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::core::MirrorError;
use crate::parsers::html::{decode_html, parse_page_metadata, PageMetadata};
use crate::utils::{PageId, Url};

/// 抓取结果
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub markup: String,
    /// 页面内嵌的结构化元数据，缺失时为 `None`
    pub metadata: Option<PageMetadata>,
}

impl FetchedPage {
    /// 由页面源码构建，同时解析元数据
    pub fn from_markup(markup: String) -> Self {
        let metadata = parse_page_metadata(&markup);
        Self { markup, metadata }
    }
}

/// 页面抓取能力
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, page: &PageId) -> Result<FetchedPage, MirrorError>;
}

/// 基于 reqwest 的抓取器
///
/// 每次调用独立发起请求，任务之间不共享会话状态（连接池除外）。
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(base_url: Url, user_agent: &str, timeout: Duration) -> Result<Self, MirrorError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// 页面在源站点上的地址
    pub fn page_url(&self, page: &PageId) -> Result<Url, MirrorError> {
        self.base_url
            .join(&page.relative_href())
            .map_err(|e| MirrorError::FetchFailure {
                page: page.to_string(),
                reason: format!("无效的页面地址: {}", e),
            })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, page: &PageId) -> Result<FetchedPage, MirrorError> {
        let url = self.page_url(page)?;
        tracing::debug!("[{}] 开始抓取页面: {}", page, url);

        let failure = |error: reqwest::Error| {
            if error.is_timeout() {
                MirrorError::FetchTimeout {
                    page: page.to_string(),
                    seconds: self.timeout.as_secs(),
                }
            } else {
                MirrorError::FetchFailure {
                    page: page.to_string(),
                    reason: error.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(failure)?;
        let status = response.status();

        // 不存在的文章返回 404，但页面里仍有 RLCONF（wgArticleId = 0）
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(MirrorError::FetchFailure {
                page: page.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or_else(|| "utf-8".to_string());
        let body = response.bytes().await.map_err(failure)?;
        Ok(FetchedPage::from_markup(decode_html(&body, &charset)))
    }
}

/// 从 Content-Type 中取出 charset 参数
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|charset| !charset.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_are_built_from_ids() {
        let fetcher = HttpFetcher::new(
            Url::parse("https://en.tankiwiki.com").unwrap(),
            "wikimirror-test",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = fetcher.page_url(&PageId::new("Gold Boxes").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://en.tankiwiki.com/Gold_Boxes");

        let url = fetcher.page_url(&PageId::new("What?").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://en.tankiwiki.com/What%3F");
    }

    #[test]
    fn fetched_page_parses_metadata() {
        let page = FetchedPage::from_markup(
            r#"<script>RLCONF={"wgArticleId":5,"wgCurRevisionId":11,"wgPageName":"A"};</script>"#
                .to_string(),
        );
        let metadata = page.metadata.unwrap();
        assert_eq!(metadata.canonical_title.as_deref(), Some("A"));
    }

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html; charset=UTF-8").as_deref(),
            Some("UTF-8")
        );
        assert_eq!(
            charset_from_content_type(r#"text/html;Charset="windows-1251""#).as_deref(),
            Some("windows-1251")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }
}
