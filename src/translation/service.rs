//! 翻译服务
//!
//! [`TextTranslator`] 是翻译能力的抽象边界：给定文本与语言对，返回译文或错误。
//! 默认实现 [`DeeplxTranslator`] 使用 DeepLX 兼容的 HTTP 接口。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};

/// 外部翻译能力
#[async_trait]
pub trait TextTranslator: Send + Sync {
    /// 翻译一段文本，可能失败
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String>;

    /// 用于日志的服务名称
    fn name(&self) -> &str {
        "translator"
    }
}

#[derive(Debug, Serialize)]
struct DeeplxRequest<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeeplxResponse {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// DeepLX 协议的 HTTP 翻译客户端
#[derive(Debug, Clone)]
pub struct DeeplxTranslator {
    client: Client,
    api_url: String,
}

impl DeeplxTranslator {
    /// 创建客户端，`timeout` 同时约束连接与响应
    pub fn new(api_url: &str, timeout: Duration) -> TranslationResult<Self> {
        if api_url.trim().is_empty() {
            return Err(TranslationError::ConfigError("翻译 API 地址为空".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim().to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl TextTranslator for DeeplxTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        let request = DeeplxRequest {
            text,
            source_lang,
            target_lang,
        };

        let response = self.client.post(&self.api_url).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslationError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(TranslationError::TranslationServiceError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: DeeplxResponse = response.json().await?;
        match (parsed.code, parsed.data) {
            (Some(code), _) if code != 200 => Err(TranslationError::TranslationServiceError(
                format!("服务返回代码 {}: {}", code, parsed.message.unwrap_or_default()),
            )),
            (_, Some(data)) => Ok(data),
            (_, None) => Err(TranslationError::ParseError("响应中缺少 data 字段".to_string())),
        }
    }

    fn name(&self) -> &str {
        "deeplx"
    }
}
