//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。翻译错误永远不会越过翻译适配器：
//! 适配器按 [`TranslationError::is_retryable`] 决定重试还是直接降级。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 速率限制错误
    #[error("请求速率过快，已达到限制")]
    RateLimitExceeded,

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 翻译服务错误
    #[error("翻译服务错误: {0}")]
    TranslationServiceError(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::TimeoutError(_) => true,
            TranslationError::TranslationServiceError(_) => true,
            // 限流之后等待固定间隔再试
            TranslationError::RateLimitExceeded => true,
            TranslationError::ParseError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::InvalidInput(_) => false,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self, context);

        match self {
            TranslationError::ConfigError(_) => TranslationError::ConfigError(new_msg),
            TranslationError::NetworkError(_) => TranslationError::NetworkError(new_msg),
            TranslationError::InvalidInput(_) => TranslationError::InvalidInput(new_msg),
            TranslationError::TranslationServiceError(_) => {
                TranslationError::TranslationServiceError(new_msg)
            }
            TranslationError::TimeoutError(_) => TranslationError::TimeoutError(new_msg),
            TranslationError::ParseError(_) => TranslationError::ParseError(new_msg),
            TranslationError::RateLimitExceeded => TranslationError::RateLimitExceeded,
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::TimeoutError(error.to_string())
        } else if error.is_decode() {
            TranslationError::ParseError(error.to_string())
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for TranslationError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        TranslationError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_input_and_config_errors_are_final() {
        assert!(TranslationError::NetworkError("x".into()).is_retryable());
        assert!(TranslationError::RateLimitExceeded.is_retryable());
        assert!(!TranslationError::InvalidInput("x".into()).is_retryable());
        assert!(!TranslationError::ConfigError("x".into()).is_retryable());
    }

    #[test]
    fn context_is_appended_to_message() {
        let error = TranslationError::NetworkError("连接被拒绝".into()).with_context("DeepLX");
        assert!(error.to_string().contains("连接被拒绝"));
        assert!(error.to_string().contains("上下文: DeepLX"));
    }
}
