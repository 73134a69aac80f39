//! 翻译模块
//!
//! 提供术语替换与机器翻译功能：
//! - **dictionary**: 术语词典（复数扩展、最长优先、整词匹配）
//! - **collector**: 从 DOM 收集翻译片段并写回
//! - **processor**: 翻译适配器（重试、备用服务、超长分割）
//! - **service**: 翻译能力抽象与 DeepLX HTTP 实现
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wikimirror::translation::{DeeplxTranslator, ProcessorConfig, TranslationProcessor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = DeeplxTranslator::new("http://localhost:1188/translate", Duration::from_secs(30))?;
//! let processor = TranslationProcessor::new(Arc::new(service), ProcessorConfig::default());
//! let text = processor.translate("Crystals are the main currency.").await;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod dictionary;
pub mod error;
pub mod processor;
pub mod service;

pub use collector::{TextCollector, TextItem};
pub use dictionary::Dictionary;
pub use error::{TranslationError, TranslationResult};
pub use processor::{ProcessorConfig, TranslationProcessor, TranslationStats};
pub use service::{DeeplxTranslator, TextTranslator};
