//! 翻译处理器模块
//!
//! 翻译适配器：对单个文本片段执行“检查、重试、降级、超长分割”，
//! 并保证永远返回一个字符串。
//!
//! 处理规则：
//! - 空白文本直接返回空字符串
//! - 不含源语言字母的文本原样返回
//! - 不超过长度上限的文本提交给主翻译服务，失败按固定间隔重试，
//!   仍失败时尝试一次备用服务，最后退回原文
//! - 超长文本按句子切分后逐句处理，再按原顺序拼接

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Duration};

use crate::translation::error::TranslationError;
use crate::translation::service::TextTranslator;

/// 句子终止符
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// 处理器配置
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub source_lang: String,
    pub target_lang: String,
    /// 单次请求允许的最大字符数
    pub max_fragment_chars: usize,
    /// 主服务的最大尝试次数（含第一次）
    pub max_attempts: usize,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    /// 全局同时在途的翻译请求上限
    pub max_concurrent_requests: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            source_lang: "EN".to_string(),
            target_lang: "ZH".to_string(),
            max_fragment_chars: 990,
            max_attempts: 5,
            retry_delay: Duration::from_millis(1500),
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 16,
        }
    }
}

/// 翻译统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    /// 发往主服务的请求数
    pub requests: usize,
    pub retries: usize,
    /// 使用备用服务的次数
    pub fallbacks: usize,
    /// 无需翻译、原样返回的片段数
    pub pass_throughs: usize,
    /// 所有服务都失败、退回原文的片段数
    pub failures: usize,
    /// 被切分的超长片段数
    pub splits: usize,
}

#[derive(Debug, Default)]
struct ProcessorStats {
    requests: AtomicUsize,
    retries: AtomicUsize,
    fallbacks: AtomicUsize,
    pass_throughs: AtomicUsize,
    failures: AtomicUsize,
    splits: AtomicUsize,
}

impl ProcessorStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TranslationStats {
        TranslationStats {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            pass_throughs: self.pass_throughs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
        }
    }
}

/// 翻译处理器
///
/// 可在多个页面任务之间共享（`Arc<TranslationProcessor>`），
/// 统计与请求许可都是线程安全的。
pub struct TranslationProcessor {
    primary: Arc<dyn TextTranslator>,
    fallback: Option<Arc<dyn TextTranslator>>,
    config: ProcessorConfig,
    permits: Arc<Semaphore>,
    stats: ProcessorStats,
}

impl TranslationProcessor {
    /// 创建新的翻译处理器
    pub fn new(primary: Arc<dyn TextTranslator>, config: ProcessorConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Self {
            primary,
            fallback: None,
            config,
            permits,
            stats: ProcessorStats::default(),
        }
    }

    /// 设置备用翻译服务
    pub fn with_fallback(mut self, fallback: Arc<dyn TextTranslator>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn stats(&self) -> TranslationStats {
        self.stats.snapshot()
    }

    /// 翻译一个片段，永不失败
    pub async fn translate(&self, fragment: &str) -> String {
        if fragment.chars().count() <= self.config.max_fragment_chars {
            return self.translate_bounded(fragment).await;
        }

        if fragment.trim().is_empty() {
            return String::new();
        }
        if !has_source_alphabet(fragment) {
            ProcessorStats::bump(&self.stats.pass_throughs);
            return fragment.to_string();
        }

        let units = split_oversize(fragment, self.config.max_fragment_chars);
        ProcessorStats::bump(&self.stats.splits);
        tracing::info!(
            "[文本分割] 检测到超长文本 (长度: {})，分割为 {} 段",
            fragment.chars().count(),
            units.len()
        );

        let mut translated = String::with_capacity(fragment.len());
        for unit in units {
            // 硬切产生的纯空白片段原样保留
            if unit.trim().is_empty() {
                translated.push_str(unit);
                continue;
            }
            translated.push_str(&self.translate_bounded(unit).await);
        }
        translated
    }

    /// 处理不超过长度上限的片段
    async fn translate_bounded(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        if !has_source_alphabet(text) {
            ProcessorStats::bump(&self.stats.pass_throughs);
            return text.to_string();
        }

        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            ProcessorStats::bump(&self.stats.requests);

            let error = match self.request(self.primary.as_ref(), text).await {
                Ok(translated) => {
                    if attempt > 1 {
                        tracing::debug!("翻译在第 {} 次尝试后成功", attempt);
                    }
                    return if translated.trim().is_empty() {
                        text.to_string()
                    } else {
                        translated
                    };
                }
                Err(error) => error,
            };

            tracing::warn!(
                "[翻译尝试 {}/{}] 翻译失败: {}",
                attempt,
                attempts,
                truncate_message(&error.to_string(), 100)
            );

            if !error.is_retryable() {
                break;
            }
            if attempt < attempts {
                ProcessorStats::bump(&self.stats.retries);
                sleep(self.config.retry_delay).await;
            }
        }

        if let Some(fallback) = &self.fallback {
            ProcessorStats::bump(&self.stats.fallbacks);
            match self.request(fallback.as_ref(), text).await {
                Ok(translated) if !translated.trim().is_empty() => return translated,
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!("备用翻译服务失败: {}", error);
                }
            }
        }

        ProcessorStats::bump(&self.stats.failures);
        tracing::error!("翻译在 {} 次尝试后仍然失败，返回原始文本", attempts);
        text.to_string()
    }

    async fn request(
        &self,
        translator: &dyn TextTranslator,
        text: &str,
    ) -> Result<String, TranslationError> {
        // 信号量不会被关闭；拿不到许可时照常发送
        let _permit = self.permits.acquire().await.ok();

        timeout(
            self.config.request_timeout,
            translator.translate(text, &self.config.source_lang, &self.config.target_lang),
        )
        .await?
        .map_err(|error| error.with_context(translator.name()))
    }
}

/// 是否包含源语言（拉丁）字母
pub fn has_source_alphabet(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

/// 把超长文本切分为不超过 `max_chars` 的片段
///
/// 先按句子切分（终止符与其后的空白留在句尾），仍然超长的句子再按空白
/// 或字符边界硬切。所有片段按顺序拼接后与输入完全相同。
pub fn split_oversize(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    split_sentences(text)
        .into_iter()
        .flat_map(|sentence| hard_split(sentence, max_chars))
        .collect()
}

/// 按 `.`、`!`、`?` 切分句子，终止符后的空白保留在句尾
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }

        // "..." 或 "?!" 视为同一个终止符
        while let Some(&(_, next)) = chars.peek() {
            if SENTENCE_TERMINATORS.contains(&next) {
                chars.next();
            } else {
                break;
            }
        }
        while let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        let end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
        sentences.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

fn hard_split(text: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // 窗口末尾（第 max_chars 个字符之后）的字节偏移
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..window_end];

        let cut = window
            .char_indices()
            .rev()
            .find(|&(i, c)| c.is_whitespace() && i > 0)
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(window_end);

        pieces.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }

    pieces
}

fn truncate_message(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
