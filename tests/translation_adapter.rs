//! 翻译适配器集成测试
//!
//! 直通、超长分割、重试与备用服务

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use wikimirror::translation::{
    Dictionary, ProcessorConfig, TextTranslator, TranslationError, TranslationProcessor,
    TranslationResult,
};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{fast_processor_config, FlakyTranslator, TaggingTranslator};

/// 总是返回不可重试错误
#[derive(Default)]
struct RejectingTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextTranslator for RejectingTranslator {
    async fn translate(&self, _: &str, _: &str, _: &str) -> TranslationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TranslationError::InvalidInput("text rejected".to_string()))
    }
}

#[tokio::test]
async fn fragments_without_source_letters_pass_through() {
    let translator = Arc::new(TaggingTranslator::default());
    let processor = TranslationProcessor::new(translator.clone(), fast_processor_config());

    for fragment in ["水晶 价格", "1 000 000", "— 3.5 —", "（车体）"] {
        assert_eq!(processor.translate(fragment).await, fragment);
    }
    assert_eq!(processor.translate("   ").await, "");
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(processor.stats().pass_throughs, 4);
}

#[tokio::test]
async fn oversize_fragments_are_split_into_sentences() {
    let translator = Arc::new(TaggingTranslator::default());
    let processor = TranslationProcessor::new(
        translator.clone(),
        ProcessorConfig {
            max_fragment_chars: 40,
            ..fast_processor_config()
        },
    );

    let sentences = [
        "Crystals are the main currency. ",
        "Gold boxes drop crystals! ",
        "42. ",
        "Can you catch them? ",
        "Good luck.",
    ];
    let fragment: String = sentences.concat();
    assert!(fragment.chars().count() > 40);

    let translated = processor.translate(&fragment).await;
    let expected: String = sentences
        .iter()
        .map(|s| if s.starts_with("42") { s.to_string() } else { format!("[ZH]{}", s) })
        .collect();

    assert_eq!(translated, expected);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 4);
    assert_eq!(processor.stats().splits, 1);
}

#[tokio::test]
async fn long_whitespace_runs_survive_splitting() {
    let translator = Arc::new(TaggingTranslator::default());
    let processor = TranslationProcessor::new(
        translator.clone(),
        ProcessorConfig {
            max_fragment_chars: 10,
            ..fast_processor_config()
        },
    );

    let fragment = format!("Hello.{}World.", " ".repeat(30));
    let translated = processor.translate(&fragment).await;

    assert_eq!(translated.replace("[ZH]", ""), fragment);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let flaky = Arc::new(FlakyTranslator::new(2, "OK:"));
    let processor = TranslationProcessor::new(flaky.clone(), fast_processor_config());

    assert_eq!(processor.translate("Hello").await, "OK:Hello");
    assert_eq!(flaky.calls(), 3);

    let stats = processor.stats();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn fallback_runs_after_retries_are_exhausted() {
    let primary = Arc::new(FlakyTranslator::broken());
    let fallback = Arc::new(TaggingTranslator::default());
    let processor = TranslationProcessor::new(
        primary.clone(),
        ProcessorConfig {
            max_attempts: 3,
            ..fast_processor_config()
        },
    )
    .with_fallback(fallback.clone());

    assert_eq!(processor.translate("Hello").await, "[ZH]Hello");
    assert_eq!(primary.calls(), 3);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    assert_eq!(processor.stats().fallbacks, 1);
}

#[tokio::test]
async fn total_failure_returns_original_text() {
    let primary = Arc::new(FlakyTranslator::broken());
    let fallback = Arc::new(FlakyTranslator::broken());
    let processor = TranslationProcessor::new(
        primary.clone(),
        ProcessorConfig {
            max_attempts: 2,
            ..fast_processor_config()
        },
    )
    .with_fallback(fallback.clone());

    assert_eq!(processor.translate("Keep me").await, "Keep me");
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(processor.stats().failures, 1);
}

#[tokio::test]
async fn non_retryable_errors_skip_remaining_attempts() {
    let primary = Arc::new(RejectingTranslator::default());
    let processor = TranslationProcessor::new(primary.clone(), fast_processor_config());

    assert_eq!(processor.translate("Hello").await, "Hello");
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(processor.stats().retries, 0);
}

#[tokio::test]
async fn dictionary_runs_before_translation() {
    let mut terms = BTreeMap::new();
    terms.insert("Tank".to_string(), "坦克".to_string());
    terms.insert("Tank Body".to_string(), "车体".to_string());
    terms.insert("Crystal".to_string(), "水晶".to_string());
    let dictionary = Dictionary::new(terms).unwrap();

    let translator = Arc::new(TaggingTranslator::default());
    let processor = TranslationProcessor::new(translator.clone(), fast_processor_config());

    let substituted = dictionary.substitute("A Tank Body part");
    assert_eq!(substituted, "A 车体 part");
    assert_eq!(processor.translate(&substituted).await, "[ZH]A 车体 part");

    // 完全被词典覆盖的片段不再请求翻译
    let substituted = dictionary.substitute("Crystals");
    assert_eq!(processor.translate(&substituted).await, "水晶");
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
}
