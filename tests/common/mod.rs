// 集成测试公共模块
//
// 内存抓取器（合成的 MediaWiki 页面）、脚本化翻译服务与内存输出

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use wikimirror::builders::{HtmlBuilder, HtmlBuilderConfig, PageWriter};
use wikimirror::network::{FetchedPage, PageFetcher};
use wikimirror::parsers::html::ResourceMap;
use wikimirror::translation::{
    Dictionary, ProcessorConfig, TextTranslator, TranslationError, TranslationProcessor,
    TranslationResult,
};
use wikimirror::utils::Url;
use wikimirror::{ContentTransformer, MirrorError, PageId, PagePipeline, TransformSettings};

pub const BASE_URL: &str = "https://wiki.test";
pub const START_PAGE: &str = "Main_Page";

pub fn page(name: &str) -> PageId {
    PageId::new(name).unwrap()
}

fn anchors(links: &[&str]) -> String {
    links
        .iter()
        .map(|link| format!(r#"<a href="/{0}" title="{0}">{0}</a> "#, link))
        .collect()
}

fn document(title: &str, rlconf: &str, links: &[&str]) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta charset="UTF-8"><title>{title} - Test Wiki</title><script>RLCONF={rlconf};</script><link rel="stylesheet" href="/load.php?modules=site"></head><body class="mediawiki page-{title}"><h1 id="firstHeading">{title}</h1><div id="mw-content-text"><div class="mw-parser-output"><p>Some text about {title}. {anchors}</p><div class="printfooter">Retrieved from wiki</div></div></div></body></html>"#,
        title = title,
        rlconf = rlconf,
        anchors = anchors(links)
    )
}

/// 正常的文章页面
pub fn wiki_page(title: &str, revision: u64, links: &[&str]) -> String {
    let rlconf = format!(
        r#"{{"wgArticleId":{},"wgCurRevisionId":{},"wgPageName":"{}"}}"#,
        revision + 1000,
        revision,
        title
    );
    document(title, &rlconf, links)
}

/// 请求 `requested` 时服务器返回的 `canonical` 页面
pub fn redirected_page(requested: &str, canonical: &str, revision: u64, links: &[&str]) -> String {
    let rlconf = format!(
        r#"{{"wgArticleId":7,"wgCurRevisionId":{},"wgPageName":"{}","wgRedirectedFrom":"{}"}}"#,
        revision, canonical, requested
    );
    document(canonical, &rlconf, links)
}

/// 不存在的页面（wgArticleId = 0）
pub fn missing_page(title: &str) -> String {
    let rlconf = format!(r#"{{"wgArticleId":0,"wgRevisionId":0,"wgPageName":"{}"}}"#, title);
    document(title, &rlconf, &[])
}

/// 没有 RLCONF 的页面
pub fn page_without_metadata(title: &str, links: &[&str]) -> String {
    format!(
        r#"<html><head><title>{0}</title></head><body><div id="mw-content-text"><div class="mw-parser-output">{1}</div></div></body></html>"#,
        title,
        anchors(links)
    )
}

/// 内存抓取器
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<HashMap<PageId, String>>,
    panics: Mutex<HashSet<PageId>>,
    hits: Mutex<HashMap<PageId, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, name: &str, markup: String) -> Self {
        self.set_page(name, markup);
        self
    }

    /// 抓取该页面时 panic
    pub fn with_panic(self, name: &str) -> Self {
        self.panics.lock().unwrap().insert(page(name));
        self
    }

    pub fn set_page(&self, name: &str, markup: String) {
        self.pages.lock().unwrap().insert(page(name), markup);
    }

    pub fn hits(&self, name: &str) -> usize {
        self.hits.lock().unwrap().get(&page(name)).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, requested: &PageId) -> Result<FetchedPage, MirrorError> {
        *self.hits.lock().unwrap().entry(requested.clone()).or_insert(0) += 1;

        if self.panics.lock().unwrap().contains(requested) {
            panic!("renderer crashed on {}", requested);
        }

        let markup = self.pages.lock().unwrap().get(requested).cloned();
        match markup {
            Some(markup) => Ok(FetchedPage::from_markup(markup)),
            None => Err(MirrorError::FetchFailure {
                page: requested.to_string(),
                reason: "navigation error".to_string(),
            }),
        }
    }
}

/// 内存输出
#[derive(Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// 内容真正变化的写入次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageWriter for MemoryWriter {
    async fn write(&self, name: &str, content: &str) -> Result<bool, MirrorError> {
        let mut files = self.files.lock().unwrap();
        if files.get(name).map(String::as_str) == Some(content) {
            return Ok(false);
        }
        files.insert(name.to_string(), content.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

/// 在文本前加 `[ZH]` 的翻译服务
#[derive(Default)]
pub struct TaggingTranslator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextTranslator for TaggingTranslator {
    async fn translate(&self, text: &str, _: &str, _: &str) -> TranslationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[ZH]{}", text))
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

/// 前 `failures` 次调用失败的翻译服务
pub struct FlakyTranslator {
    failures: usize,
    pub calls: AtomicUsize,
    tag: &'static str,
}

impl FlakyTranslator {
    pub fn new(failures: usize, tag: &'static str) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            tag,
        }
    }

    /// 永远失败
    pub fn broken() -> Self {
        Self::new(usize::MAX, "")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextTranslator for FlakyTranslator {
    async fn translate(&self, text: &str, _: &str, _: &str) -> TranslationResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(TranslationError::NetworkError("connection reset".to_string()));
        }
        Ok(format!("{}{}", self.tag, text))
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

pub fn fast_processor_config() -> ProcessorConfig {
    ProcessorConfig {
        retry_delay: Duration::from_millis(1),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// 由抓取器、输出与翻译处理器组装的测试环境
pub struct TestEnvironment {
    pub fetcher: Arc<MockFetcher>,
    pub writer: Arc<MemoryWriter>,
    pub translator: Arc<TaggingTranslator>,
    pub pipeline: PagePipeline,
}

impl TestEnvironment {
    pub fn new(fetcher: MockFetcher) -> Self {
        let fetcher = Arc::new(fetcher);
        let writer = Arc::new(MemoryWriter::new());
        let translator = Arc::new(TaggingTranslator::default());

        let processor = TranslationProcessor::new(translator.clone(), fast_processor_config());
        let mut terms = BTreeMap::new();
        terms.insert("Tank Body".to_string(), "车体".to_string());

        let transformer = ContentTransformer::new(
            Url::parse(BASE_URL).unwrap(),
            page(START_PAGE),
            Arc::new(Dictionary::new(terms).unwrap()),
            Arc::new(ResourceMap::default()),
            Arc::new(processor),
            Arc::new(HtmlBuilder::new(HtmlBuilderConfig::default()).unwrap()),
            TransformSettings::default(),
        );

        let pipeline = PagePipeline::new(
            fetcher.clone(),
            writer.clone(),
            Arc::new(transformer),
            Duration::from_secs(5),
        );

        Self {
            fetcher,
            writer,
            translator,
            pipeline,
        }
    }
}
