//! 内容转换
//!
//! 把抓取到的页面转换为本地化的最终文档，依次执行：
//!
//! 1. 头部与 body 末尾资源元素改写为源站点绝对地址
//! 2. 提取标题元素与正文子树到独立容器，删除页脚与分类等装饰元素
//! 3. 改写锚点
//! 4. 改写图片与嵌入媒体地址
//! 5. 术语替换与翻译（全部片段并发提交，统一等待后写回）
//! 6. 规范化汉字间隙与颜色值
//! 7. 组装模板，注入随机事实占位脚本
//!
//! 第 5 步不会失败：每个片段最终都得到译文、替换结果或原文之一。

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use markup5ever_rcdom::{Handle, RcDom};

use crate::builders::{HtmlBuilder, PageParts};
use crate::parsers::html::dom::{parse_html, remove_node, set_inner_html};
use crate::parsers::html::{
    collapse_cjk_gaps, get_body_classes, get_title, normalize_markup, query_all, query_first,
    rebase_body_tail, rebase_head_elements, rewrite_resources, serialize_children,
    serialize_node, ResourceMap,
};
use crate::parsers::link_rewriter::rewrite_links_in_dom;
use crate::translation::{Dictionary, TextCollector, TranslationProcessor};
use crate::utils::{PageId, Url};

/// 页面标题元素
pub const HEADING_SELECTOR: &str = "#firstHeading";

/// 正文容器
pub const CONTENT_SELECTOR: &str = "#mw-content-text .mw-parser-output";

/// 正文容器缺失时退回的选择器
const CONTENT_FALLBACK_SELECTOR: &str = "#mw-content-text";

/// 独立容器的 ID
pub const WRAPPER_ID: &str = "wiki-content-wrapper";

/// 转换设置
#[derive(Debug, Clone)]
pub struct TransformSettings {
    /// 从正文中删除的元素
    pub strip_selectors: Vec<String>,
    /// 其中文本不翻译的元素
    pub excluded_text_selectors: Vec<String>,
    /// 随机事实框，最后一个匹配元素被替换为占位符
    pub fact_box_selector: Option<String>,
    pub color_replacements: BTreeMap<String, String>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        let mut color_replacements = BTreeMap::new();
        color_replacements.insert("rgb(70, 223, 17)".to_string(), "#76FF33".to_string());

        Self {
            strip_selectors: vec![
                ".printfooter".to_string(),
                "#catlinks".to_string(),
                ".mw-editsection".to_string(),
            ],
            excluded_text_selectors: vec![
                "script".to_string(),
                "style".to_string(),
                "span.hotkey".to_string(),
            ],
            fact_box_selector: Some(".random-text-box > div".to_string()),
            color_replacements,
        }
    }
}

/// 转换结果
#[derive(Debug, Clone)]
pub struct TransformedPage {
    pub html: String,
    pub title: String,
    /// 提交翻译的片段数（不含标题）
    pub fragments: usize,
}

/// 内容转换器
///
/// 词典、资源替换表与翻译处理器在一次运行中只读，可在并发任务间共享。
pub struct ContentTransformer {
    base_url: Url,
    start_page: PageId,
    dictionary: Arc<Dictionary>,
    resources: Arc<ResourceMap>,
    translator: Arc<TranslationProcessor>,
    builder: Arc<HtmlBuilder>,
    collector: TextCollector,
    settings: TransformSettings,
}

impl ContentTransformer {
    pub fn new(
        base_url: Url,
        start_page: PageId,
        dictionary: Arc<Dictionary>,
        resources: Arc<ResourceMap>,
        translator: Arc<TranslationProcessor>,
        builder: Arc<HtmlBuilder>,
        settings: TransformSettings,
    ) -> Self {
        let collector = TextCollector::new(&settings.excluded_text_selectors);
        Self {
            base_url,
            start_page,
            dictionary,
            resources,
            translator,
            builder,
            collector,
            settings,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn start_page(&self) -> &PageId {
        &self.start_page
    }

    pub fn builder(&self) -> &HtmlBuilder {
        &self.builder
    }

    /// 转换整个页面
    pub async fn transform(&self, document: &RcDom, page: &PageId) -> TransformedPage {
        let head_elements = rebase_head_elements(&document.document, &self.base_url);
        let mut tail_elements = rebase_body_tail(&document.document, &self.base_url);

        let content_dom = self.extract_content(&document.document);
        let wrapper = format!("#{}", WRAPPER_ID);
        let Some(container) = query_first(&content_dom.document, &wrapper) else {
            tracing::warn!("[{}] 无法构建内容容器，输出空正文", page);
            return self
                .assemble(document, page, String::new(), head_elements, tail_elements, 0)
                .await;
        };

        for selector in &self.settings.strip_selectors {
            for node in query_all(&container, selector) {
                remove_node(&node);
            }
        }

        if self.replace_fact_box(&container) {
            tail_elements.push(self.builder.fact_script());
        }

        let links = rewrite_links_in_dom(&container, &self.base_url);
        let resources = rewrite_resources(&container, &self.base_url, &self.resources);
        tracing::debug!("[{}] 改写链接 {} 个，资源 {} 个", page, links, resources);

        let fragments = self.translate_fragments(&container).await;
        tracing::debug!("[{}] 翻译片段 {} 个", page, fragments);

        let content = serialize_children(&container);
        self.assemble(document, page, content, head_elements, tail_elements, fragments)
            .await
    }

    async fn assemble(
        &self,
        document: &RcDom,
        page: &PageId,
        content: String,
        head_elements: Vec<String>,
        tail_elements: Vec<String>,
        fragments: usize,
    ) -> TransformedPage {
        let original_title = get_title(&document.document)
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| page.display_title());
        let title = self.translate_title(&original_title).await;

        let parts = PageParts {
            title: title.clone(),
            head_elements,
            body_classes: get_body_classes(&document.document),
            home_page: (page != &self.start_page).then(|| self.start_page.clone()),
            content: normalize_markup(&content, &self.settings.color_replacements),
            tail_elements,
        };

        TransformedPage {
            html: self.builder.build_page(&parts),
            title,
            fragments,
        }
    }

    /// 把标题元素与正文子节点复制进独立容器
    fn extract_content(&self, document: &Handle) -> RcDom {
        let mut markup = String::new();

        if let Some(heading) = query_first(document, HEADING_SELECTOR) {
            markup.push_str(&serialize_node(&heading));
        }

        let body = query_first(document, CONTENT_SELECTOR)
            .or_else(|| query_first(document, CONTENT_FALLBACK_SELECTOR));
        if let Some(body) = body {
            markup.push_str(&serialize_children(&body));
        }

        parse_html(&format!(
            "<html><body><div id=\"{}\">{}</div></body></html>",
            WRAPPER_ID, markup
        ))
    }

    fn replace_fact_box(&self, container: &Handle) -> bool {
        let Some(selector) = self.settings.fact_box_selector.as_deref() else {
            return false;
        };

        match query_all(container, selector).last() {
            Some(fact_box) => {
                set_inner_html(fact_box, &self.builder.fact_placeholder());
                true
            }
            None => false,
        }
    }

    /// 先术语替换再翻译
    async fn localize(&self, text: &str) -> String {
        let substituted = self.dictionary.substitute(text);
        self.translator.translate(&substituted).await
    }

    async fn translate_title(&self, title: &str) -> String {
        collapse_cjk_gaps(self.localize(title).await.trim())
    }

    /// 并发翻译全部片段并写回，返回片段数
    async fn translate_fragments(&self, container: &Handle) -> usize {
        let items = self.collector.collect(container);
        let translated = join_all(items.iter().map(|item| self.localize(&item.text))).await;

        for (item, text) in items.iter().zip(translated) {
            item.apply(&text);
        }

        items.len()
    }
}
