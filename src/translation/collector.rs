//! 文本收集器模块
//!
//! 从内容子树中收集翻译片段（文本节点以及 `title` / `alt` 属性），
//! 并在翻译完成后把结果写回原节点。

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{descendants, get_node_attr, get_parent_node, set_node_attr, set_text};
use crate::parsers::html::selector::{has_matching_ancestor_or_self, Selector};
use crate::translation::processor::has_source_alphabet;

/// 需要翻译的属性
pub const TRANSLATABLE_ATTRIBUTES: &[&str] = &["title", "alt"];

/// 存储需要翻译的文本及其位置信息
#[derive(Debug, Clone)]
pub struct TextItem {
    /// 文本内容
    pub text: String,
    /// DOM节点引用
    pub node: Handle,
    /// 属性名（如果是属性文本）
    pub attr_name: Option<String>,
}

impl TextItem {
    /// 判断是否为属性文本
    pub fn is_attribute(&self) -> bool {
        self.attr_name.is_some()
    }

    /// 把翻译结果写回节点
    ///
    /// 空结果不写回。文本节点的结果若仍含源语言字母，保留原文两端的空白，
    /// 避免相邻英文单词粘连；否则去掉两端空白。
    pub fn apply(&self, translated: &str) {
        if translated.is_empty() {
            return;
        }

        match &self.attr_name {
            Some(attr_name) => set_node_attr(&self.node, attr_name, Some(translated.to_string())),
            None => set_text(&self.node, &restore_spacing(&self.text, translated)),
        }
    }
}

fn restore_spacing(original: &str, translated: &str) -> String {
    let trimmed = translated.trim();
    if !has_source_alphabet(trimmed) {
        return trimmed.to_string();
    }

    let leading_len = original.len() - original.trim_start().len();
    let trailing_start = original.trim_end().len().max(leading_len);
    format!(
        "{}{}{}",
        &original[..leading_len],
        trimmed,
        &original[trailing_start..]
    )
}

/// 文本收集器
#[derive(Debug, Clone, Default)]
pub struct TextCollector {
    excluded: Vec<Selector>,
}

impl TextCollector {
    /// `excluded_selectors` 中任一选择器匹配的元素内的文本不收集
    pub fn new(excluded_selectors: &[String]) -> Self {
        let excluded = excluded_selectors
            .iter()
            .filter_map(|text| {
                let selector = Selector::parse(text);
                if selector.is_none() {
                    tracing::warn!("忽略无效的排除选择器: {:?}", text);
                }
                selector
            })
            .collect();

        Self { excluded }
    }

    /// 按文档顺序收集文本节点，然后收集属性
    pub fn collect(&self, root: &Handle) -> Vec<TextItem> {
        let nodes = descendants(root);
        let mut items = Vec::new();

        for node in &nodes {
            if let NodeData::Text { contents } = &node.data {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let excluded = get_parent_node(node)
                    .is_some_and(|parent| has_matching_ancestor_or_self(&parent, &self.excluded));
                if !excluded {
                    items.push(TextItem {
                        text,
                        node: node.clone(),
                        attr_name: None,
                    });
                }
            }
        }

        for node in &nodes {
            for attr_name in TRANSLATABLE_ATTRIBUTES {
                if let Some(value) = get_node_attr(node, attr_name) {
                    if !value.trim().is_empty() {
                        items.push(TextItem {
                            text: value,
                            node: node.clone(),
                            attr_name: Some(attr_name.to_string()),
                        });
                    }
                }
            }
        }

        tracing::debug!("收集到 {} 个待翻译片段", items.len());
        items
    }
}
