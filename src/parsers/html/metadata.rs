//! HTML 文档元数据处理模块
//!
//! 从 MediaWiki 页面中提取结构化元数据：
//! - 内嵌的 `RLCONF = {...};` 配置（文章 ID、修订号、规范标题、重定向来源）
//! - 文档标题
//! - `<body>` 的 class 列表

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::storage::RevisionId;

use super::dom::{find_nodes, get_node_attr};

/// 页面元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// `wgArticleId`，0 表示页面不存在
    pub article_id: Option<u64>,
    /// `wgCurRevisionId`，缺失时为 `wgRevisionId`
    pub revision: Option<RevisionId>,
    /// `wgPageName`，页面的规范标题
    pub canonical_title: Option<String>,
    /// `wgRedirectedFrom`
    pub redirected_from: Option<String>,
}

impl PageMetadata {
    /// 源站点上是否存在该页面
    pub fn exists(&self) -> bool {
        self.article_id != Some(0)
    }
}

#[derive(Debug, Deserialize)]
struct RlConf {
    #[serde(rename = "wgArticleId", default)]
    article_id: Option<u64>,
    #[serde(rename = "wgCurRevisionId", default)]
    cur_revision_id: Option<u64>,
    #[serde(rename = "wgRevisionId", default)]
    revision_id: Option<u64>,
    #[serde(rename = "wgPageName", default)]
    page_name: Option<String>,
    #[serde(rename = "wgRedirectedFrom", default)]
    redirected_from: Option<String>,
}

fn rlconf_regex() -> Option<&'static Regex> {
    static RLCONF: OnceLock<Option<Regex>> = OnceLock::new();
    RLCONF
        .get_or_init(|| Regex::new(r"RLCONF\s*=\s*\{").ok())
        .as_ref()
}

/// 从页面源码中解析 `RLCONF` 元数据
///
/// 找不到或无法解析时返回 `None`，调用方据此跳过页面。
pub fn parse_page_metadata(markup: &str) -> Option<PageMetadata> {
    let found = rlconf_regex()?.find(markup)?;
    // 匹配以 '{' 结尾，JSON 从这里开始
    let json_start = found.end() - 1;

    let mut stream =
        serde_json::Deserializer::from_str(&markup[json_start..]).into_iter::<RlConf>();
    let conf = match stream.next()? {
        Ok(conf) => conf,
        Err(error) => {
            tracing::debug!("解析 RLCONF JSON 时出错: {}", error);
            return None;
        }
    };

    // 0 视为缺失
    let revision = conf
        .cur_revision_id
        .filter(|id| *id != 0)
        .or(conf.revision_id.filter(|id| *id != 0))
        .map(RevisionId::from);

    Some(PageMetadata {
        article_id: conf.article_id,
        revision,
        canonical_title: conf.page_name.filter(|s| !s.trim().is_empty()),
        redirected_from: conf.redirected_from.filter(|s| !s.trim().is_empty()),
    })
}

/// 获取文档标题
///
/// 从 HTML 文档的 `<title>` 标签中提取文本内容。
/// 只返回第一个 title 标签的文本内容。
pub fn get_title(node: &Handle) -> Option<String> {
    for title_node in find_nodes(node, vec!["html", "head", "title"]).iter() {
        for child_node in title_node.children.borrow().iter() {
            if let NodeData::Text { ref contents } = child_node.data {
                return Some(contents.borrow().to_string());
            }
        }
    }

    None
}

/// 获取 `<body>` 的 class 属性
pub fn get_body_classes(node: &Handle) -> String {
    find_nodes(node, vec!["html", "body"])
        .first()
        .and_then(|body| get_node_attr(body, "class"))
        .unwrap_or_default()
}
