//! HTML 静态资源处理模块
//!
//! 本模块负责处理页面中引用的各种静态资源：
//! - 头部与 body 末尾的 link / style / script 元素改写为指向源站点的绝对地址
//! - 图片（`src`、`srcset`）、iframe、video、source 元素的地址解析为绝对 URL，
//!   再查询资源替换表；缩略图地址会退回到原图地址再查一次

use std::collections::HashMap;
use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::utils::url::{absolutize, is_root_relative, Url};

use super::dom::{element_children, find_nodes, get_node_attr, get_node_name, set_node_attr};
use super::parser::{compose_srcset, parse_srcset};
use super::selector::query_all;
use super::serializer::serialize_node;

/// 需要改写地址的元素与属性
const RESOURCE_ATTRIBUTES: &[(&str, &str)] = &[
    ("img", "src"),
    ("iframe", "src"),
    ("video", "src"),
    ("video", "poster"),
    ("source", "src"),
    ("audio", "src"),
];

/// 带 srcset 的元素
const SRCSET_ELEMENTS: &[&str] = &["img", "source"];

/// 头部保留的元素
const HEAD_ELEMENTS: &[&str] = &["link", "style", "script", "meta"];

/// body 末尾保留的元素
const BODY_TAIL_ELEMENTS: &[&str] = &["script", "link", "style"];

fn thumbnail_regex() -> Option<&'static Regex> {
    static THUMBNAIL: OnceLock<Option<Regex>> = OnceLock::new();
    THUMBNAIL
        .get_or_init(|| Regex::new(r"^(?P<prefix>.+)/thumb/(?P<file>.+)/[0-9]+px-[^/]+$").ok())
        .as_ref()
}

/// 缩略图地址对应的原图地址
///
/// `https://host/images/thumb/a/ab/X.png/120px-X.png` -> `https://host/images/a/ab/X.png`
pub fn strip_thumbnail(url: &str) -> Option<String> {
    let caps = thumbnail_regex()?.captures(url)?;
    Some(format!("{}/{}", &caps["prefix"], &caps["file"]))
}

/// 资源替换表：绝对 URL -> 替换地址
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap {
    replacements: HashMap<String, String>,
}

impl ResourceMap {
    pub fn new(replacements: HashMap<String, String>) -> Self {
        Self { replacements }
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// 先按完整地址查找，再按去掉缩略图尺寸的原图地址查找
    pub fn lookup(&self, absolute_url: &str) -> Option<&str> {
        if let Some(replacement) = self.replacements.get(absolute_url) {
            return Some(replacement);
        }

        let base = strip_thumbnail(absolute_url)?;
        self.replacements.get(&base).map(String::as_str)
    }

    /// 解析资源引用：有替换用替换，否则用绝对地址；无法解析的引用返回 `None`
    pub fn resolve(&self, base_url: &Url, reference: &str) -> Option<String> {
        let absolute = absolutize(base_url, reference)?;
        Some(
            self.lookup(&absolute)
                .map(str::to_string)
                .unwrap_or(absolute),
        )
    }
}

/// 把根相对地址改写为源站点上的绝对地址
fn rebase_attr(node: &Handle, attr_name: &str, base_url: &Url) {
    if let Some(value) = get_node_attr(node, attr_name) {
        if is_root_relative(value.trim()) {
            if let Some(absolute) = absolutize(base_url, &value) {
                set_node_attr(node, attr_name, Some(absolute));
            }
        }
    }
}

/// 改写并序列化 `<head>` 中的资源元素（不含 title 与 charset 声明）
pub fn rebase_head_elements(document: &Handle, base_url: &Url) -> Vec<String> {
    let mut elements = Vec::new();

    for head in find_nodes(document, vec!["html", "head"]) {
        for child in element_children(&head) {
            let Some(name) = get_node_name(&child) else {
                continue;
            };
            if !HEAD_ELEMENTS.contains(&name) {
                continue;
            }
            if name == "meta" && get_node_attr(&child, "charset").is_some() {
                continue;
            }

            rebase_attr(&child, "href", base_url);
            rebase_attr(&child, "src", base_url);
            elements.push(serialize_node(&child));
        }
    }

    elements
}

/// 改写并序列化 `<body>` 的直接子元素中的 script / link / style
pub fn rebase_body_tail(document: &Handle, base_url: &Url) -> Vec<String> {
    let mut elements = Vec::new();

    for body in find_nodes(document, vec!["html", "body"]) {
        for child in element_children(&body) {
            let is_tail = get_node_name(&child).is_some_and(|name| BODY_TAIL_ELEMENTS.contains(&name));
            if !is_tail {
                continue;
            }

            rebase_attr(&child, "href", base_url);
            rebase_attr(&child, "src", base_url);
            elements.push(serialize_node(&child));
        }
    }

    elements
}

/// 改写内容子树中的媒体资源地址，返回改写的属性数
pub fn rewrite_resources(root: &Handle, base_url: &Url, resources: &ResourceMap) -> usize {
    let mut rewritten = 0;

    for (tag, attr_name) in RESOURCE_ATTRIBUTES {
        for node in query_all(root, tag) {
            let Some(value) = get_node_attr(&node, attr_name) else {
                continue;
            };
            if let Some(resolved) = resources.resolve(base_url, &value) {
                if resolved != value {
                    set_node_attr(&node, attr_name, Some(resolved));
                    rewritten += 1;
                }
            }
        }
    }

    for tag in SRCSET_ELEMENTS {
        for node in query_all(root, tag) {
            let Some(srcset) = get_node_attr(&node, "srcset") else {
                continue;
            };

            let items = parse_srcset(&srcset);
            let resolved = compose_srcset(items.iter().map(|item| {
                let path = resources
                    .resolve(base_url, item.path)
                    .unwrap_or_else(|| item.path.to_string());
                (path, item.descriptor)
            }));

            if resolved != srcset {
                set_node_attr(&node, "srcset", Some(resolved));
                rewritten += 1;
            }
        }
    }

    rewritten
}
