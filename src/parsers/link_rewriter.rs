//! 链接重写模块
//!
//! 负责把内容中的锚点改写为镜像站内的相对链接，以及发现页面中的内部链接。
//!
//! - 指向站内文章的链接改写为 `./<页面>`，保留 `#片段`
//! - 其他根相对链接（受限命名空间、文件、带查询参数的动作链接）改写为源站点的绝对地址
//! - 仅含片段的页内锚点与站外链接保持不变

use std::collections::HashSet;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{get_node_attr, set_node_attr};
use crate::parsers::html::selector::query_all;
use crate::utils::url::{absolutize, is_root_relative, resolve_url, Url};
use crate::utils::PageId;

/// 发现内部链接的范围
pub const LINK_DISCOVERY_SELECTOR: &str = "#mw-content-text a";

/// 重写子树中所有锚点的 href，返回改写数量
pub fn rewrite_links_in_dom(root: &Handle, base_url: &Url) -> usize {
    let mut rewritten = 0;
    walk_and_rewrite_links(root, base_url, &mut rewritten);
    rewritten
}

/// 递归遍历DOM树并重写链接
fn walk_and_rewrite_links(node: &Handle, base_url: &Url, rewritten: &mut usize) {
    if let NodeData::Element { ref name, .. } = node.data {
        if name.local.as_ref() == "a" && rewrite_anchor_link(node, base_url) {
            *rewritten += 1;
        }
    }

    for child_node in node.children.borrow().iter() {
        walk_and_rewrite_links(child_node, base_url, rewritten);
    }
}

/// 重写锚点链接的href属性
fn rewrite_anchor_link(node: &Handle, base_url: &Url) -> bool {
    let Some(href_value) = get_node_attr(node, "href") else {
        return false;
    };

    match rewrite_href(&href_value, base_url) {
        Some(rewritten_href) if rewritten_href != href_value => {
            set_node_attr(node, "href", Some(rewritten_href));
            true
        }
        _ => false,
    }
}

/// 计算单个 href 的改写结果，不需要改写时返回 `None`
pub fn rewrite_href(href: &str, base_url: &Url) -> Option<String> {
    let trimmed = href.trim();
    if should_skip_link(trimmed) {
        return None;
    }

    if let Some(page_id) = PageId::from_href(trimmed, base_url) {
        let fragment = resolve_url(base_url, trimmed)
            .and_then(|url| url.fragment().map(str::to_string))
            .filter(|fragment| !fragment.is_empty());

        return Some(match fragment {
            Some(fragment) => format!("{}#{}", page_id.relative_href(), fragment),
            None => page_id.relative_href(),
        });
    }

    if is_root_relative(trimmed) {
        return absolutize(base_url, trimmed);
    }

    None
}

/// 检查是否应该跳过链接
fn should_skip_link(href: &str) -> bool {
    href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("data:")
}

/// 按出现顺序收集页面正文中的内部链接（去重）
pub fn collect_internal_links(document: &Handle, base_url: &Url) -> Vec<PageId> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in query_all(document, LINK_DISCOVERY_SELECTOR) {
        let Some(href) = get_node_attr(&anchor, "href") else {
            continue;
        };
        if let Some(page_id) = PageId::from_href(&href, base_url) {
            if seen.insert(page_id.clone()) {
                links.push(page_id);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::parse_html;
    use crate::parsers::html::selector::query_first;

    fn base() -> Url {
        Url::parse("https://en.tankiwiki.com").unwrap()
    }

    #[test]
    fn href_rewriting_rules() {
        let base = base();
        assert_eq!(rewrite_href("/Gold_Boxes", &base).as_deref(), Some("./Gold_Boxes"));
        assert_eq!(
            rewrite_href("/Tank_Body#Stats", &base).as_deref(),
            Some("./Tank_Body#Stats")
        );
        assert_eq!(
            rewrite_href("/File:Crystal.png", &base).as_deref(),
            Some("https://en.tankiwiki.com/File:Crystal.png")
        );
        assert_eq!(
            rewrite_href("/w/index.php?title=X&action=edit", &base).as_deref(),
            Some("https://en.tankiwiki.com/w/index.php?title=X&action=edit")
        );
        assert_eq!(rewrite_href("#top", &base), None);
        assert_eq!(rewrite_href("https://example.com/x", &base), None);
    }

    #[test]
    fn rewrites_anchors_in_subtree() {
        let dom = parse_html(
            r##"<div id="c"><a href="/Crystals">c</a><a href="#x">x</a><a>none</a></div>"##,
        );
        let root = query_first(&dom.document, "#c").unwrap();
        assert_eq!(rewrite_links_in_dom(&root, &base()), 1);

        let first = query_first(&root, "a").unwrap();
        assert_eq!(get_node_attr(&first, "href").as_deref(), Some("./Crystals"));
    }

    #[test]
    fn discovery_is_scoped_and_deduplicated() {
        let dom = parse_html(
            r#"<body><a href="/Outside">o</a><div id="mw-content-text">
            <a href="/B">b</a><a href="/A">self</a><a href="/B#again">b2</a>
            <a href="/Special:Random">s</a><a href="/Tank Body">t</a></div></body>"#,
        );
        let links = collect_internal_links(&dom.document, &base());
        let names: Vec<&str> = links.iter().map(PageId::as_str).collect();
        assert_eq!(names, vec!["B", "A", "Tank_Body"]);
    }
}
