//! 简单 CSS 选择器
//!
//! 只支持镜像流程实际用到的形状：标签、`#id`、`.class` 组合成的复合选择器，
//! 以及后代（空格）与子代（`>`）组合符。例如：
//!
//! - `#mw-content-text .mw-parser-output`
//! - `body > script`
//! - `span.hotkey`

use markup5ever_rcdom::Handle;

use super::dom::{descendants, get_node_attr, get_node_name, get_parent_node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut current = String::new();
        let mut kind = 't';

        let flush = |kind: char, value: &mut String, compound: &mut Compound| {
            if value.is_empty() {
                return;
            }
            let taken = std::mem::take(value);
            match kind {
                '#' => compound.id = Some(taken),
                '.' => compound.classes.push(taken),
                _ => compound.tag = Some(taken.to_ascii_lowercase()),
            }
        };

        for c in token.chars() {
            match c {
                '#' | '.' => {
                    flush(kind, &mut current, &mut compound);
                    kind = c;
                }
                _ => current.push(c),
            }
        }
        flush(kind, &mut current, &mut compound);

        if compound.tag.as_deref() == Some("*") {
            compound.tag = None;
        }

        Some(compound)
    }

    fn matches(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(name) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if get_node_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class_attr = get_node_attr(node, "class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }

        true
    }
}

/// 已解析的选择器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// 从左到右的复合选择器；第一个的组合符无意义
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// 解析选择器文本，空文本返回 `None`
    pub fn parse(text: &str) -> Option<Self> {
        let spaced = text.replace('>', " > ");
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;

        for token in spaced.split_whitespace() {
            if token == ">" {
                combinator = Combinator::Child;
                continue;
            }
            steps.push((combinator, Compound::parse(token)?));
            combinator = Combinator::Descendant;
        }

        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    /// 节点是否匹配（祖先链可以延伸到查询根之外）
    pub fn matches(&self, node: &Handle) -> bool {
        self.matches_at(node, self.steps.len() - 1)
    }

    fn matches_at(&self, node: &Handle, index: usize) -> bool {
        let (combinator, compound) = &self.steps[index];
        if !compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => match get_parent_node(node) {
                Some(parent) => self.matches_at(&parent, index - 1),
                None => false,
            },
            Combinator::Descendant => {
                let mut ancestor = get_parent_node(node);
                while let Some(current) = ancestor {
                    if self.matches_at(&current, index - 1) {
                        return true;
                    }
                    ancestor = get_parent_node(&current);
                }
                false
            }
        }
    }
}

/// 在 `root` 的后代中按文档顺序查找全部匹配节点
pub fn select_all(root: &Handle, selector: &Selector) -> Vec<Handle> {
    descendants(root)
        .into_iter()
        .filter(|node| selector.matches(node))
        .collect()
}

/// 在 `root` 的后代中查找第一个匹配节点
pub fn select_first(root: &Handle, selector: &Selector) -> Option<Handle> {
    descendants(root)
        .into_iter()
        .find(|node| selector.matches(node))
}

/// 解析并查找；选择器文本无效时视为无匹配
pub fn query_all(root: &Handle, selector: &str) -> Vec<Handle> {
    match Selector::parse(selector) {
        Some(selector) => select_all(root, &selector),
        None => Vec::new(),
    }
}

pub fn query_first(root: &Handle, selector: &str) -> Option<Handle> {
    Selector::parse(selector).and_then(|selector| select_first(root, &selector))
}

/// 节点自身或任一祖先是否匹配其中一个选择器
pub fn has_matching_ancestor_or_self(node: &Handle, selectors: &[Selector]) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if selectors.iter().any(|selector| selector.matches(&candidate)) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{parse_html, text_content};

    const PAGE: &str = r#"<html><head><script src="/a.js"></script></head><body class="skin">
        <h1 id="firstHeading">Crystals</h1>
        <div id="mw-content-text"><div class="mw-parser-output extra">
            <p>Intro <span class="hotkey">Ctrl</span></p>
            <div class="random-text-box"><div>title</div><div>fact</div></div>
        </div></div>
        <script>var x;</script>
    </body></html>"#;

    #[test]
    fn descendant_and_class_selectors() {
        let dom = parse_html(PAGE);
        let found = query_all(&dom.document, "#mw-content-text .mw-parser-output");
        assert_eq!(found.len(), 1);
        assert!(query_first(&dom.document, "span.hotkey").is_some());
        assert!(query_first(&dom.document, "span.missing").is_none());
    }

    #[test]
    fn child_combinator_only_matches_direct_children() {
        let dom = parse_html(PAGE);
        let scripts = query_all(&dom.document, "body > script");
        assert_eq!(scripts.len(), 1);
        assert_eq!(text_content(&scripts[0]), "var x;");

        let boxes = query_all(&dom.document, ".random-text-box > div");
        assert_eq!(boxes.len(), 2);
        assert_eq!(text_content(&boxes[1]), "fact");
    }

    #[test]
    fn ancestor_checks_cover_the_node_itself() {
        let dom = parse_html(PAGE);
        let hotkey = query_first(&dom.document, "span.hotkey").unwrap();
        let text_node = hotkey.children.borrow()[0].clone();
        let excluded = vec![Selector::parse("span.hotkey").unwrap()];
        assert!(has_matching_ancestor_or_self(&text_node, &excluded));
        assert!(has_matching_ancestor_or_self(&hotkey, &excluded));
    }

    #[test]
    fn empty_selector_is_rejected() {
        assert!(Selector::parse("   ").is_none());
    }
}
