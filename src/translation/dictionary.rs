//! 术语词典
//!
//! 在机器翻译之前直接替换已知术语。加载时为每个词条补充复数形式，
//! 按键长降序逐个替换，保证多词或更长的术语先于其子串被替换。
//! 匹配不区分大小写，只在 ASCII 单词边界处生效。

use std::collections::BTreeMap;

use regex::{NoExpand, Regex, RegexBuilder};

/// 单个术语的匹配规则
#[derive(Debug, Clone)]
struct TermRule {
    pattern: Regex,
    replacement: String,
}

/// 编译后的术语词典
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    /// 按匹配优先级排序的键（原始大小写）
    ordered_keys: Vec<String>,
    /// 与 `ordered_keys` 一一对应
    rules: Vec<TermRule>,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 从术语映射构建词典，每个键在加载时编译一次
    pub fn new(entries: BTreeMap<String, String>) -> Result<Self, regex::Error> {
        let expanded = expand_plurals(entries);

        let mut ordered_keys: Vec<String> = expanded
            .keys()
            .filter(|key| !key.trim().is_empty())
            .cloned()
            .collect();
        ordered_keys.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        let rules = ordered_keys
            .iter()
            .map(|key| {
                // ASCII 单词边界：紧邻汉字的术语也能命中
                let source = format!(r"(?-u:\b){}(?-u:\b)", regex::escape(key));
                let pattern = RegexBuilder::new(&source).case_insensitive(true).build()?;
                Ok(TermRule {
                    pattern,
                    replacement: expanded[key].clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        tracing::info!(
            "文本词典准备完毕。总词条数 (含复数): {}，已按长度排序。",
            ordered_keys.len()
        );

        Ok(Self {
            ordered_keys,
            rules,
        })
    }

    pub fn len(&self) -> usize {
        self.ordered_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_keys.is_empty()
    }

    /// 匹配优先级顺序的键
    pub fn ordered_keys(&self) -> &[String] {
        &self.ordered_keys
    }

    /// 替换文本中的全部术语
    ///
    /// 按键长降序逐个替换，较长的键先于与其重叠的较短键生效。
    pub fn substitute(&self, text: &str) -> String {
        self.rules.iter().fold(text.to_string(), |text, rule| {
            if rule.pattern.is_match(&text) {
                rule.pattern
                    .replace_all(&text, NoExpand(&rule.replacement))
                    .into_owned()
            } else {
                text
            }
        })
    }
}

/// 为每个词条补充复数形式（已存在的键不覆盖）
fn expand_plurals(entries: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut expanded = entries.clone();
    for (key, value) in &entries {
        if let Some(plural) = pluralize(key) {
            if plural != *key {
                expanded.entry(plural).or_insert_with(|| value.clone());
            }
        }
    }
    expanded
}

/// 英文复数形式，只变化最后一个单词
///
/// 不以 ASCII 字母结尾的键没有复数形式。
pub fn pluralize(term: &str) -> Option<String> {
    let last = term.chars().last()?;
    if !last.is_ascii_alphabetic() {
        return None;
    }

    let lower = term.to_ascii_lowercase();
    let upper = term
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(|c| c.is_uppercase());
    let suffix = |s: &str| if upper { s.to_ascii_uppercase() } else { s.to_string() };

    // 已经是复数
    if lower.ends_with('s') && !["ss", "us", "is"].iter().any(|e| lower.ends_with(e)) {
        return None;
    }

    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if before.is_some_and(|c| c.is_ascii_alphabetic() && !"aeiou".contains(c)) {
            let stem = &term[..term.len() - 1];
            return Some(format!("{}{}", stem, suffix("ies")));
        }
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|ending| lower.ends_with(ending))
    {
        return Some(format!("{}{}", term, suffix("es")));
    }

    Some(format!("{}{}", term, suffix("s")))
}
