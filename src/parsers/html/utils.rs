use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

fn cjk_gap_regex() -> Option<&'static Regex> {
    static CJK_GAP: OnceLock<Option<Regex>> = OnceLock::new();
    CJK_GAP
        .get_or_init(|| Regex::new(r"([一-龥])([\s_]+)([一-龥])").ok())
        .as_ref()
}

/// 删除两个汉字之间由替换留下的空白或下划线
pub fn collapse_cjk_gaps(text: &str) -> String {
    let Some(regex) = cjk_gap_regex() else {
        return text.to_string();
    };

    // 重叠匹配（如 "坦 克 车"）需要多轮
    let mut current = text.to_string();
    loop {
        let next = regex.replace_all(&current, "$1$3").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// 按字面量替换颜色值
pub fn replace_colors(text: &str, replacements: &BTreeMap<String, String>) -> String {
    replacements
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
}

/// 最终文本规范化：先合并汉字间隙，再替换颜色
pub fn normalize_markup(text: &str, colors: &BTreeMap<String, String>) -> String {
    replace_colors(&collapse_cjk_gaps(text), colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_between_cjk_are_removed() {
        assert_eq!(collapse_cjk_gaps("坦克 _ 车体"), "坦克车体");
        assert_eq!(collapse_cjk_gaps("坦 克 车"), "坦克车");
        assert_eq!(collapse_cjk_gaps("坦克 Tank 车体"), "坦克 Tank 车体");
    }

    #[test]
    fn colors_are_replaced() {
        let mut colors = BTreeMap::new();
        colors.insert("rgb(70, 223, 17)".to_string(), "#76FF33".to_string());
        assert_eq!(
            normalize_markup("<span style=\"color: rgb(70, 223, 17)\">绿 色</span>", &colors),
            "<span style=\"color: #76FF33\">绿色</span>"
        );
    }
}
