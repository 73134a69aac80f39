//! HTML 属性解析
//!
//! 目前只需要处理响应式图片的 `srcset` 属性。

use super::utils::WHITESPACES;

/// SrcSet 属性项目结构
///
/// 表示HTML `srcset` 属性中的单个图片项目，包含图片路径和对应的描述符。
///
/// - `path`: 图片文件的路径或URL
/// - `descriptor`: 宽度（如 "480w"）或像素密度（如 "2x"），没有时为空字符串
#[derive(Debug, PartialEq, Eq)]
pub struct SrcSetItem<'a> {
    pub path: &'a str,
    pub descriptor: &'a str,
}

/// 解析HTML图片的srcset属性
///
/// 按逗号切分候选项，每个候选项的第一个空白分隔片段是路径，其余是描述符。
/// 空候选项会被忽略。
///
/// ```rust
/// # use wikimirror::parsers::html::parser::parse_srcset;
/// let items = parse_srcset("/a/180px-X.png 1.5x, /a/240px-X.png 2x");
/// assert_eq!(items.len(), 2);
/// assert_eq!(items[0].path, "/a/180px-X.png");
/// assert_eq!(items[1].descriptor, "2x");
/// ```
pub fn parse_srcset(srcset: &str) -> Vec<SrcSetItem<'_>> {
    srcset
        .split(',')
        .filter_map(|candidate| {
            let candidate = candidate.trim_matches(WHITESPACES);
            if candidate.is_empty() {
                return None;
            }

            match candidate.split_once(WHITESPACES) {
                Some((path, descriptor)) => Some(SrcSetItem {
                    path,
                    descriptor: descriptor.trim_matches(WHITESPACES),
                }),
                None => Some(SrcSetItem {
                    path: candidate,
                    descriptor: "",
                }),
            }
        })
        .collect()
}

/// 把 `(路径, 描述符)` 列表重新拼成 srcset 字符串
pub fn compose_srcset<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = (String, &'a str)>,
{
    items
        .into_iter()
        .map(|(path, descriptor)| {
            if descriptor.is_empty() {
                path
            } else {
                format!("{} {}", path, descriptor)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_descriptors_and_bare_paths() {
        let items = parse_srcset(" a.png 1.5x ,b.png,  c.png\t2x, ");
        assert_eq!(
            items,
            vec![
                SrcSetItem { path: "a.png", descriptor: "1.5x" },
                SrcSetItem { path: "b.png", descriptor: "" },
                SrcSetItem { path: "c.png", descriptor: "2x" },
            ]
        );
    }

    #[test]
    fn composes_back() {
        let out = compose_srcset(vec![("x.png".to_string(), "2x"), ("y.png".to_string(), "")]);
        assert_eq!(out, "x.png 2x, y.png");
    }
}
