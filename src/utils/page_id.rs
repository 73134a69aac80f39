//! 页面标识符
//!
//! `PageId` 是站点命名空间内页面的规范名称：空格与下划线视为同一分隔符。
//! 发现链接时和查询状态时都经过同一个规范化函数，去重与已访问集合才能成立。

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use super::url::{is_same_host, resolve_url, Url};

/// 不镜像的命名空间前缀（大小写不敏感）
pub const BLOCKED_NAMESPACES: &[&str] = &[
    "Special",
    "File",
    "Image",
    "Media",
    "User",
    "MediaWiki",
    "Template",
    "Help",
    "Category",
    "Talk",
];

/// 非文档资源的扩展名
pub const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "php", "webp", "pdf",
];

/// 脚本路径前缀，`/w/index.php` 之类的链接都不是文章
const SCRIPT_PATH_PREFIX: &str = "/w/";

/// Characters that must be escaped inside a relative page href
const PAGE_PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// 规范化后的页面名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// 从原始名称创建标识符，规范化后为空则返回 `None`
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize_page_name(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// 从页面中的链接推导标识符
    ///
    /// 站外链接、带查询参数的动作链接、脚本路径、受限命名空间和非文档扩展名都返回 `None`。
    pub fn from_href(href: &str, base_url: &Url) -> Option<Self> {
        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let url = resolve_url(base_url, trimmed)?;
        Self::from_url(&url, base_url)
    }

    /// 从绝对 URL 推导标识符
    pub fn from_url(url: &Url, base_url: &Url) -> Option<Self> {
        if !matches!(url.scheme(), "http" | "https") || !is_same_host(url, base_url) {
            return None;
        }

        if url.query().is_some() {
            return None;
        }

        let path = percent_decode_str(url.path()).decode_utf8_lossy();
        if path.starts_with(SCRIPT_PATH_PREFIX) {
            return None;
        }

        let name = path.trim_start_matches('/');
        if name.is_empty()
            || name.contains('#')
            || is_blocked_namespace(name)
            || has_non_document_extension(name)
        {
            return None;
        }

        Self::new(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 输出文件的相对路径
    pub fn output_file_name(&self) -> String {
        format!("{}.html", self.0)
    }

    /// 镜像站内指向该页面的相对链接
    pub fn relative_href(&self) -> String {
        format!("./{}", utf8_percent_encode(&self.0, PAGE_PATH_ENCODE_SET))
    }

    /// 用于显示的标题（下划线还原为空格）
    pub fn display_title(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 统一空格与下划线分隔符，折叠连续分隔符并去掉首尾分隔符
pub fn normalize_page_name(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.trim().chars() {
        if c == ' ' || c == '_' || c == '\u{a0}' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('_');
        }
        pending_separator = false;
        normalized.push(c);
    }

    normalized
}

/// 名称是否位于受限命名空间（包括各类 `*_talk` 讨论命名空间）
pub fn is_blocked_namespace(name: &str) -> bool {
    let Some((namespace, _)) = name.split_once(':') else {
        return false;
    };
    let namespace = normalize_page_name(namespace);

    namespace.to_lowercase().ends_with("_talk")
        || BLOCKED_NAMESPACES
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(&namespace))
}

fn has_non_document_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, extension)) => NON_DOCUMENT_EXTENSIONS
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://en.tankiwiki.com").unwrap()
    }

    #[test]
    fn spaces_and_underscores_are_equivalent() {
        assert_eq!(PageId::new("Gold Boxes"), PageId::new("Gold_Boxes"));
        assert_eq!(PageId::new("  Gold __ Boxes_ ").unwrap().as_str(), "Gold_Boxes");
        assert_eq!(PageId::new(" _ "), None);
    }

    #[test]
    fn internal_links_become_page_ids() {
        let id = PageId::from_href("/Gold_Boxes", &base()).unwrap();
        assert_eq!(id.as_str(), "Gold_Boxes");

        let id = PageId::from_href("https://en.tankiwiki.com/Tank%20Body#Stats", &base()).unwrap();
        assert_eq!(id.as_str(), "Tank_Body");
    }

    #[test]
    fn blocked_links_are_rejected() {
        for href in [
            "/Special:RecentChanges",
            "/file:Crystal.png",
            "/User_talk:Someone",
            "/Category:Turrets",
            "/w/index.php?title=Crystals&action=edit",
            "/Crystals?action=history",
            "/skins/common.css",
            "/images/a/ab/Crystal.PNG",
            "#cite_note-1",
            "https://ru.tankiwiki.com/Crystals",
            "mailto:someone@example.com",
            "/",
        ] {
            assert_eq!(PageId::from_href(href, &base()), None, "{href}");
        }
    }

    #[test]
    fn namespaced_but_allowed_pages_pass() {
        let id = PageId::from_href("/Guide:Getting_started", &base()).unwrap();
        assert_eq!(id.as_str(), "Guide:Getting_started");
    }

    #[test]
    fn relative_href_escapes_path_breaking_characters() {
        let id = PageId::new("What? 100%").unwrap();
        assert_eq!(id.relative_href(), "./What%3F_100%25");
        assert_eq!(PageId::new("New Name").unwrap().relative_href(), "./New_Name");
        assert_eq!(PageId::new("New_Name").unwrap().output_file_name(), "New_Name.html");
    }
}
