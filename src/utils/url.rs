//! URL 处理工具
//!
//! 把页面中出现的各种相对、根相对、协议相对引用统一解析为源站点上的绝对 URL。

pub use url::Url;

/// 解析相对于 `from` 的引用，失败时返回 `None`
pub fn resolve_url(from: &Url, to: &str) -> Option<Url> {
    from.join(to.trim()).ok()
}

/// 判断引用是否为根相对路径（`/path`，但不是协议相对的 `//host/path`）
pub fn is_root_relative(href: &str) -> bool {
    href.starts_with('/') && !href.starts_with("//")
}

/// 判断 URL 是否带有 http(s) 协议
pub fn is_url_and_has_protocol(input: &str) -> bool {
    match Url::parse(input) {
        Ok(parsed_url) => matches!(parsed_url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// 将资源引用转换为绝对 URL 字符串
///
/// 已经是绝对地址的引用原样返回；`data:` 等非网络引用不做处理。
pub fn absolutize(base: &Url, reference: &str) -> Option<String> {
    let trimmed = reference.trim();

    if trimmed.is_empty() || trimmed.starts_with("data:") || trimmed.starts_with("javascript:") {
        return None;
    }

    let resolved = resolve_url(base, trimmed)?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// 两个 URL 是否指向同一主机
pub fn is_same_host(a: &Url, b: &Url) -> bool {
    a.host_str().map(|h| h.to_ascii_lowercase()) == b.host_str().map(|h| h.to_ascii_lowercase())
}
