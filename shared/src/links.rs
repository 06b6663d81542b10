//! 站点链接改写
//!
//! 站点域名由后端 `settings` 表配置，页面上带 `data-host-path` 的链接
//! 会被改写为 `https://{host}{path}`。

/// 去掉协议前缀和末尾斜杠；结果为空时返回 None
pub fn normalize_host(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme.trim_end_matches('/');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// 拼接最终链接，path 缺少前导斜杠时自动补上
pub fn rewrite_href(host: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        format!("https://{}{}", host, path)
    } else {
        format!("https://{}/{}", host, path)
    }
}

/// 选择生效的域名：优先使用后端返回值，否则回退到本地缓存
pub fn resolve_host(fetched: Option<&str>, cached: Option<&str>) -> Option<String> {
    fetched
        .and_then(normalize_host)
        .or_else(|| cached.and_then(normalize_host))
}
