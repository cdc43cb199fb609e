//! Shared helpers: constants and URL utilities

pub mod constants;

/// Extract the host portion of a URL string.
///
/// Returns `None` for strings that do not parse as a URL or have no host.
#[must_use]
pub fn extract_domain(url_str: &str) -> Option<String> {
    url::Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Resolve a possibly-relative href against a base URL.
///
/// Absolute hrefs pass through untouched; anything else is joined against
/// the base. Unresolvable inputs come back empty rather than failing the
/// parse that produced them.
#[must_use]
pub fn resolve_url(base: &str, href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_host() {
        assert_eq!(
            extract_domain("https://remotive.com/remote-jobs"),
            Some("remotive.com".to_string())
        );
        assert_eq!(extract_domain("not a url"), None);
    }

    #[test]
    fn resolves_relative_href() {
        assert_eq!(
            resolve_url("https://boards.example.com/jobs", "/jobs/42"),
            "https://boards.example.com/jobs/42"
        );
        assert_eq!(
            resolve_url("https://boards.example.com", "https://other.com/x"),
            "https://other.com/x"
        );
    }
}
