use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL. The `url` crate already
/// lowercases hosts of http(s) URLs while parsing.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the host together with an explicit port
///
/// Default ports are dropped by the URL parser, so `https://x.test:443/`
/// and `https://x.test/` share the authority `x.test`. This is the value the
/// crawl scope is checked against.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_authority;
///
/// let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
/// assert_eq!(extract_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        let url = Url::parse("https://sub.example.com/path").unwrap();
        assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
    }

    #[test]
    fn test_extract_domain_without_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_domain(&url), None);
    }

    #[test]
    fn test_authority_drops_default_port() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(extract_authority(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_authority_keeps_explicit_port() {
        let url = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(extract_authority(&url), Some("localhost:3000".to_string()));
    }
}
