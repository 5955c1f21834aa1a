use crate::url::domain::extract_authority;
use crate::url::{CanonicalUrl, RejectReason};
use url::{ParseError, Url};

/// The domain scope of a crawl, built once from the root URL
///
/// A `Scope` holds the parsed root so that normalizing the many links found
/// during a crawl does not re-parse it every time.
#[derive(Debug, Clone)]
pub struct Scope {
    root: Url,
    origin_root: Url,
    authority: String,
    include_subdomains: bool,
}

impl Scope {
    /// Builds a scope from the crawl root
    ///
    /// The root must be an absolute http(s) URL with a host. Its query and
    /// fragment are dropped.
    pub fn new(root: &str, include_subdomains: bool) -> Result<Self, RejectReason> {
        let mut root =
            Url::parse(root.trim()).map_err(|e| RejectReason::MalformedUrl(e.to_string()))?;

        if root.scheme() != "http" && root.scheme() != "https" {
            return Err(RejectReason::UnsupportedScheme(root.scheme().to_string()));
        }

        let authority = extract_authority(&root)
            .ok_or_else(|| RejectReason::MalformedUrl("root URL has no host".to_string()))?;

        root.set_query(None);
        root.set_fragment(None);

        // Links without a host resolve against the site root, not the page
        let mut origin_root = root.clone();
        origin_root.set_path("/");

        Ok(Self {
            root,
            origin_root,
            authority,
            include_subdomains,
        })
    }

    /// Returns the canonical form of the crawl root
    pub fn root(&self) -> CanonicalUrl {
        CanonicalUrl::from(self.root.as_str())
    }

    /// Returns the host (and explicit port) every crawled URL is checked against
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns true if hosts containing the root host are in scope
    pub fn include_subdomains(&self) -> bool {
        self.include_subdomains
    }

    /// Normalizes a raw link into a canonical, in-scope URL
    ///
    /// # Normalization Steps
    ///
    /// 1. Trim whitespace and newlines
    /// 2. Reject anything mentioning `mailto`
    /// 3. Reject anything containing `#`, wherever it appears
    /// 4. Parse; links without a scheme or host take them from the root
    /// 5. Reject schemes other than http and https
    /// 6. Check the host against the scope
    /// 7. Drop the query
    pub fn normalize(&self, raw: &str) -> Result<CanonicalUrl, RejectReason> {
        let raw = raw.trim_matches('\n').trim();

        if raw.contains("mailto") {
            return Err(RejectReason::IsMailLink);
        }

        if raw.contains('#') {
            return Err(RejectReason::IsFragmentOnly);
        }

        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            // "//host/path" and "/path" both land here and take what they lack from the root
            Err(ParseError::RelativeUrlWithoutBase) => self
                .origin_root
                .join(raw)
                .map_err(|e| RejectReason::MalformedUrl(e.to_string()))?,
            Err(e) => return Err(RejectReason::MalformedUrl(e.to_string())),
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RejectReason::UnsupportedScheme(url.scheme().to_string()));
        }

        let authority = extract_authority(&url)
            .ok_or_else(|| RejectReason::MalformedUrl(format!("no host in {}", raw)))?;

        let in_scope = if self.include_subdomains {
            authority.contains(&self.authority)
        } else {
            authority == self.authority
        };
        if !in_scope {
            return Err(RejectReason::OutOfScope(authority));
        }

        url.set_query(None);

        Ok(CanonicalUrl::from(url.as_str()))
    }
}

/// Normalizes a raw link against a base URL
///
/// Convenience wrapper that builds a [`Scope`] for a single call; the crawler
/// keeps one `Scope` for the whole run instead.
///
/// # Examples
///
/// ```
/// use site_mirror::url::{normalize, CanonicalUrl};
///
/// let base = CanonicalUrl::from("https://x.test");
/// let url = normalize("//x.test/a?x=1", &base, false).unwrap();
/// assert_eq!(url.as_str(), "https://x.test/a");
/// ```
pub fn normalize(
    raw: &str,
    base: &CanonicalUrl,
    subdomains_allowed: bool,
) -> Result<CanonicalUrl, RejectReason> {
    Scope::new(base.as_str(), subdomains_allowed)?.normalize(raw)
}
