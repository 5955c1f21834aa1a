//! HTML parser for extracting links to follow
//!
//! This module scans a fetched page for two kinds of links:
//! - Page links, from every `<a href="...">`
//! - Asset links, from `<link href="...">` and `<script src="...">` whose
//!   value mentions `.css` or `.js`
//!
//! Links are returned raw; resolving and scoping them is the normalizer's job.

use scraper::{Html, Selector};
use thiserror::Error;

/// Errors raised while extracting links from a document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Raw links found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Candidate pages (anchor hrefs)
    pub page_links: Vec<String>,

    /// Candidate assets (stylesheets and scripts)
    pub asset_links: Vec<String>,
}

/// Tags whose attribute may point at an asset
const ASSET_SOURCES: &[(&str, &str)] = &[("link", "href"), ("script", "src")];

/// Markers an asset link must contain to be fetched
const ASSET_MARKERS: &[&str] = &[".css", ".js"];

/// Extracts page and asset links from a document
///
/// The body is decoded lossily, so documents that are not valid UTF-8 are
/// still scanned.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_links;
///
/// let html = br#"<html><head><link rel="stylesheet" href="/site.css"></head>
///     <body><a href="/about">About</a></body></html>"#;
/// let links = extract_links(html).unwrap();
/// assert_eq!(links.page_links, vec!["/about"]);
/// assert_eq!(links.asset_links, vec!["/site.css"]);
/// ```
pub fn extract_links(body: &[u8]) -> Result<ExtractedLinks, ExtractionError> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let mut links = ExtractedLinks::default();

    for element in document.select(&selector("a")?) {
        // An anchor without href is a plain named anchor
        if let Some(href) = element.value().attr("href") {
            links.page_links.push(href.to_string());
        }
    }

    for (tag, attr) in ASSET_SOURCES {
        for element in document.select(&selector(tag)?) {
            let Some(value) = element.value().attr(attr) else {
                // Inline scripts have no src, only a link without href is odd
                if *tag != "script" {
                    tracing::debug!("Skipping <{}> without {}", tag, attr);
                }
                continue;
            };

            if ASSET_MARKERS.iter().any(|marker| value.contains(marker)) {
                links.asset_links.push(value.to_string());
            }
        }
    }

    Ok(links)
}

fn selector(source: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(source).map_err(|e| ExtractionError::Selector {
        selector: source.to_string(),
        message: e.to_string(),
    })
}
