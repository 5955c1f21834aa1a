//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client from the `[http]` settings
//! - GET requests returning the raw body
//! - Classifying failures (transport, HTTP status, body read)
//!
//! There is no retry: any failure marks the item as ignored for this run.

use crate::config::HttpConfig;
use crate::state::ItemKind;
use crate::url::CanonicalUrl;
use reqwest::Client;
use thiserror::Error;

/// Why a fetch produced no body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Returns true if the request timed out at any stage
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Transport { source, .. } | FetchError::Body { source, .. } => {
                source.is_timeout()
            }
            FetchError::Status { .. } => false,
        }
    }
}

/// A fetched page and the raw links found on it
#[derive(Debug)]
pub struct FetchedPage {
    pub url: CanonicalUrl,
    pub body: Vec<u8>,
    pub page_links: Vec<String>,
    pub asset_links: Vec<String>,
}

/// A fetched stylesheet or script
#[derive(Debug)]
pub struct FetchedAsset {
    pub url: CanonicalUrl,
    pub body: Vec<u8>,
}

/// A fetched item on its way to the archive
#[derive(Debug)]
pub enum FetchedItem {
    Page(FetchedPage),
    Asset(FetchedAsset),
}

impl FetchedItem {
    pub fn url(&self) -> &CanonicalUrl {
        match self {
            FetchedItem::Page(page) => &page.url,
            FetchedItem::Asset(asset) => &asset.url,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            FetchedItem::Page(_) => ItemKind::Page,
            FetchedItem::Asset(_) => ItemKind::Asset,
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            FetchedItem::Page(page) => &page.body,
            FetchedItem::Asset(asset) => &asset.body,
        }
    }
}

/// Builds the HTTP client shared by every fetch worker
///
/// Redirects are followed with reqwest's default policy, and compressed
/// transfer encodings are decoded so the archive holds the real content.
///
/// # Arguments
///
/// * `config` - The `[http]` configuration section
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```
/// use site_mirror::config::HttpConfig;
/// use site_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .tcp_keepalive(config.keepalive())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns the full body
///
/// Any status outside 2xx is a failure; error pages are never archived.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `url` - The canonical URL to fetch
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - The response body
/// * `Err(FetchError)` - The request, status, or body read failed
pub async fn fetch_body(client: &Client, url: &CanonicalUrl) -> Result<Vec<u8>, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!("Fetched {} ({} bytes)", url, body.len());
    Ok(body.to_vec())
}
