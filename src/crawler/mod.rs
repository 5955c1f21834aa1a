//! Crawler module for mirroring a site
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - HTML link extraction
//! - Writing the archive
//! - Overall crawl coordination

mod archive;
mod coordinator;
mod fetcher;
mod parser;

pub use archive::{Archive, ArchiveError};
pub use coordinator::{CrawlSummary, Crawler, RunPhase};
pub use fetcher::{
    build_http_client, fetch_body, FetchError, FetchedAsset, FetchedItem, FetchedPage,
};
pub use parser::{extract_links, ExtractedLinks, ExtractionError};

use crate::config::Config;
use crate::MirrorError;

/// Runs a complete crawl operation
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Open or reset the progress database
/// 2. Seed the frontier, or re-arm what a previous run left in flight
/// 3. Fetch pages and assets, following in-scope links
/// 4. Write everything to the archive
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The crawl ran to completion
/// * `Err(MirrorError)` - The crawl could not start
pub async fn crawl(config: Config) -> Result<CrawlSummary, MirrorError> {
    Ok(Crawler::new(config)?.run().await)
}
