//! Output module for reporting crawl results
//!
//! This module handles:
//! - Formatting the summary of a finished run
//! - Reading and printing status statistics from the progress database

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use summary::{format_summary, print_summary};
