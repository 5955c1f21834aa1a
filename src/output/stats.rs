//! Statistics from the progress database
//!
//! Used by `--stats` to report how far a mirror has progressed without
//! running a crawl.

use crate::state::{ItemStatus, StatusCounts};
use crate::storage::SqliteStorage;
use crate::MirrorError;

/// Status statistics of one mirrored site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// The site the rows belong to
    pub site: String,

    /// Recorded items per status
    pub counts: StatusCounts,
}

impl CrawlStatistics {
    /// Percentage of recorded items with the given status
    pub fn percentage(&self, status: ItemStatus) -> f64 {
        let total = self.counts.total();
        if total == 0 {
            return 0.0;
        }

        (self.counts.get(status) as f64 / total as f64) * 100.0
    }

    /// Returns true if a resumed run would have nothing to do
    pub fn is_complete(&self) -> bool {
        self.counts.in_flight == 0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The database of the site to report on
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to query the database
pub fn load_statistics(storage: &SqliteStorage) -> Result<CrawlStatistics, MirrorError> {
    Ok(CrawlStatistics {
        site: storage.site().to_string(),
        counts: storage.status_counts()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Mirror Statistics: {} ===\n", stats.site);

    println!("Items recorded: {}", stats.counts.total());
    for status in ItemStatus::all_statuses() {
        println!(
            "  {}: {} ({:.1}%)",
            status,
            stats.counts.get(status),
            stats.percentage(status)
        );
    }
    println!();

    if stats.counts.total() == 0 {
        println!("Nothing recorded yet for this site.");
    } else if stats.is_complete() {
        println!("Mirror is complete.");
    } else {
        println!(
            "{} items left in flight; run again with --resume to finish.",
            stats.counts.in_flight
        );
    }
}
