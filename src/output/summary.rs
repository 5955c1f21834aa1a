//! Run summary formatting

use crate::crawler::CrawlSummary;

/// Formats the summary of a finished run as plain text
///
/// # Example
///
/// ```
/// use site_mirror::output::format_summary;
/// use site_mirror::CrawlSummary;
/// use std::time::Duration;
///
/// let summary = CrawlSummary {
///     root: "https://x.test/".to_string(),
///     saved: 3,
///     ignored: 1,
///     in_flight: 0,
///     rearmed: 0,
///     cancelled: false,
///     elapsed: Duration::from_secs(2),
/// };
/// assert!(format_summary(&summary).contains("Saved: 3"));
/// ```
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Mirror Summary: {} ===\n\n", summary.root));

    let outcome = if summary.cancelled {
        "cancelled"
    } else {
        "complete"
    };
    out.push_str(&format!("Outcome: {}\n", outcome));

    let secs = summary.elapsed.as_secs_f64();
    out.push_str(&format!("Elapsed: {:.1}s\n", secs));
    if summary.rearmed > 0 {
        out.push_str(&format!("Resumed items: {}\n", summary.rearmed));
    }
    out.push('\n');

    out.push_str(&format!("  Saved: {}\n", summary.saved));
    out.push_str(&format!("  Ignored: {}\n", summary.ignored));
    out.push_str(&format!("  In flight: {}\n", summary.in_flight));

    if secs > 0.0 && summary.saved > 0 {
        out.push_str(&format!(
            "\nThroughput: {:.2} items/sec\n",
            summary.saved as f64 / secs
        ));
    }

    if !summary.is_complete() {
        out.push_str("\nRun again with --resume to finish the remaining items.\n");
    }

    out
}

/// Prints the summary of a finished run to stdout
pub fn print_summary(summary: &CrawlSummary) {
    print!("{}", format_summary(summary));
}
