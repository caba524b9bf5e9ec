//! Human-readable run summary
//!
//! This module renders the counters of a finished run for the terminal.

use crate::harvest::StopReason;
use crate::model::ScrapingStats;
use std::fmt::Write;

/// Renders the run summary as text
///
/// # Arguments
///
/// * `stats` - Counters of the finished run
/// * `reason` - Why the run ended
pub fn format_run_summary(stats: &ScrapingStats, reason: &StopReason) -> String {
    let mut out = String::new();
    let duration_secs = stats.duration().num_milliseconds() as f64 / 1000.0;

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Harvest Summary ===\n");
    let _ = writeln!(out, "Stopped: {}", reason);
    let _ = writeln!(
        out,
        "Duration: {:.1}s ({:.1} min)\n",
        duration_secs,
        duration_secs / 60.0
    );

    let _ = writeln!(out, "Posts & Comments:");
    let _ = writeln!(out, "  Total posts: {}", stats.total_posts);
    let _ = writeln!(out, "  New posts: {}", stats.new_posts);
    let _ = writeln!(out, "  Updated posts: {}", stats.updated_posts);
    let _ = writeln!(out, "  Duplicates skipped: {}", stats.duplicates_skipped);
    let _ = writeln!(out, "  Total comments: {}", stats.total_comments);
    let _ = writeln!(
        out,
        "  Avg comments: {:.1} per post\n",
        stats.total_comments as f64 / stats.total_posts.max(1) as f64
    );

    let _ = writeln!(out, "Reliability:");
    let _ = writeln!(out, "  Errors: {}", stats.errors);
    let _ = writeln!(out, "  Retries: {}", stats.retries);
    let _ = writeln!(out, "  Empty pages: {}\n", stats.empty_pages);

    if !stats.http_status_codes.is_empty() {
        let _ = writeln!(out, "HTTP Status Codes:");
        for (code, count) in &stats.http_status_codes {
            let _ = writeln!(out, "  {}: {}", code, count);
        }
        out.push('\n');
    }

    if duration_secs > 0.0 {
        let _ = writeln!(
            out,
            "Throughput: {:.1} posts/min",
            stats.total_posts as f64 / (duration_secs / 60.0)
        );
    }

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} posts / {} errors)",
        stats.success_rate(),
        stats.total_posts,
        stats.errors
    );

    out
}

/// Prints the run summary to stdout
pub fn print_run_summary(stats: &ScrapingStats, reason: &StopReason) {
    print!("{}", format_run_summary(stats, reason));
}
