//! Session statistics
//!
//! This module provides the counters a session keeps while it runs and
//! a formatted report printed when it finishes.

use crate::pipeline::FetchOutcome;
use std::time::Duration;

/// Scraping session statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Batches fully fetched and extracted
    pub batches: usize,

    /// Total number of batches scheduled
    pub total_batches: usize,

    /// URLs handed to the fetch strategy
    pub urls_fetched: usize,

    /// Responses accepted for extraction
    pub accepted: usize,

    /// Responses rejected by status code
    pub rejected: usize,

    /// URLs that timed out or failed in transport
    pub skipped: usize,

    /// Pages whose fields were extracted
    pub extracted: usize,

    /// Pages dropped because extraction could not run
    pub extraction_failures: usize,

    /// Wall-clock time of the session
    pub elapsed: Duration,
}

impl SessionStats {
    pub fn new(total_batches: usize) -> Self {
        Self {
            total_batches,
            ..Self::default()
        }
    }

    /// Counts a batch's fetch outcomes
    pub fn record_fetches(&mut self, outcomes: &[FetchOutcome]) {
        self.urls_fetched += outcomes.len();
        for outcome in outcomes {
            match outcome {
                FetchOutcome::Body(_) => self.accepted += 1,
                FetchOutcome::Status(_) => self.rejected += 1,
                FetchOutcome::Skipped => self.skipped += 1,
            }
        }
    }

    /// Share of fetched URLs that were extracted, in percent
    pub fn success_rate(&self) -> f64 {
        if self.urls_fetched > 0 {
            (self.extracted as f64 / self.urls_fetched as f64) * 100.0
        } else {
            0.0
        }
    }

    /// True when every scheduled batch ran
    pub fn is_complete(&self) -> bool {
        self.batches == self.total_batches
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// Stdout is left to the JSON results.
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SessionStats) {
    eprintln!("=== Session Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Batches processed: {} / {}", stats.batches, stats.total_batches);
    eprintln!("  URLs fetched: {}", stats.urls_fetched);
    eprintln!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    eprintln!();

    eprintln!("Responses:");
    eprintln!("  Accepted: {}", stats.accepted);
    eprintln!("  Rejected: {}", stats.rejected);
    eprintln!("  Skipped: {}", stats.skipped);
    eprintln!();

    if stats.extraction_failures > 0 {
        eprintln!("Extraction failures: {}", stats.extraction_failures);
        eprintln!();
    }

    if !stats.is_complete() {
        eprintln!(
            "Session aborted after {} of {} batches",
            stats.batches, stats.total_batches
        );
        eprintln!();
    }

    eprintln!(
        "Success Rate: {:.1}% ({} / {} pages extracted)",
        stats.success_rate(),
        stats.extracted,
        stats.urls_fetched
    );
}
