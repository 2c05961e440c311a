//! Output module for run reports and dataset exports
//!
//! This module handles:
//! - Exporting the dataset and failure ledger as JSON arrays
//! - Printing the end-of-run summary
//! - Recording harvest statistics

mod export;
pub mod stats;

pub use export::{export_all, write_json_array, ExportCounts};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::config::OutputConfig;
use crate::crawler::RunSummary;
use crate::storage::FailureRecord;

/// Number of failures listed in the end-of-run report
const FAILURE_PREVIEW: usize = 10;

/// Prints the outcome of a run to stdout
///
/// # Arguments
///
/// * `summary` - Counts returned by the orchestrator
/// * `exports` - Records written by the final export
/// * `output` - Where the exports were written
pub fn print_run_summary(summary: &RunSummary, exports: &ExportCounts, output: &OutputConfig) {
    println!("\n=== Run Summary ===\n");
    println!("  Completed: {}", summary.completed);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
    if summary.interrupted {
        println!("  Remaining (interrupted): {}", summary.remaining);
    }
    println!();
    println!("  Dataset ({} records): {}", exports.dataset, output.dataset_json);
    println!("  Failures ({} records): {}", exports.failures, output.failures_json);
    println!("  Database: {}", output.database_path);
}

/// Prints the most recent failures of the ledger
pub fn print_failures(failures: &[FailureRecord]) {
    if failures.is_empty() {
        return;
    }

    println!("\nRecent failures:");
    for failure in failures.iter().rev().take(FAILURE_PREVIEW) {
        println!(
            "  [{}] {} ({} attempt{}): {}",
            failure.error_kind,
            failure.url,
            failure.attempt_count,
            if failure.attempt_count == 1 { "" } else { "s" },
            failure.message
        );
    }
    if failures.len() > FAILURE_PREVIEW {
        println!("  ... and {} more", failures.len() - FAILURE_PREVIEW);
    }
}
