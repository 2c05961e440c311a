//! Statistics generation from the checkpoint database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::fetcher::FetchStrategy;
use crate::storage::{CheckpointStore, FailureKind, RunRecord, StoreResult};
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Number of checkpointed URLs
    pub completed: u64,

    /// Number of URLs with persisted content (includes summary failures)
    pub total_results: u64,

    /// Number of results that carry a summary
    pub summarized: u64,

    /// Count of results by fetch strategy
    pub results_by_strategy: HashMap<FetchStrategy, u64>,

    /// (min, max, average) content length in characters
    pub content_length: Option<(u64, u64, f64)>,

    /// Failure ledger entries by kind
    pub failures_by_kind: HashMap<FailureKind, u64>,

    /// URLs that failed and were never completed afterwards
    pub unresolved_failures: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The checkpoint store to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StoreError)` - Failed to query statistics
pub fn load_statistics(store: &dyn CheckpointStore) -> StoreResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        completed: store.completed_count() as u64,
        total_results: store.count_results()?,
        summarized: store.count_summarized()?,
        results_by_strategy: store.count_by_strategy()?,
        content_length: store.content_length_range()?,
        failures_by_kind: store.count_failures_by_kind()?,
        unresolved_failures: store.failed_urls()?.len() as u64,
        latest_run: store.latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Completed URLs: {}", stats.completed);
    println!("  Stored results: {}", stats.total_results);
    println!(
        "  Summarized: {} ({:.1}%)",
        stats.summarized,
        percentage(stats.summarized, stats.total_results)
    );
    println!();

    if !stats.results_by_strategy.is_empty() {
        println!("Results by Fetch Strategy:");
        let mut strategy_counts: Vec<_> = stats.results_by_strategy.iter().collect();
        strategy_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (strategy, count) in strategy_counts {
            println!(
                "  {}: {} ({:.1}%)",
                strategy,
                count,
                percentage(*count, stats.total_results)
            );
        }
        println!();
    }

    if let Some((min, max, avg)) = stats.content_length {
        println!("Content Length:");
        println!("  Min: {} chars", min);
        println!("  Max: {} chars", max);
        println!("  Average: {:.0} chars", avg);
        println!();
    }

    if !stats.failures_by_kind.is_empty() {
        println!("Failure Ledger:");
        let mut failure_counts: Vec<_> = stats.failures_by_kind.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!("  Unresolved URLs: {}", stats.unresolved_failures);
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    let attempted = stats.completed + stats.unresolved_failures;
    println!(
        "Success Rate: {:.1}% ({} / {} URLs completed)",
        percentage(stats.completed, attempted),
        stats.completed,
        attempted
    );
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}
