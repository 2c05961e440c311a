//! Storage traits and error types

use crate::bookmarks::BookmarkRecord;
use crate::fetcher::{CrawlResult, FetchStrategy};
use crate::storage::{DatasetEntry, FailureKind, FailureRecord, RunRecord, RunStatus};
use crate::summarizer::SummaryRecord;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Any of these aborts the run: without a working store no outcome can be
/// made durable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable record of completed URLs, results and failures
///
/// Every commit is atomic and durable before it returns. The checkpoint set
/// is monotonic: nothing removes a URL from it.
pub trait CheckpointStore: Send {
    // ===== Checkpoints =====

    /// Rebuilds the in-memory checkpoint set from disk and returns it
    fn load(&mut self) -> StoreResult<HashSet<String>>;

    /// Returns true if `url` is in the checkpoint set
    fn is_completed(&self, url: &str) -> bool;

    /// Number of checkpointed URLs
    fn completed_count(&self) -> usize;

    /// URLs with a failure record and no checkpoint
    fn failed_urls(&self) -> StoreResult<HashSet<String>>;

    // ===== Commits =====

    /// Persists the content (and summary, if any) and checkpoints the URL
    fn commit_success(
        &mut self,
        bookmark: &BookmarkRecord,
        crawl: &CrawlResult,
        summary: Option<&SummaryRecord>,
    ) -> StoreResult<()>;

    /// Appends a failure record, persisting already fetched content with it
    ///
    /// The URL is not checkpointed.
    fn commit_failure(
        &mut self,
        bookmark: &BookmarkRecord,
        failure: &FailureRecord,
        fetched: Option<&CrawlResult>,
    ) -> StoreResult<()>;

    // ===== Run Management =====

    /// Creates a run record and makes it the current run
    fn begin_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Sets the final status of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()>;

    fn latest_run(&self) -> StoreResult<Option<RunRecord>>;

    // ===== Exports =====

    /// Every persisted result, in first-commit order
    fn dataset(&self) -> StoreResult<Vec<DatasetEntry>>;

    /// The whole failure ledger, in commit order
    fn failures(&self) -> StoreResult<Vec<FailureRecord>>;

    // ===== Statistics =====

    fn count_results(&self) -> StoreResult<u64>;

    fn count_summarized(&self) -> StoreResult<u64>;

    fn count_by_strategy(&self) -> StoreResult<HashMap<FetchStrategy, u64>>;

    /// (min, max, average) content length of persisted results
    fn content_length_range(&self) -> StoreResult<Option<(u64, u64, f64)>>;

    fn count_failures_by_kind(&self) -> StoreResult<HashMap<FailureKind, u64>>;
}
