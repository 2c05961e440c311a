//! Storage module for checkpoints, results and failures
//!
//! The checkpoint store is the source of truth for resuming runs:
//! - the checkpoint set of completed URLs (insert-only)
//! - fetched content and summaries, keyed by URL
//! - an append-only failure ledger
//! - one record per orchestrator run

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CheckpointStore, StoreError, StoreResult};

use crate::bookmarks::BookmarkRecord;
use crate::fetcher::{CrawlResult, FetchError, FetchStrategy};
use crate::summarizer::{SummaryError, SummaryRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opens (or creates) the checkpoint database and loads the checkpoint set
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    let mut store = SqliteStore::open(path)?;
    store.load()?;
    Ok(store)
}

/// Which stage of the pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FetchError,
    SummaryError,
}

impl FailureKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::FetchError => "fetch_error",
            Self::SummaryError => "summary_error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetch_error" => Some(Self::FetchError),
            "summary_error" => Some(Self::SummaryError),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One entry of the failure ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub error_kind: FailureKind,
    pub message: String,
    pub attempt_count: u32,
    pub occurred_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn fetch(url: impl Into<String>, error: &FetchError) -> Self {
        Self {
            url: url.into(),
            error_kind: FailureKind::FetchError,
            message: error.to_string(),
            attempt_count: 1,
            occurred_at: Utc::now(),
        }
    }

    pub fn summary(url: impl Into<String>, error: &SummaryError) -> Self {
        Self {
            url: url.into(),
            error_kind: FailureKind::SummaryError,
            message: error.to_string(),
            attempt_count: error.attempts(),
            occurred_at: Utc::now(),
        }
    }
}

/// One row of the content+summary dataset
///
/// Bookmark metadata merged with the fetch result and, when one exists, the
/// summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub folder_path: Vec<String>,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page_title: Option<String>,
    pub content: String,
    pub content_length: usize,
    pub crawl_method: FetchStrategy,
    #[serde(default)]
    pub http_status: Option<u16>,
    pub crawl_time: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summary_model: Option<String>,
    #[serde(default)]
    pub input_token_estimate: Option<u32>,
    #[serde(default)]
    pub summary_time: Option<DateTime<Utc>>,
}

impl DatasetEntry {
    pub fn new(
        bookmark: &BookmarkRecord,
        crawl: &CrawlResult,
        summary: Option<&SummaryRecord>,
    ) -> Self {
        Self {
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            folder_path: bookmark.folder_path.clone(),
            added_at: bookmark.added_at,
            page_title: crawl.page_title.clone(),
            content: crawl.raw_content.clone(),
            content_length: crawl.content_length,
            crawl_method: crawl.strategy_used,
            http_status: crawl.http_status,
            crawl_time: crawl.fetched_at,
            summary: summary.map(|s| s.summary_text.clone()),
            summary_model: summary.map(|s| s.model_used.clone()),
            input_token_estimate: summary.map(|s| s.input_token_estimate),
            summary_time: summary.map(|s| s.generated_at),
        }
    }

    pub fn has_summary(&self) -> bool {
        self.summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    pub fn bookmark(&self) -> BookmarkRecord {
        BookmarkRecord {
            url: self.url.clone(),
            title: self.title.clone(),
            folder_path: self.folder_path.clone(),
            added_at: self.added_at,
        }
    }

    pub fn crawl_result(&self) -> CrawlResult {
        CrawlResult {
            url: self.url.clone(),
            raw_content: self.content.clone(),
            page_title: self.page_title.clone(),
            strategy_used: self.crawl_method,
            http_status: self.http_status,
            content_length: self.content_length,
            fetched_at: self.crawl_time,
        }
    }
}

/// Represents an orchestrator run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of an orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
