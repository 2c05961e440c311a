//! Bookmark Harvest: a resumable bookmark crawler and summarizer
//!
//! This crate turns an exported set of browser bookmarks into a personal knowledge
//! base. Every bookmark is fetched (cheaply over HTTP first, through a headless
//! browser when the page needs it), summarized by a pluggable text-generation
//! backend, and checkpointed so an interrupted run picks up exactly where it stopped.

pub mod bookmarks;
pub mod config;
pub mod crawler;
pub mod fetcher;
pub mod output;
pub mod state;
pub mod storage;
pub mod summarizer;
pub mod url;

use thiserror::Error;

/// Main error type for Bookmark Harvest operations
///
/// Only configuration, bookmark source, storage and worker failures ever reach
/// this type at the run level. Per-URL fetch and summary failures are converted
/// into failure records inside the worker pool.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bookmark source error: {0}")]
    Bookmarks(#[from] bookmarks::BookmarkError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetcher::FetchError),

    #[error("Summary error: {0}")]
    Summary(#[from] summarizer::SummaryError),

    #[error("Invalid state transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: state::UrlState,
        to: state::UrlState,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
///
/// All of these are fatal and abort the program before any URL is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Unknown model type: '{0}' (expected openai, deepseek, qwen or ollama)")]
    UnknownModelType(String),

    #[error("An API key is required for the '{0}' backend (set API_KEY)")]
    MissingApiKey(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Summarization backend check failed: {0}")]
    BackendProbe(String),
}

/// Result type alias for Bookmark Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use bookmarks::BookmarkRecord;
pub use config::Config;
pub use crawler::{Orchestrator, RunOptions, RunSummary};
pub use fetcher::{CrawlResult, FetchStrategy};
pub use state::UrlState;
pub use storage::{CheckpointStore, FailureRecord, SqliteStore};
pub use summarizer::{SummaryRecord, Summarizer};
