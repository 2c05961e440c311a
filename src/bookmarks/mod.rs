//! Bookmark sources
//!
//! A bookmark source turns a browser export into an ordered, de-duplicated list
//! of [`BookmarkRecord`]s. The crawl pipeline only ever sees that list.

mod chrome;
mod filter;
mod list;

pub use chrome::ChromeBookmarkSource;
pub use filter::{apply_limit, CandidateFilter};
pub use list::JsonListSource;

use crate::config::{expand_home, BookmarkFormat, InputConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A saved URL with its browser metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Natural key; unique within a run
    pub url: String,

    pub title: String,

    /// Folder names from the export root down to the bookmark
    #[serde(default)]
    pub folder_path: Vec<String>,

    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

impl BookmarkRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            folder_path: Vec::new(),
            added_at: None,
        }
    }
}

/// Errors raised while reading a bookmark export
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("Bookmark file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read bookmark file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse bookmark file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Produces the ordered list of candidate bookmarks
pub trait BookmarkSource {
    fn list_candidates(&self) -> Result<Vec<BookmarkRecord>, BookmarkError>;
}

/// Builds the source described by the input configuration
pub fn source_from_config(config: &InputConfig) -> Box<dyn BookmarkSource> {
    let path = expand_home(&config.bookmarks_path);
    match config.format {
        BookmarkFormat::Chrome => Box::new(ChromeBookmarkSource::new(path)),
        BookmarkFormat::List => Box::new(JsonListSource::new(path)),
    }
}

/// Reads a file for a bookmark source, mapping errors to [`BookmarkError`]
fn read_export(path: &std::path::Path) -> Result<String, BookmarkError> {
    if !path.exists() {
        return Err(BookmarkError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| BookmarkError::Io {
        path: path.to_path_buf(),
        source,
    })
}
