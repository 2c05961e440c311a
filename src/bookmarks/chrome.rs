//! Chrome/Chromium `Bookmarks` file reader

use super::filter::dedupe_by_url;
use super::{read_export, BookmarkError, BookmarkRecord, BookmarkSource};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Seconds between the Windows epoch (1601-01-01) used by Chrome and the Unix epoch
const WINDOWS_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

#[derive(Debug, Deserialize)]
struct BookmarkFile {
    roots: Roots,
}

/// Roots are listed explicitly to keep the export order stable
#[derive(Debug, Deserialize)]
struct Roots {
    bookmark_bar: Option<Node>,
    other: Option<Node>,
    synced: Option<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    url: Option<String>,
    date_added: Option<String>,
    #[serde(default)]
    children: Vec<Node>,
}

/// Reads bookmarks from a Chrome profile's `Bookmarks` JSON file
#[derive(Debug, Clone)]
pub struct ChromeBookmarkSource {
    path: PathBuf,
}

impl ChromeBookmarkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parses the content of a `Bookmarks` file
    pub fn parse(content: &str) -> Result<Vec<BookmarkRecord>, serde_json::Error> {
        let file: BookmarkFile = serde_json::from_str(content)?;
        let mut records = Vec::new();

        for root in [file.roots.bookmark_bar, file.roots.other, file.roots.synced]
            .into_iter()
            .flatten()
        {
            let mut folders = Vec::new();
            collect(&root, &mut folders, &mut records);
        }

        Ok(dedupe_by_url(records))
    }
}

impl BookmarkSource for ChromeBookmarkSource {
    fn list_candidates(&self) -> Result<Vec<BookmarkRecord>, BookmarkError> {
        let content = read_export(&self.path)?;
        let records = Self::parse(&content).map_err(|source| BookmarkError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            "Read {} bookmarks from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Depth-first walk that keeps the order of the export
fn collect(node: &Node, folders: &mut Vec<String>, out: &mut Vec<BookmarkRecord>) {
    if node.kind == "folder" || (node.url.is_none() && !node.children.is_empty()) {
        folders.push(node.name.clone());
        for child in &node.children {
            collect(child, folders, out);
        }
        folders.pop();
        return;
    }

    if let Some(url) = node.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        out.push(BookmarkRecord {
            url: url.to_string(),
            title: node.name.clone(),
            folder_path: folders.clone(),
            added_at: node.date_added.as_deref().and_then(parse_chrome_time),
        });
    }
}

/// Converts Chrome's "microseconds since 1601-01-01" timestamps
fn parse_chrome_time(raw: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = raw.trim().parse().ok()?;
    if micros <= 0 {
        return None;
    }
    let unix_micros = micros - WINDOWS_EPOCH_OFFSET_SECS * 1_000_000;
    DateTime::from_timestamp(
        unix_micros.div_euclid(1_000_000),
        (unix_micros.rem_euclid(1_000_000) * 1_000) as u32,
    )
}
