use super::filter::dedupe_by_url;
use super::{read_export, BookmarkError, BookmarkRecord, BookmarkSource};
use std::path::PathBuf;

/// Reads a JSON array of bookmark records
///
/// This is the format of the filtered candidate list written at the start of
/// every run, so a previous `bookmarks.json` can be fed back in.
#[derive(Debug, Clone)]
pub struct JsonListSource {
    path: PathBuf,
}

impl JsonListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BookmarkSource for JsonListSource {
    fn list_candidates(&self) -> Result<Vec<BookmarkRecord>, BookmarkError> {
        let content = read_export(&self.path)?;
        let records: Vec<BookmarkRecord> =
            serde_json::from_str(&content).map_err(|source| BookmarkError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(dedupe_by_url(records))
    }
}
