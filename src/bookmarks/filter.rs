//! Candidate selection
//!
//! Decides which bookmarks are worth crawling at all. Filtering never reorders:
//! the crawl order is the export order.

use super::BookmarkRecord;
use crate::config::InputConfig;
use crate::url::DomainSet;
use std::collections::HashSet;

/// Collapses duplicate URLs, keeping the first occurrence
pub fn dedupe_by_url(records: Vec<BookmarkRecord>) -> Vec<BookmarkRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect()
}

/// Keeps only the first `limit` candidates (0 = unlimited)
pub fn apply_limit<T>(mut records: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 && records.len() > limit {
        records.truncate(limit);
    }
    records
}

/// Filters bookmarks down to crawlable candidates
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    exclude_prefixes: Vec<String>,
    exclude_domains: DomainSet,
    exclude_titles: HashSet<String>,
}

impl CandidateFilter {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            exclude_prefixes: config.exclude_prefixes.clone(),
            exclude_domains: DomainSet::new(&config.exclude_domains),
            exclude_titles: config.exclude_titles.iter().cloned().collect(),
        }
    }

    /// Returns true if the bookmark should be crawled
    pub fn accepts(&self, record: &BookmarkRecord) -> bool {
        let url = record.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }
        if self.exclude_prefixes.iter().any(|p| url.starts_with(p.as_str())) {
            return false;
        }
        if self.exclude_titles.contains(&record.title) {
            return false;
        }
        !self.exclude_domains.matches_url(url)
    }

    /// Applies the filter and removes duplicate URLs
    pub fn apply(&self, records: Vec<BookmarkRecord>) -> Vec<BookmarkRecord> {
        let before = records.len();
        let kept: Vec<_> = dedupe_by_url(records)
            .into_iter()
            .filter(|r| self.accepts(r))
            .collect();
        tracing::debug!("Filtered {} bookmarks down to {} candidates", before, kept.len());
        kept
    }
}
