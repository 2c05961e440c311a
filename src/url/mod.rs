//! URL helpers for Bookmark Harvest
//!
//! Domain extraction and wildcard domain matching, used to route dynamic sites
//! to the rendering fetcher, to pick extraction rules, and to exclude bookmarks.

mod domain;
mod matcher;

pub use domain::{domain_of, extract_domain};
pub use matcher::{matches_wildcard, DomainSet};
