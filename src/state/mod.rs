//! Per-URL lifecycle tracking
//!
//! `UrlState` models the states a bookmark URL passes through during one run and
//! rejects transitions that would skip or revisit a step.

mod url_state;

pub use url_state::UrlState;
