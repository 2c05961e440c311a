/// Per-URL state definitions for one orchestrator run
use std::fmt;

/// Represents the current state of a URL within a run
///
/// ```text
/// Pending -> Fetching -> FetchFailed
///                     -> Fetched -> SummaryFailed
///                                -> Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Waiting in the task queue
    Pending,

    /// A worker is fetching the content
    Fetching,

    /// Content is fetched; a summary may still be generated
    Fetched,

    // ===== Terminal States =====
    /// Content and (if enabled) summary are committed and checkpointed
    Completed,

    /// Neither fetch strategy produced usable content
    FetchFailed,

    /// The summarization backend failed; the fetched content is still persisted
    SummaryFailed,
}

impl UrlState {
    /// Returns true if no further processing happens in this run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::FetchFailed | Self::SummaryFailed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::SummaryFailed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Fetched -> Completed` covers both the summarized path and runs with
    /// summaries disabled.
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Fetched)
                | (Self::Fetching, Self::FetchFailed)
                | (Self::Fetched, Self::Completed)
                | (Self::Fetched, Self::SummaryFailed)
        )
    }

    /// Moves to `next`, or reports the illegal transition for `url`
    pub fn advance(self, url: &str, next: UrlState) -> crate::Result<UrlState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::HarvestError::InvalidTransition {
                url: url.to_string(),
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Completed => "completed",
            Self::FetchFailed => "fetch_failed",
            Self::SummaryFailed => "summary_failed",
        }
    }

    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Fetched,
            Self::Completed,
            Self::FetchFailed,
            Self::SummaryFailed,
        ]
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
