use super::{CrawlResult, FetchError, FetchStrategy};
use crate::config::FetcherConfig;
use crate::url::DomainSet;

/// Decides when a URL is rendered instead of (or after) a static fetch
///
/// The two escalation signals are independent:
/// - `dynamic_domains`: matching URLs skip the static fetch (empty disables)
/// - `min_content_length`: shorter static results are re-fetched (0 disables)
///
/// `render_enabled = false` turns rendering off entirely.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    dynamic_domains: DomainSet,
    min_content_length: usize,
    render_enabled: bool,
}

impl FallbackPolicy {
    pub fn new(dynamic_domains: DomainSet, min_content_length: usize, render_enabled: bool) -> Self {
        Self {
            dynamic_domains,
            min_content_length,
            render_enabled,
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(
            DomainSet::new(&config.dynamic_domains),
            config.min_content_length,
            config.render_enabled,
        )
    }

    pub fn render_enabled(&self) -> bool {
        self.render_enabled
    }

    /// The strategy tried first for `url`
    pub fn initial_strategy(&self, url: &str) -> FetchStrategy {
        if self.render_enabled && self.dynamic_domains.matches_url(url) {
            FetchStrategy::Rendered
        } else {
            FetchStrategy::Static
        }
    }

    /// Applies the length rule to a static result
    pub fn check_static(&self, result: CrawlResult) -> Result<CrawlResult, FetchError> {
        if self.min_content_length > 0 && result.content_length < self.min_content_length {
            return Err(FetchError::TooShort {
                length: result.content_length,
                min: self.min_content_length,
            });
        }
        Ok(result)
    }

    /// Rendered results are held to the length rule, and must never be empty
    pub fn check_rendered(&self, result: CrawlResult) -> Result<CrawlResult, FetchError> {
        let min = self.min_content_length.max(1);
        if result.content_length < min {
            return Err(FetchError::TooShort {
                length: result.content_length,
                min,
            });
        }
        Ok(result)
    }

    /// Returns true if a failed static fetch should be retried by rendering
    pub fn should_escalate(&self, error: &FetchError) -> bool {
        self.render_enabled && error.escalates()
    }
}
