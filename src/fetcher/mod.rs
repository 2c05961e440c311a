//! Content fetcher
//!
//! Retrieves the readable text behind one URL. Two strategies are available:
//! - a cheap static HTTP GET, decoded with the page's declared or detected
//!   charset and parsed with `scraper`
//! - a headless browser render for pages that only exist after scripts ran
//!
//! [`TwoTierFetcher`] decides between them with a [`FallbackPolicy`].

mod encoding;
mod extract;
mod http;
mod policy;
mod render;
mod two_tier;

pub use extract::{clean_text, ExtractedPage, TextExtractor};
pub use http::StaticFetcher;
pub use policy::FallbackPolicy;
pub use render::{ChromeRenderer, PageRenderer};
pub use two_tier::TwoTierFetcher;

use crate::config::FetcherConfig;
use crate::ConfigError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of redirects followed by the static fetcher
const MAX_REDIRECTS: usize = 10;

/// How the content of a page was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    Static,
    Rendered,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rendered => "rendered",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "rendered" => Some(Self::Rendered),
            _ => None,
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetched and extracted content of one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// The bookmark URL (not the post-redirect URL)
    pub url: String,

    /// Cleaned text content
    pub raw_content: String,

    /// `<title>` of the fetched document
    pub page_title: Option<String>,

    pub strategy_used: FetchStrategy,

    /// HTTP status of a static fetch; absent for rendered fetches
    pub http_status: Option<u16>,

    /// Length of `raw_content` in characters
    pub content_length: usize,

    pub fetched_at: DateTime<Utc>,
}

impl CrawlResult {
    pub fn new(
        url: impl Into<String>,
        page: ExtractedPage,
        strategy_used: FetchStrategy,
        http_status: Option<u16>,
    ) -> Self {
        let content_length = page.text.chars().count();
        Self {
            url: url.into(),
            raw_content: page.text,
            page_title: page.title,
            strategy_used,
            http_status,
            content_length,
            fetched_at: Utc::now(),
        }
    }
}

/// Reasons a fetch can fail
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Content too short ({length} < {min} characters)")]
    TooShort { length: usize, min: usize },

    #[error("Unsupported content type: {content_type}")]
    UnsupportedContent { content_type: String },

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Rendering timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    #[error("Static fetch failed ({static_error}); rendering failed ({render_error})")]
    BothStrategiesFailed {
        static_error: String,
        render_error: String,
    },
}

impl FetchError {
    /// Returns true if this static-fetch failure justifies a rendering attempt
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Timeout(_) | Self::Network(_) | Self::TooShort { .. }
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Anything that can turn a URL into a [`CrawlResult`]
///
/// The orchestrator only depends on this trait; tests substitute scripted
/// fetchers for it.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError>;
}

/// Builds the HTTP client used for static fetches
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.static_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the production fetcher: static first, Chrome as the fallback
pub fn build_fetcher(config: &FetcherConfig) -> Result<TwoTierFetcher, ConfigError> {
    let client = build_http_client(config).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
    let extractor = Arc::new(TextExtractor::new(&config.extract_rules));
    let static_fetcher = StaticFetcher::new(client, Arc::clone(&extractor));

    let renderer: Option<Arc<dyn PageRenderer>> = if config.render_enabled {
        Some(Arc::new(ChromeRenderer::new(config)))
    } else {
        None
    };

    Ok(TwoTierFetcher::new(
        static_fetcher,
        renderer,
        extractor,
        FallbackPolicy::from_config(config),
    ))
}
