//! Static HTTP fetching

use super::encoding::decode_body;
use super::{CrawlResult, FetchError, FetchStrategy, TextExtractor};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;

/// Content types worth extracting text from
const TEXT_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml", "text/plain"];

/// Fetches pages with a plain GET request
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
    extractor: Arc<TextExtractor>,
}

impl StaticFetcher {
    pub fn new(client: Client, extractor: Arc<TextExtractor>) -> Self {
        Self { client, extractor }
    }

    /// Fetches `url` and extracts its text
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | non-2xx status | `Http` |
    /// | timeout | `Timeout` |
    /// | connection, TLS or redirect failure | `Network` |
    /// | non-text Content-Type | `UnsupportedContent` |
    ///
    /// The length threshold is not applied here; see [`super::FallbackPolicy`].
    pub async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !TEXT_CONTENT_TYPES
            .iter()
            .any(|accepted| content_type.contains(accepted))
        {
            return Err(FetchError::UnsupportedContent { content_type });
        }

        let bytes = response.bytes().await?;
        let body = decode_body(&bytes, &content_type);
        let page = self.extractor.extract(url, &body);
        tracing::debug!(
            "Static fetch of {} returned {} ({} chars)",
            url,
            status.as_u16(),
            page.text.chars().count()
        );

        Ok(CrawlResult::new(
            url,
            page,
            FetchStrategy::Static,
            Some(status.as_u16()),
        ))
    }
}
