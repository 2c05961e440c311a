//! Shared fixtures: scripted fetchers and backends, fast configurations

use async_trait::async_trait;
use bookmark_harvest::config::{CrawlerConfig, RetryConfig, SummaryConfig};
use bookmark_harvest::crawler::DrainSignal;
use bookmark_harvest::fetcher::{
    ContentFetcher, CrawlResult, ExtractedPage, FetchError, FetchStrategy,
};
use bookmark_harvest::summarizer::{
    BackendError, BackendErrorKind, GenerationParams, SubmitRequest, SummaryBackend,
};
use bookmark_harvest::{BookmarkRecord, Summarizer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// `count` bookmarks on distinct hosts, in order
pub fn bookmarks(count: usize) -> Vec<BookmarkRecord> {
    (0..count)
        .map(|i| BookmarkRecord::new(format!("https://site{}.test/", i), format!("Site {}", i)))
        .collect()
}

pub fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        workers: 4,
        max_workers: 8,
        generate_summary: true,
        progress_interval: 5,
    }
}

/// Summary configuration with millisecond retry delays
pub fn summary_config() -> SummaryConfig {
    SummaryConfig {
        model_name: "mock-model".to_string(),
        max_input_length: 100,
        probe_on_start: false,
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..SummaryConfig::default()
    }
}

/// Fetcher with scripted outcomes
///
/// URLs containing "fail" fail with HTTP 404; everything else succeeds with
/// text derived from the URL.
#[derive(Default)]
pub struct ScriptedFetcher {
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    drain_after: OnceLock<(usize, DrainSignal)>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Triggers `signal` once `count` fetches have finished
    pub fn drain_after(&self, count: usize, signal: DrainSignal) {
        let _ = self.drain_after.set((count, signal));
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let finished = {
            let mut calls = self.calls.lock().unwrap();
            *calls.entry(url.to_string()).or_insert(0) += 1;
            calls.values().sum::<usize>()
        };
        if let Some((count, signal)) = self.drain_after.get() {
            if finished >= *count {
                signal.trigger();
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("fail") {
            return Err(FetchError::Http { status: 404 });
        }
        Ok(CrawlResult::new(
            url,
            ExtractedPage {
                title: Some(format!("Title of {}", url)),
                text: format!("Content of {} with enough words to summarize.", url),
            },
            FetchStrategy::Static,
            Some(200),
        ))
    }
}

/// Backend that fails its first `transient_failures` calls, then succeeds
///
/// Requests for URLs containing "reject" fail permanently.
pub struct ScriptedBackend {
    transient_failures: usize,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(transient_failures: usize) -> Self {
        Self {
            transient_failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SummaryBackend for ScriptedBackend {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn submit(
        &self,
        request: &SubmitRequest,
        _params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if request.instructions.contains("reject") {
            return Err(BackendError::new(BackendErrorKind::Rejected, "HTTP 400: bad input"));
        }
        if call < self.transient_failures {
            return Err(BackendError::new(BackendErrorKind::Transient, "HTTP 503"));
        }
        Ok(format!("Summary: {}", request.text.chars().take(20).collect::<String>()))
    }
}

pub fn summarizer(backend: ScriptedBackend) -> Summarizer {
    Summarizer::new(Box::new(backend), &summary_config())
}
