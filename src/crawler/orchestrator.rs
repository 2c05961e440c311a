//! Crawl orchestration over a bounded worker pool
//!
//! The orchestrator computes the pending set from the checkpoint store, seeds
//! one shared task queue with it and runs a fixed number of workers over that
//! queue. Each worker fetches, optionally summarizes and commits one URL before
//! it takes the next one, so every outcome is durable before more work starts.

use crate::bookmarks::{apply_limit, BookmarkRecord};
use crate::config::CrawlerConfig;
use crate::crawler::{DrainSignal, TaskQueue};
use crate::fetcher::{ContentFetcher, CrawlResult};
use crate::state::UrlState;
use crate::storage::{
    CheckpointStore, DatasetEntry, FailureRecord, RunStatus, StoreError, StoreResult,
};
use crate::summarizer::Summarizer;
use crate::{ConfigError, HarvestError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinSet;

/// Per-run options, usually taken from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Requested worker count, clamped to `[1, max_workers]`
    pub workers: usize,
    pub generate_summary: bool,
    /// Re-attempt URLs that failed in earlier runs
    pub retry_failed: bool,
}

/// Outcome counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs committed and checkpointed in this run
    pub completed: usize,
    /// URLs that ended with a failure record in this run
    pub failed: usize,
    /// Candidates excluded from the pending set
    pub skipped: usize,
    /// Pending URLs never started because the run was drained
    pub remaining: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }
}

/// One unit of work for a worker
#[derive(Debug)]
enum Task {
    /// Fetch, summarize (if enabled) and commit
    Crawl(BookmarkRecord),
    /// Summarize already persisted content and commit
    Summarize(DatasetEntry),
}

/// Drives the fetcher and summarizer over a pending set
pub struct Orchestrator<S: CheckpointStore + 'static> {
    store: Arc<Mutex<S>>,
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Option<Arc<Summarizer>>,
    max_workers: usize,
    progress_interval: usize,
    config_hash: String,
    drain: DrainSignal,
}

impl<S: CheckpointStore + 'static> Orchestrator<S> {
    /// Creates an orchestrator over an opened store
    ///
    /// # Arguments
    ///
    /// * `store` - The checkpoint store; its checkpoint set is reloaded on every run
    /// * `fetcher` - The content fetcher shared by all workers
    /// * `summarizer` - Required whenever a run generates summaries
    /// * `config` - Worker bound and progress interval
    pub fn new(
        store: S,
        fetcher: Arc<dyn ContentFetcher>,
        summarizer: Option<Arc<Summarizer>>,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            fetcher,
            summarizer,
            max_workers: config.max_workers.max(1),
            progress_interval: config.progress_interval.max(1),
            config_hash: String::new(),
            drain: DrainSignal::new(),
        }
    }

    /// Sets the configuration fingerprint stored on run records
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// A handle that stops workers from taking new tasks
    pub fn drain_signal(&self) -> DrainSignal {
        self.drain.clone()
    }

    /// Shared handle to the store, for exports after a run
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Clamps a requested worker count to `[1, max_workers]`
    pub fn effective_workers(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_workers)
    }

    /// Crawls every candidate that is not yet checkpointed
    ///
    /// Candidates that failed in an earlier run are skipped as well unless
    /// `retry_failed` is set. Per-URL failures never fail the run; a store
    /// error drains the pool and is returned.
    pub async fn run(
        &self,
        candidates: Vec<BookmarkRecord>,
        options: RunOptions,
    ) -> crate::Result<RunSummary> {
        if options.generate_summary && self.summarizer.is_none() {
            return Err(ConfigError::Validation(
                "summaries are enabled but no summarization backend is configured".to_string(),
            )
            .into());
        }

        let total = candidates.len();
        let (completed, failed) = self.with_store(|store| {
            let completed = store.load()?;
            let failed = if options.retry_failed {
                HashSet::new()
            } else {
                store.failed_urls()?
            };
            Ok((completed, failed))
        })?;

        let mut seen = HashSet::new();
        let pending: Vec<Task> = candidates
            .into_iter()
            .filter(|b| !completed.contains(&b.url) && !failed.contains(&b.url))
            .filter(|b| seen.insert(b.url.clone()))
            .map(Task::Crawl)
            .collect();
        let skipped = total - pending.len();

        tracing::info!(
            "{} candidates: {} already completed, {} previously failed{}, {} pending",
            total,
            completed.len(),
            failed.len(),
            if options.retry_failed { "" } else { " (skipped)" },
            pending.len()
        );

        self.execute(pending, options.workers, options.generate_summary, skipped)
            .await
    }

    /// Summarizes the first `limit` entries of the stored dataset (0 = all)
    ///
    /// The database is read rather than the JSON export, which may be older
    /// than the last commit.
    pub async fn summarize_stored(
        &self,
        limit: usize,
        workers: usize,
    ) -> crate::Result<RunSummary> {
        let entries = self.with_store(|store| store.dataset())?;
        let entries = apply_limit(entries, limit);
        self.summarize_existing(entries, workers).await
    }

    /// Generates summaries for persisted entries that have none yet
    ///
    /// Only the summarization backend runs; the stored content is reused as-is
    /// and committed through the same path as a fresh crawl.
    pub async fn summarize_existing(
        &self,
        entries: Vec<DatasetEntry>,
        workers: usize,
    ) -> crate::Result<RunSummary> {
        if self.summarizer.is_none() {
            return Err(ConfigError::Validation(
                "summarizing existing content requires a summarization backend".to_string(),
            )
            .into());
        }

        let total = entries.len();
        let pending: Vec<Task> = entries
            .into_iter()
            .filter(|e| !e.has_summary() && !e.content.trim().is_empty())
            .map(Task::Summarize)
            .collect();
        let skipped = total - pending.len();

        tracing::info!(
            "{} stored entries: {} already summarized or empty, {} to summarize",
            total,
            skipped,
            pending.len()
        );

        self.execute(pending, workers, true, skipped).await
    }

    /// Runs the worker pool over `tasks` and records the run
    async fn execute(
        &self,
        tasks: Vec<Task>,
        workers: usize,
        generate_summary: bool,
        skipped: usize,
    ) -> crate::Result<RunSummary> {
        let workers = self.effective_workers(workers);
        let run_id = self.with_store(|store| store.begin_run(&self.config_hash))?;
        tracing::info!(
            "Starting run {} with {} workers over {} URLs",
            run_id,
            workers,
            tasks.len()
        );

        let queue = Arc::new(TaskQueue::new(tasks));
        let progress = Arc::new(Progress::new(queue.len(), self.progress_interval));
        let context = Arc::new(WorkerContext {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            summarizer: self.summarizer.clone(),
            generate_summary,
            drain: self.drain.clone(),
            queue: Arc::clone(&queue),
            progress: Arc::clone(&progress),
        });

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let context = Arc::clone(&context);
            pool.spawn(async move { context.work(worker_id).await });
        }

        let mut first_error: Option<HarvestError> = None;
        while let Some(joined) = pool.join_next().await {
            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => HarvestError::Worker(e.to_string()),
            };
            self.drain.trigger();
            if first_error.is_none() {
                first_error = Some(error);
            }
        }

        let remaining = queue.len();
        let summary = RunSummary {
            completed: progress.completed.load(Ordering::SeqCst),
            failed: progress.failed.load(Ordering::SeqCst),
            skipped,
            remaining,
            interrupted: remaining > 0,
        };

        if let Some(error) = first_error {
            tracing::error!("Run {} failed: {}", run_id, error);
            if let Err(e) = self.with_store(|store| store.finish_run(run_id, RunStatus::Failed)) {
                tracing::warn!("Could not mark run {} as failed: {}", run_id, e);
            }
            return Err(error);
        }

        let status = if summary.interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.with_store(|store| store.finish_run(run_id, status))?;

        tracing::info!(
            "Run {} {}: {} completed, {} failed, {} skipped, {} remaining in {:.1?}",
            run_id,
            status.to_db_string(),
            summary.completed,
            summary.failed,
            summary.skipped,
            summary.remaining,
            progress.started.elapsed()
        );

        Ok(summary)
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut S) -> StoreResult<T>) -> StoreResult<T> {
        lock_store(&self.store, f)
    }
}

/// Runs `f` with the store locked
///
/// The guard never outlives this call, so it is never held across an await.
fn lock_store<S, T>(
    store: &Mutex<S>,
    f: impl FnOnce(&mut S) -> StoreResult<T>,
) -> StoreResult<T> {
    let mut guard = store.lock().map_err(|_| StoreError::Poisoned)?;
    f(&mut guard)
}

/// Finished-URL counters and periodic progress logging
struct Progress {
    total: usize,
    interval: usize,
    started: Instant,
    finished: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Progress {
    fn new(total: usize, interval: usize) -> Self {
        Self {
            total,
            interval,
            started: Instant::now(),
            finished: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn record(&self, state: UrlState) {
        if state.is_success() {
            self.completed.fetch_add(1, Ordering::SeqCst);
        } else if state.is_failure() {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        let finished = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        if finished % self.interval == 0 {
            let rate = finished as f64 / self.started.elapsed().as_secs_f64();
            tracing::info!(
                "Progress: {}/{} URLs finished ({} completed, {} failed), {:.2} URLs/sec",
                finished,
                self.total,
                self.completed.load(Ordering::SeqCst),
                self.failed.load(Ordering::SeqCst),
                rate
            );
        }
    }
}

/// Everything a worker needs, shared by the whole pool
struct WorkerContext<S> {
    store: Arc<Mutex<S>>,
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Option<Arc<Summarizer>>,
    generate_summary: bool,
    drain: DrainSignal,
    queue: Arc<TaskQueue<Task>>,
    progress: Arc<Progress>,
}

impl<S: CheckpointStore> WorkerContext<S> {
    async fn work(&self, worker_id: usize) -> crate::Result<()> {
        tracing::debug!("Worker {} started", worker_id);

        while !self.drain.is_draining() {
            let Some(task) = self.queue.pop() else {
                break;
            };

            let state = match task {
                Task::Crawl(bookmark) => self.crawl(&bookmark).await,
                Task::Summarize(entry) => {
                    self.summarize(&entry.bookmark(), entry.crawl_result(), UrlState::Fetched)
                        .await
                }
            };

            match state {
                Ok(state) => {
                    debug_assert!(state.is_terminal(), "worker left a URL in {}", state);
                    self.progress.record(state);
                }
                Err(e) => {
                    self.drain.trigger();
                    return Err(e);
                }
            }
        }

        tracing::debug!("Worker {} stopped", worker_id);
        Ok(())
    }

    /// Fetches one bookmark and hands the content on to summarization
    async fn crawl(&self, bookmark: &BookmarkRecord) -> crate::Result<UrlState> {
        let url = bookmark.url.as_str();
        let state = UrlState::Pending.advance(url, UrlState::Fetching)?;

        let crawl = match self.fetcher.fetch(url).await {
            Ok(crawl) => crawl,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", url, e);
                let failure = FailureRecord::fetch(url, &e);
                self.commit(|store| store.commit_failure(bookmark, &failure, None))?;
                return state.advance(url, UrlState::FetchFailed);
            }
        };

        tracing::debug!(
            "Fetched {} via {} ({} chars)",
            url,
            crawl.strategy_used,
            crawl.content_length
        );
        let state = state.advance(url, UrlState::Fetched)?;

        if !self.generate_summary {
            self.commit(|store| store.commit_success(bookmark, &crawl, None))?;
            return state.advance(url, UrlState::Completed);
        }

        self.summarize(bookmark, crawl, state).await
    }

    /// Summarizes fetched content and commits the outcome
    async fn summarize(
        &self,
        bookmark: &BookmarkRecord,
        crawl: CrawlResult,
        state: UrlState,
    ) -> crate::Result<UrlState> {
        let url = bookmark.url.as_str();
        let Some(summarizer) = &self.summarizer else {
            return Err(ConfigError::Validation(
                "no summarization backend is configured".to_string(),
            )
            .into());
        };

        match summarizer.summarize(bookmark, &crawl).await {
            Ok(summary) => {
                self.commit(|store| store.commit_success(bookmark, &crawl, Some(&summary)))?;
                tracing::info!("Completed {}", url);
                state.advance(url, UrlState::Completed)
            }
            Err(e) => {
                tracing::warn!("Summary failed for {}: {}", url, e);
                let failure = FailureRecord::summary(url, &e);
                self.commit(|store| store.commit_failure(bookmark, &failure, Some(&crawl)))?;
                state.advance(url, UrlState::SummaryFailed)
            }
        }
    }

    fn commit(&self, f: impl FnOnce(&mut S) -> StoreResult<()>) -> StoreResult<()> {
        lock_store(&self.store, f)
    }
}
