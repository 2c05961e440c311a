//! End-to-end runs of the orchestrator over an on-disk checkpoint store

use crate::common::{bookmarks, crawler_config, summarizer, ScriptedBackend, ScriptedFetcher};
use bookmark_harvest::crawler::{Orchestrator, RunOptions};
use bookmark_harvest::fetcher::{CrawlResult, FetchStrategy};
use bookmark_harvest::storage::{
    CheckpointStore, DatasetEntry, FailureKind, FailureRecord, RunRecord, RunStatus, SqliteStore,
    StoreError, StoreResult,
};
use bookmark_harvest::summarizer::SummaryRecord;
use bookmark_harvest::{BookmarkRecord, HarvestError, Summarizer};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn orchestrator(
    db: &Path,
    fetcher: &Arc<ScriptedFetcher>,
    summarizer: Option<Summarizer>,
) -> Orchestrator<SqliteStore> {
    let store = SqliteStore::open(db).unwrap();
    Orchestrator::new(
        store,
        Arc::clone(fetcher) as Arc<dyn bookmark_harvest::fetcher::ContentFetcher>,
        summarizer.map(Arc::new),
        &crawler_config(),
    )
}

fn options(workers: usize, generate_summary: bool) -> RunOptions {
    RunOptions {
        workers,
        generate_summary,
        retry_failed: false,
    }
}

fn checkpointed(orch: &Orchestrator<SqliteStore>) -> HashSet<String> {
    let store = orch.store();
    let mut store = store.lock().unwrap();
    store.load().unwrap()
}

#[tokio::test]
async fn test_interrupted_run_resumes_exactly_once() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let candidates = bookmarks(10);
    let fetcher = Arc::new(ScriptedFetcher::new());

    // First run: drained after the third fetch
    let first = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));
    fetcher.drain_after(3, first.drain_signal());
    let summary = first.run(candidates.clone(), options(1, true)).await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.remaining, 7);
    assert!(summary.interrupted);
    let after_first = checkpointed(&first);
    assert_eq!(after_first.len(), 3);
    {
        let store = first.store();
        let store = store.lock().unwrap();
        assert_eq!(
            store.latest_run().unwrap().unwrap().status,
            RunStatus::Interrupted
        );
    }
    drop(first);

    // Second run over the same database picks up the other seven
    let fetcher_resumed = Arc::new(ScriptedFetcher::new());
    let second = orchestrator(
        &db,
        &fetcher_resumed,
        Some(summarizer(ScriptedBackend::new())),
    );
    let summary = second.run(candidates.clone(), options(3, true)).await.unwrap();

    assert_eq!(summary.completed, 7);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.remaining, 0);
    assert!(!summary.interrupted);

    for bookmark in &candidates {
        let total = fetcher.calls_for(&bookmark.url) + fetcher_resumed.calls_for(&bookmark.url);
        assert_eq!(total, 1, "{} fetched {} times", bookmark.url, total);
    }

    let after_second = checkpointed(&second);
    assert!(after_first.is_subset(&after_second));
    assert_eq!(after_second.len(), 10);

    let store = second.store();
    let store = store.lock().unwrap();
    assert_eq!(store.count_results().unwrap(), 10);
    assert_eq!(store.count_summarized().unwrap(), 10);
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let mut candidates = bookmarks(4);
    candidates.insert(1, BookmarkRecord::new("https://fail.test/", "Gone"));
    candidates.insert(3, BookmarkRecord::new("https://reject.test/", "Refused"));

    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));
    let summary = orch.run(candidates, options(2, true)).await.unwrap();

    assert_eq!(summary.completed, 4);
    assert_eq!(summary.failed, 2);

    let store = orch.store();
    let store = store.lock().unwrap();
    let failures = store.failures().unwrap();
    assert_eq!(failures.len(), 2);

    let fetch_failure = failures
        .iter()
        .find(|f| f.url == "https://fail.test/")
        .unwrap();
    assert_eq!(fetch_failure.error_kind, FailureKind::FetchError);
    assert!(fetch_failure.message.contains("404"));

    let summary_failure = failures
        .iter()
        .find(|f| f.url == "https://reject.test/")
        .unwrap();
    assert_eq!(summary_failure.error_kind, FailureKind::SummaryError);
    // Rejections are not retried
    assert_eq!(summary_failure.attempt_count, 1);

    // The rejected page's content is kept, but it is not checkpointed
    assert!(!store.is_completed("https://reject.test/"));
    let dataset = store.dataset().unwrap();
    let rejected = dataset
        .iter()
        .find(|e| e.url == "https://reject.test/")
        .unwrap();
    assert!(!rejected.content.is_empty());
    assert!(!rejected.has_summary());
    assert!(dataset.iter().all(|e| e.url != "https://fail.test/"));

    let unresolved = store.failed_urls().unwrap();
    assert_eq!(unresolved.len(), 2);
}

#[tokio::test]
async fn test_worker_bound_is_respected() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(20)));
    let orch = orchestrator(&db, &fetcher, None);

    let summary = orch.run(bookmarks(30), options(4, false)).await.unwrap();

    assert_eq!(summary.completed, 30);
    assert!(fetcher.max_in_flight() <= 4, "max {}", fetcher.max_in_flight());
    assert!(fetcher.max_in_flight() >= 2, "pool never ran in parallel");
}

#[tokio::test]
async fn test_worker_count_is_clamped_to_max_workers() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(20)));
    let orch = orchestrator(&db, &fetcher, None);

    orch.run(bookmarks(40), options(500, false)).await.unwrap();

    assert!(fetcher.max_in_flight() <= crawler_config().max_workers);
}

#[tokio::test]
async fn test_transient_summary_failures_are_retried() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(
        &db,
        &fetcher,
        Some(summarizer(ScriptedBackend::failing_first(2))),
    );

    let summary = orch.run(bookmarks(1), options(1, true)).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    let store = orch.store();
    let store = store.lock().unwrap();
    let entry = &store.dataset().unwrap()[0];
    assert!(entry.has_summary());
    assert_eq!(entry.summary_model.as_deref(), Some("mock-model"));
    assert!(store.failures().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_summary_run_persists_content_only() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));

    let summary = orch.run(bookmarks(5), options(2, false)).await.unwrap();

    assert_eq!(summary.completed, 5);
    let store = orch.store();
    let store = store.lock().unwrap();
    assert_eq!(store.completed_count(), 5);
    assert_eq!(store.count_results().unwrap(), 5);
    assert_eq!(store.count_summarized().unwrap(), 0);
}

#[tokio::test]
async fn test_summarize_existing_fills_missing_summaries() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));
    orch.run(bookmarks(3), options(2, false)).await.unwrap();

    let entries = {
        let store = orch.store();
        let store = store.lock().unwrap();
        store.dataset().unwrap()
    };
    let summary = orch.summarize_existing(entries, 2).await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(fetcher.total_calls(), 3, "content must not be fetched again");

    let store = orch.store();
    let store = store.lock().unwrap();
    let dataset = store.dataset().unwrap();
    assert_eq!(dataset.len(), 3);
    assert!(dataset.iter().all(|e| e.has_summary()));
    // First-commit order survives the summary upsert
    let urls: Vec<_> = dataset.iter().map(|e| e.url.clone()).collect();
    let expected: Vec<_> = bookmarks(3).into_iter().map(|b| b.url).collect();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_retry_pass_revisits_failed_urls() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let candidates = vec![
        BookmarkRecord::new("https://ok.test/", "Ok"),
        BookmarkRecord::new("https://reject.test/", "Refused"),
    ];

    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));
    orch.run(candidates.clone(), options(1, true)).await.unwrap();

    // A plain resume leaves the failed URL alone
    let resumed = orch.run(candidates.clone(), options(1, true)).await.unwrap();
    assert_eq!(resumed.skipped, 2);
    assert_eq!(fetcher.calls_for("https://reject.test/"), 1);

    // An explicit retry pass fetches it again and keeps a single result row
    let retried = orch
        .run(
            candidates,
            RunOptions {
                retry_failed: true,
                ..options(1, true)
            },
        )
        .await
        .unwrap();
    assert_eq!(retried.skipped, 1);
    assert_eq!(retried.failed, 1);
    assert_eq!(fetcher.calls_for("https://reject.test/"), 2);

    let store = orch.store();
    let store = store.lock().unwrap();
    assert_eq!(store.count_results().unwrap(), 2);
    assert_eq!(store.failures().unwrap().len(), 2);
}

#[tokio::test]
async fn test_limit_bounds_the_candidate_list() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, None);

    let candidates = bookmark_harvest::bookmarks::apply_limit(bookmarks(10), 4);
    let summary = orch.run(candidates, options(2, false)).await.unwrap();

    assert_eq!(summary.completed, 4);
    assert_eq!(fetcher.total_calls(), 4);
    assert_eq!(fetcher.calls_for("https://site4.test/"), 0);
}

#[tokio::test]
async fn test_summarize_stored_honours_limit_and_database_state() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orch = orchestrator(&db, &fetcher, Some(summarizer(ScriptedBackend::new())));
    orch.run(bookmarks(5), options(2, false)).await.unwrap();

    let limited = orch.summarize_stored(2, 2).await.unwrap();
    assert_eq!(limited.completed, 2);
    {
        let store = orch.store();
        let store = store.lock().unwrap();
        let summarized: Vec<bool> = store
            .dataset()
            .unwrap()
            .iter()
            .map(DatasetEntry::has_summary)
            .collect();
        assert_eq!(summarized, vec![true, true, false, false, false]);
    }

    // Entries summarized above are not sent to the backend again
    let rest = orch.summarize_stored(0, 2).await.unwrap();
    assert_eq!(rest.completed, 3);
    assert_eq!(rest.skipped, 2);
    assert_eq!(fetcher.total_calls(), 5);

    let store = orch.store();
    let store = store.lock().unwrap();
    assert_eq!(store.count_summarized().unwrap(), 5);
}

/// SQLite store whose successful commits start failing after `budget` of them
struct DiskFullStore {
    inner: SqliteStore,
    budget: usize,
}

impl CheckpointStore for DiskFullStore {
    fn load(&mut self) -> StoreResult<HashSet<String>> {
        self.inner.load()
    }

    fn is_completed(&self, url: &str) -> bool {
        self.inner.is_completed(url)
    }

    fn completed_count(&self) -> usize {
        self.inner.completed_count()
    }

    fn failed_urls(&self) -> StoreResult<HashSet<String>> {
        self.inner.failed_urls()
    }

    fn commit_success(
        &mut self,
        bookmark: &BookmarkRecord,
        crawl: &CrawlResult,
        summary: Option<&SummaryRecord>,
    ) -> StoreResult<()> {
        if self.budget == 0 {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.budget -= 1;
        self.inner.commit_success(bookmark, crawl, summary)
    }

    fn commit_failure(
        &mut self,
        bookmark: &BookmarkRecord,
        failure: &FailureRecord,
        fetched: Option<&CrawlResult>,
    ) -> StoreResult<()> {
        self.inner.commit_failure(bookmark, failure, fetched)
    }

    fn begin_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        self.inner.begin_run(config_hash)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        self.inner.finish_run(run_id, status)
    }

    fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        self.inner.latest_run()
    }

    fn dataset(&self) -> StoreResult<Vec<DatasetEntry>> {
        self.inner.dataset()
    }

    fn failures(&self) -> StoreResult<Vec<FailureRecord>> {
        self.inner.failures()
    }

    fn count_results(&self) -> StoreResult<u64> {
        self.inner.count_results()
    }

    fn count_summarized(&self) -> StoreResult<u64> {
        self.inner.count_summarized()
    }

    fn count_by_strategy(&self) -> StoreResult<HashMap<FetchStrategy, u64>> {
        self.inner.count_by_strategy()
    }

    fn content_length_range(&self) -> StoreResult<Option<(u64, u64, f64)>> {
        self.inner.content_length_range()
    }

    fn count_failures_by_kind(&self) -> StoreResult<HashMap<FailureKind, u64>> {
        self.inner.count_failures_by_kind()
    }
}

#[tokio::test]
async fn test_store_error_drains_pool_and_fails_run() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("harvest.db");
    let fetcher = Arc::new(ScriptedFetcher::new());
    let store = DiskFullStore {
        inner: SqliteStore::open(&db).unwrap(),
        budget: 2,
    };
    let orch = Orchestrator::new(
        store,
        Arc::clone(&fetcher) as Arc<dyn bookmark_harvest::fetcher::ContentFetcher>,
        None,
        &crawler_config(),
    );

    let err = orch.run(bookmarks(20), options(1, false)).await.unwrap_err();

    assert!(matches!(err, HarvestError::Store(StoreError::Io(_))), "{}", err);
    assert!(err.to_string().contains("disk full"), "{}", err);
    assert_eq!(fetcher.total_calls(), 3);
    {
        let store = orch.store();
        let store = store.lock().unwrap();
        assert_eq!(
            store.latest_run().unwrap().unwrap().status,
            RunStatus::Failed
        );
    }
    drop(orch);

    let mut reopened = SqliteStore::open(&db).unwrap();
    assert_eq!(reopened.load().unwrap().len(), 2);
}
