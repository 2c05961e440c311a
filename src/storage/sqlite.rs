//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CheckpointStore
//! trait. Every commit is a single transaction on a WAL database with
//! `synchronous = FULL`, so it is durable once the call returns.

use crate::bookmarks::BookmarkRecord;
use crate::fetcher::{CrawlResult, FetchStrategy};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StoreError, StoreResult};
use crate::storage::{DatasetEntry, FailureKind, FailureRecord, RunRecord, RunStatus};
use crate::summarizer::SummaryRecord;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// SQLite checkpoint store
///
/// Keeps an in-memory mirror of the checkpoint table for membership checks.
pub struct SqliteStore {
    conn: Connection,
    completed: HashSet<String>,
    current_run: Option<i64>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// The checkpoint set is empty until [`CheckpointStore::load`] is called.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            completed: HashSet::new(),
            current_run: None,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            completed: HashSet::new(),
            current_run: None,
        })
    }
}

/// Inserts or replaces the result row of a URL, keeping its original position
///
/// A missing summary never erases one that is already stored.
fn upsert_result(
    conn: &Connection,
    bookmark: &BookmarkRecord,
    crawl: &CrawlResult,
    summary: Option<&SummaryRecord>,
) -> StoreResult<()> {
    let folder_path = serde_json::to_string(&bookmark.folder_path)?;
    conn.execute(
        "INSERT INTO results (url, title, folder_path, added_at, page_title, raw_content,
             strategy_used, http_status, content_length, fetched_at,
             summary_text, model_used, input_token_estimate, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(url) DO UPDATE SET
             title = excluded.title,
             folder_path = excluded.folder_path,
             added_at = excluded.added_at,
             page_title = excluded.page_title,
             raw_content = excluded.raw_content,
             strategy_used = excluded.strategy_used,
             http_status = excluded.http_status,
             content_length = excluded.content_length,
             fetched_at = excluded.fetched_at,
             summary_text = COALESCE(excluded.summary_text, results.summary_text),
             model_used = COALESCE(excluded.model_used, results.model_used),
             input_token_estimate = COALESCE(excluded.input_token_estimate, results.input_token_estimate),
             generated_at = COALESCE(excluded.generated_at, results.generated_at)",
        params![
            bookmark.url,
            bookmark.title,
            folder_path,
            bookmark.added_at.map(|t| t.to_rfc3339()),
            crawl.page_title,
            crawl.raw_content,
            crawl.strategy_used.as_str(),
            crawl.http_status,
            crawl.content_length as i64,
            crawl.fetched_at.to_rfc3339(),
            summary.map(|s| s.summary_text.as_str()),
            summary.map(|s| s.model_used.as_str()),
            summary.map(|s| s.input_token_estimate),
            summary.map(|s| s.generated_at.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn conversion_error(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn time_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn optional_time_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => time_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn dataset_row(row: &Row) -> rusqlite::Result<DatasetEntry> {
    let folder_path: String = row.get(2)?;
    let strategy: String = row.get(6)?;
    let content_length: i64 = row.get(8)?;

    Ok(DatasetEntry {
        url: row.get(0)?,
        title: row.get(1)?,
        folder_path: serde_json::from_str(&folder_path).map_err(|e| conversion_error(2, e))?,
        added_at: optional_time_column(row, 3)?,
        page_title: row.get(4)?,
        content: row.get(5)?,
        crawl_method: FetchStrategy::from_db_string(&strategy)
            .ok_or_else(|| conversion_error(6, format!("unknown strategy '{}'", strategy)))?,
        http_status: row.get(7)?,
        content_length: content_length.max(0) as usize,
        crawl_time: time_column(row, 9)?,
        summary: row.get(10)?,
        summary_model: row.get(11)?,
        input_token_estimate: row.get(12)?,
        summary_time: optional_time_column(row, 13)?,
    })
}

fn run_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

impl CheckpointStore for SqliteStore {
    // ===== Checkpoints =====

    fn load(&mut self) -> StoreResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM checkpoints")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        drop(stmt);

        tracing::debug!("Loaded {} checkpoints", urls.len());
        self.completed = urls.clone();
        Ok(urls)
    }

    fn is_completed(&self, url: &str) -> bool {
        self.completed.contains(url)
    }

    fn completed_count(&self) -> usize {
        self.completed.len()
    }

    fn failed_urls(&self) -> StoreResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT f.url FROM failures f
             LEFT JOIN checkpoints c ON c.url = f.url
             WHERE c.url IS NULL",
        )?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    // ===== Commits =====

    fn commit_success(
        &mut self,
        bookmark: &BookmarkRecord,
        crawl: &CrawlResult,
        summary: Option<&SummaryRecord>,
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        upsert_result(&tx, bookmark, crawl, summary)?;
        tx.execute(
            "INSERT OR IGNORE INTO checkpoints (url, completed_at, run_id) VALUES (?1, ?2, ?3)",
            params![bookmark.url, Utc::now().to_rfc3339(), self.current_run],
        )?;
        tx.commit()?;

        self.completed.insert(bookmark.url.clone());
        Ok(())
    }

    fn commit_failure(
        &mut self,
        bookmark: &BookmarkRecord,
        failure: &FailureRecord,
        fetched: Option<&CrawlResult>,
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        if let Some(crawl) = fetched {
            upsert_result(&tx, bookmark, crawl, None)?;
        }
        tx.execute(
            "INSERT INTO failures (url, error_kind, message, attempt_count, occurred_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                failure.url,
                failure.error_kind.to_db_string(),
                failure.message,
                failure.attempt_count,
                failure.occurred_at.to_rfc3339(),
                self.current_run
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ===== Run Management =====

    fn begin_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        self.current_run = Some(run_id);
        Ok(run_id)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        if self.current_run == Some(run_id) {
            self.current_run = None;
        }
        Ok(())
    }

    fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Exports =====

    fn dataset(&self) -> StoreResult<Vec<DatasetEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, folder_path, added_at, page_title, raw_content, strategy_used,
             http_status, content_length, fetched_at, summary_text, model_used,
             input_token_estimate, generated_at
             FROM results ORDER BY id",
        )?;
        let entries = stmt
            .query_map([], dataset_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn failures(&self) -> StoreResult<Vec<FailureRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, error_kind, message, attempt_count, occurred_at FROM failures ORDER BY id",
        )?;
        let failures = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                Ok(FailureRecord {
                    url: row.get(0)?,
                    error_kind: FailureKind::from_db_string(&kind)
                        .ok_or_else(|| conversion_error(1, format!("unknown kind '{}'", kind)))?,
                    message: row.get(2)?,
                    attempt_count: row.get(3)?,
                    occurred_at: time_column(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(failures)
    }

    // ===== Statistics =====

    fn count_results(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_summarized(&self) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE summary_text IS NOT NULL AND summary_text != ''",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_strategy(&self) -> StoreResult<HashMap<FetchStrategy, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT strategy_used, COUNT(*) FROM results GROUP BY strategy_used")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(s, n)| FetchStrategy::from_db_string(&s).map(|k| (k, n as u64)))
            .collect())
    }

    fn content_length_range(&self) -> StoreResult<Option<(u64, u64, f64)>> {
        let (min, max, avg): (Option<i64>, Option<i64>, Option<f64>) = self.conn.query_row(
            "SELECT MIN(content_length), MAX(content_length), AVG(content_length) FROM results",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(match (min, max, avg) {
            (Some(min), Some(max), Some(avg)) => Some((min as u64, max as u64, avg)),
            _ => None,
        })
    }

    fn count_failures_by_kind(&self) -> StoreResult<HashMap<FailureKind, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT error_kind, COUNT(*) FROM failures GROUP BY error_kind")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(s, n)| FailureKind::from_db_string(&s).map(|k| (k, n as u64)))
            .collect())
    }
}
