//! Database schema definitions

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
-- One row per orchestrator run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Fetched content and summaries, keyed by URL
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    folder_path TEXT NOT NULL,
    added_at TEXT,
    page_title TEXT,
    raw_content TEXT NOT NULL,
    strategy_used TEXT NOT NULL,
    http_status INTEGER,
    content_length INTEGER NOT NULL,
    fetched_at TEXT NOT NULL,
    summary_text TEXT,
    model_used TEXT,
    input_token_estimate INTEGER,
    generated_at TEXT
);

-- Completed URLs; rows are only ever inserted
CREATE TABLE IF NOT EXISTS checkpoints (
    url TEXT PRIMARY KEY,
    completed_at TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id)
);

-- Failure ledger; rows are only ever inserted
CREATE TABLE IF NOT EXISTS failures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    error_kind TEXT NOT NULL,
    message TEXT NOT NULL,
    attempt_count INTEGER NOT NULL,
    occurred_at TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_failures_url ON failures(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
