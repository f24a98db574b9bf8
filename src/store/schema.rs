//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the engine database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Append-only record output. The UNIQUE fingerprint is the durable backstop
-- behind in-memory deduplication: a crash between dedup-mark and append can
-- at worst lose a record, never duplicate one.
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    source_url TEXT NOT NULL,
    fields TEXT NOT NULL,
    fingerprint TEXT NOT NULL UNIQUE,
    extracted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_source ON records(source_url);

-- Durable dedup marks, loaded on resume
CREATE TABLE IF NOT EXISTS dedup (
    fingerprint TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL
);

-- Frontier checkpoints: one JSON array of pending tasks per row
CREATE TABLE IF NOT EXISTS checkpoints (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    frontier TEXT NOT NULL
);

-- Terminal task failures, for the post-run report
CREATE TABLE IF NOT EXISTS failures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    attempts INTEGER NOT NULL,
    reason TEXT NOT NULL,
    failed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failures_run ON failures(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
