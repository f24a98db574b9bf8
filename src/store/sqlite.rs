//! SQLite storage implementation
//!
//! This module provides the SQLite-based implementation of the Store trait.

use crate::frontier::PendingTask;
use crate::store::schema::initialize_schema;
use crate::store::traits::{Store, StoreError, StoreResult};
use crate::store::{ExtractedRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Record Output =====

    fn append(&mut self, record: &ExtractedRecord) -> StoreResult<bool> {
        let fields = serde_json::to_string(&record.fields)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO records (task_id, source_url, fields, fingerprint, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.task_id as i64,
                record.source_url,
                fields,
                record.fingerprint,
                record.extracted_at.to_rfc3339(),
            ],
        )?;

        Ok(inserted > 0)
    }

    fn count_records(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn export_records(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT fields FROM records ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ===== Fingerprints =====

    fn mark_fingerprint(&mut self, fingerprint: &str) -> StoreResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO dedup (fingerprint, first_seen) VALUES (?1, ?2)",
            params![fingerprint, now],
        )?;
        Ok(inserted > 0)
    }

    fn load_fingerprints(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT fingerprint FROM dedup")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut fingerprints = Vec::new();
        for row in rows {
            fingerprints.push(row?);
        }
        Ok(fingerprints)
    }

    // ===== Checkpoints =====

    fn checkpoint(&mut self, pending: &[PendingTask]) -> StoreResult<i64> {
        let frontier = serde_json::to_string(pending)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO checkpoints (created_at, frontier) VALUES (?1, ?2)",
            params![now, frontier],
        )?;
        let seq = self.conn.last_insert_rowid();

        // Older checkpoints are superseded; keep the table from growing
        // without bound.
        self.conn
            .execute("DELETE FROM checkpoints WHERE seq < ?1", params![seq])?;

        Ok(seq)
    }

    fn load_latest_checkpoint(&self) -> StoreResult<Option<(i64, Vec<PendingTask>)>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT seq, frontier FROM checkpoints ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((seq, frontier)) => {
                let pending: Vec<PendingTask> = serde_json::from_str(&frontier)
                    .map_err(|e| StoreError::CheckpointCorrupt(e.to_string()))?;
                Ok(Some((seq, pending)))
            }
        }
    }

    fn clear_checkpoints(&mut self) -> StoreResult<()> {
        self.conn.execute("DELETE FROM checkpoints", [])?;
        Ok(())
    }

    // ===== Failures =====

    fn record_failure(
        &mut self,
        run_id: i64,
        url: &str,
        attempts: u32,
        reason: &str,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO failures (run_id, url, attempts, reason, failed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, url, attempts, reason, now],
        )?;
        Ok(())
    }

    fn count_failures(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM failures", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
