//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::frontier::PendingTask;
use crate::store::{ExtractedRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt checkpoint: {0}")]
    CheckpointCorrupt(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for storage backend implementations
///
/// This trait covers every durable operation the engine needs: run
/// bookkeeping, the append-only record output, fingerprint marks,
/// checkpoints and failure reports.
pub trait Store {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()>;

    // ===== Record Output =====

    /// Appends one record to the output.
    ///
    /// Returns `true` when the record was written, `false` when a record with
    /// the same fingerprint already exists (the uniqueness backstop fired).
    fn append(&mut self, record: &ExtractedRecord) -> StoreResult<bool>;

    /// Total number of records appended across all runs
    fn count_records(&self) -> StoreResult<u64>;

    /// Returns every record's field mapping as one JSON object per record,
    /// in append order. Used by the export command.
    fn export_records(&self) -> StoreResult<Vec<String>>;

    // ===== Fingerprints =====

    /// Durably marks a fingerprint as seen.
    ///
    /// Returns `true` when the fingerprint was new, `false` when it was
    /// already marked.
    fn mark_fingerprint(&mut self, fingerprint: &str) -> StoreResult<bool>;

    /// Loads every marked fingerprint, for seeding the in-memory dedup set
    /// on resume
    fn load_fingerprints(&self) -> StoreResult<Vec<String>>;

    // ===== Checkpoints =====

    /// Writes a checkpoint of the pending frontier and returns its sequence
    /// number
    fn checkpoint(&mut self, pending: &[PendingTask]) -> StoreResult<i64>;

    /// Loads the most recent checkpoint, if any, as (sequence, tasks)
    fn load_latest_checkpoint(&self) -> StoreResult<Option<(i64, Vec<PendingTask>)>>;

    /// Drops all stored checkpoints. Used when starting fresh.
    fn clear_checkpoints(&mut self) -> StoreResult<()>;

    // ===== Failures =====

    /// Records a task that failed terminally
    fn record_failure(
        &mut self,
        run_id: i64,
        url: &str,
        attempts: u32,
        reason: &str,
    ) -> StoreResult<()>;

    /// Number of terminal failures recorded across all runs
    fn count_failures(&self) -> StoreResult<u64>;
}
