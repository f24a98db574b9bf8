//! Durable storage for crawl output and engine state
//!
//! This module handles all database operations for the engine, including:
//! - SQLite database initialization and schema management
//! - Append-only record output with a fingerprint uniqueness backstop
//! - Durable fingerprint marks for deduplication
//! - Frontier checkpoints for crash/resume
//! - Failure reporting and run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{Store, StoreError, StoreResult};

use crate::extract::RecordFields;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::new(path)
}

/// A record as handed to the store for appending
#[derive(Debug, Clone)]
pub struct ExtractedRecord {
    /// Frontier id of the task that produced this record
    pub task_id: u64,
    /// Normalized URL of the page it came from
    pub source_url: String,
    /// Extracted field mapping
    pub fields: RecordFields,
    /// Dedup fingerprint; unique across the whole output
    pub fingerprint: String,
    pub extracted_at: DateTime<Utc>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
        ] {
            let parsed = RunStatus::from_db_string(status.to_db_string());
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("bogus"), None);
    }
}
