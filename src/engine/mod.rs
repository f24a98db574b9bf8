//! The crawl engine: orchestrator, worker pipeline, rate limiting and retry
//!
//! The orchestrator owns a fixed pool of workers. Each worker repeatedly pops
//! a task from the frontier and drives it through the pipeline: rate-limit
//! permit, fetch, outcome classification, extraction, dedup, durable append,
//! and discovery of follow-up tasks.

mod fetcher;
mod limiter;
mod orchestrator;
mod pipeline;
mod retry;

pub use fetcher::{build_http_client, fetch, FetchOutcome};
pub use limiter::{Acquisition, RateLimiter};
pub use orchestrator::{Orchestrator, ShutdownSignal};
pub use pipeline::{PipelineContext, TaskOutcome};
pub use retry::{classify_error, classify_status, ExponentialBackoff, OutcomeClass};

use std::sync::atomic::{AtomicU64, Ordering};

/// Run counters shared across workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub retried: AtomicU64,
    pub deferred: AtomicU64,
    pub records_appended: AtomicU64,
    pub records_deduped: AtomicU64,
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub deferred: u64,
    pub records_appended: u64,
    pub records_deduped: u64,
}

impl CrawlStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            records_deduped: self.records_deduped.load(Ordering::Relaxed),
        }
    }
}
