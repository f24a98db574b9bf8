use serde::{Deserialize, Serialize};
use std::time::Instant;
use url::Url;

/// A unit of crawl work: one target URL and the state needed to schedule it
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Frontier-assigned id, unique within a run
    pub id: u64,

    /// Normalized target URL
    pub url: Url,

    /// Link distance from the seed that led here (seeds are depth 0)
    pub depth: u32,

    /// Explicit priority; higher values are popped first
    pub priority: i32,

    /// Enqueue order, used as the FIFO tie-breaker within a priority class
    pub seq: u64,

    /// Number of fetch attempts actually performed. Rate-limit deferrals do
    /// not count as attempts.
    pub attempts: u32,

    /// Earliest time this task may be popped again; None means ready now
    pub not_before: Option<Instant>,

    /// Id of the task whose extraction discovered this URL
    pub parent: Option<u64>,
}

impl CrawlTask {
    /// Lowercased host of the target, the rate-limiting key
    pub fn host(&self) -> Option<String> {
        crate::url::host_of(&self.url)
    }
}

/// Serializable form of a pending task, as stored in checkpoints.
///
/// `delay_ms` preserves how much not-before delay remained at snapshot time;
/// on resume all delays collapse to "ready now", which can only make a retry
/// earlier, never lose it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    pub url: String,
    pub depth: u32,
    pub priority: i32,
    pub attempts: u32,
    pub parent: Option<u64>,
    #[serde(default)]
    pub delay_ms: u64,
}

impl PendingTask {
    pub fn from_task(task: &CrawlTask, now: Instant) -> Self {
        let delay_ms = task
            .not_before
            .map(|nb| nb.saturating_duration_since(now).as_millis() as u64)
            .unwrap_or(0);

        Self {
            url: task.url.to_string(),
            depth: task.depth,
            priority: task.priority,
            attempts: task.attempts,
            parent: task.parent,
            delay_ms,
        }
    }
}
