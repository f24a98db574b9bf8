//! The task frontier: the durable, priority-ordered set of pending crawl tasks
//!
//! The frontier owns three populations of tasks: ready (eligible to pop now),
//! delayed (waiting out a not-before timestamp from rate limiting or retry
//! backoff), and in-flight (popped by a worker, not yet settled). All three
//! count as "pending" for checkpoint purposes: an in-flight task that never
//! reached a durable append must be re-fetched after a crash.

mod queue;
mod task;

pub use queue::Frontier;
pub use task::{CrawlTask, PendingTask};
