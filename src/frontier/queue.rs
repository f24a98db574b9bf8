use crate::frontier::task::{CrawlTask, PendingTask};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// Heap entry for ready tasks.
///
/// Ordering: priority descending, then depth ascending (breadth-first bias),
/// then enqueue sequence ascending (FIFO within a priority class).
#[derive(Debug)]
struct ReadyEntry(CrawlTask);

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority
            .cmp(&other.0.priority)
            .then_with(|| other.0.depth.cmp(&self.0.depth))
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReadyEntry {}

/// Heap entry for delayed tasks, ordered by earliest deadline first
#[derive(Debug)]
struct DelayedEntry(CrawlTask, Instant);

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .1
            .cmp(&self.1)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DelayedEntry {}

#[derive(Debug, Default)]
struct Inner {
    ready: BinaryHeap<ReadyEntry>,
    delayed: BinaryHeap<DelayedEntry>,
    /// Tasks popped by a worker and not yet settled, keyed by task id.
    /// Kept here so snapshots cover them and quiescence detection is exact.
    in_flight: HashMap<u64, CrawlTask>,
    /// Normalized URL -> task id for every task that is ready, delayed or in
    /// flight. Enforces at most one active task per URL.
    active: HashMap<String, u64>,
    next_id: u64,
    next_seq: u64,
}

/// Priority-ordered, politeness-aware queue of pending crawl tasks.
///
/// Internally synchronized: workers share a `Frontier` behind an `Arc` and
/// every operation takes a single short-lived lock. The in-flight set is
/// maintained under the same lock as the queues, so the orchestrator's
/// quiescence check cannot race a pop.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<Inner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new task for `url`, unless an active task for the same
    /// normalized URL already exists (first-writer-wins, the later push is a
    /// no-op). Returns the new task id when admitted.
    pub fn push(&self, url: Url, depth: u32, priority: i32, parent: Option<u64>) -> Option<u64> {
        let mut inner = self.inner.lock().unwrap();
        let key = url.to_string();
        if inner.active.contains_key(&key) {
            return None;
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.active.insert(key, id);
        inner.ready.push(ReadyEntry(CrawlTask {
            id,
            url,
            depth,
            priority,
            seq,
            attempts: 0,
            not_before: None,
            parent,
        }));
        Some(id)
    }

    /// Re-admits a previously persisted pending task, preserving its attempt
    /// count. Used when restoring a checkpoint.
    pub fn restore(&self, pending: PendingTask, url: Url) {
        let mut inner = self.inner.lock().unwrap();
        let key = url.to_string();
        if inner.active.contains_key(&key) {
            return;
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.active.insert(key, id);
        inner.ready.push(ReadyEntry(CrawlTask {
            id,
            url,
            depth: pending.depth,
            priority: pending.priority,
            seq,
            attempts: pending.attempts,
            not_before: None,
            parent: pending.parent,
        }));
    }

    /// Returns the highest-priority ready task, or None when nothing is
    /// eligible right now. Delayed tasks whose deadline has passed are
    /// promoted first. The returned task is tracked as in-flight until the
    /// caller settles it via `complete`, `fail` or `reschedule`.
    pub fn pop(&self) -> Option<CrawlTask> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        // Promote delayed tasks whose not-before has elapsed.
        while let Some(entry) = inner.delayed.peek() {
            if entry.1 > now {
                break;
            }
            let DelayedEntry(mut task, _) = inner.delayed.pop().unwrap();
            task.not_before = None;
            inner.ready.push(ReadyEntry(task));
        }

        let ReadyEntry(task) = inner.ready.pop()?;
        inner.in_flight.insert(task.id, task.clone());
        Some(task)
    }

    /// Returns an in-flight task to the queue with a fresh not-before
    /// deadline. The task stays active (its URL remains claimed).
    pub fn reschedule(&self, mut task: CrawlTask, delay: Duration) {
        let deadline = Instant::now() + delay;
        task.not_before = Some(deadline);

        let mut inner = self.inner.lock().unwrap();
        inner.in_flight.remove(&task.id);
        inner.delayed.push(DelayedEntry(task, deadline));
    }

    /// Settles an in-flight task as terminally done (succeeded) and releases
    /// its URL claim.
    pub fn complete(&self, task: &CrawlTask) {
        self.settle(task);
    }

    /// Settles an in-flight task as terminally failed and releases its URL
    /// claim.
    pub fn fail(&self, task: &CrawlTask) {
        self.settle(task);
    }

    fn settle(&self, task: &CrawlTask) {
        let mut inner = self.inner.lock().unwrap();
        inner.in_flight.remove(&task.id);
        inner.active.remove(&task.url.to_string());
    }

    /// True when tasks exist whose not-before deadline has not elapsed yet.
    /// Distinguishes "temporarily drained" from "permanently empty".
    pub fn has_pending_with_future_deadline(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.delayed.is_empty()
    }

    /// True when no task is ready, delayed or in flight: the crawl is over
    pub fn is_quiescent(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.ready.is_empty() && inner.delayed.is_empty() && inner.in_flight.is_empty()
    }

    /// Number of tasks currently popped but not settled
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().unwrap().in_flight.len()
    }

    /// Number of tasks waiting in the queue (ready + delayed)
    pub fn queued_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.ready.len() + inner.delayed.len()
    }

    /// Serializable snapshot of every pending task: ready, delayed and in
    /// flight. In-flight tasks are included because a crash before their
    /// append must lead to a re-fetch on resume.
    pub fn snapshot(&self) -> Vec<PendingTask> {
        let now = Instant::now();
        let inner = self.inner.lock().unwrap();

        let mut pending: Vec<PendingTask> = inner
            .ready
            .iter()
            .map(|e| PendingTask::from_task(&e.0, now))
            .chain(inner.delayed.iter().map(|e| PendingTask::from_task(&e.0, now)))
            .chain(
                inner
                    .in_flight
                    .values()
                    .map(|t| PendingTask::from_task(t, now)),
            )
            .collect();

        // Stable output ordering keeps checkpoints comparable in tests.
        pending.sort_by(|a, b| a.url.cmp(&b.url));
        pending
    }
}
