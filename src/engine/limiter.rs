//! Per-host token-bucket rate limiter
//!
//! Every host gets an independent bucket with the configured refill rate and
//! burst capacity. Acquisition either grants immediately or returns the exact
//! duration until a token will be available; callers reschedule the task for
//! that time instead of polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Result of a rate-limit acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acquisition {
    /// A token was consumed; the caller may fetch now
    Granted,
    /// No token available; retry no earlier than this duration from now
    RetryAfter(Duration),
}

impl Acquisition {
    pub fn is_granted(&self) -> bool {
        matches!(self, Acquisition::Granted)
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
        }
    }

    fn refill(&mut self, rate: f64, burst: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(burst);
        self.last_refill = now;
    }

    fn try_consume(&mut self, rate: f64) -> Acquisition {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Acquisition::Granted
        } else {
            let deficit = 1.0 - self.tokens;
            Acquisition::RetryAfter(Duration::from_secs_f64(deficit / rate))
        }
    }
}

/// Token-bucket admission control, one bucket per host.
///
/// The outer map lock is held only to look up or insert a bucket handle;
/// bucket state itself sits behind a per-host lock, so acquisitions for
/// different hosts do not contend.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    buckets: Mutex<HashMap<String, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    /// Creates a limiter granting `rate` tokens per second per host with a
    /// bucket capacity of `burst`
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            rate,
            burst,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to consume one token for `host`. Unknown hosts start with a
    /// full (burst-sized) bucket.
    pub fn acquire(&self, host: &str) -> Acquisition {
        self.acquire_at(host, Instant::now())
    }

    /// Clock-injected variant of `acquire`, used by tests
    pub fn acquire_at(&self, host: &str, now: Instant) -> Acquisition {
        let bucket = {
            let mut buckets = self.buckets.lock().unwrap();
            Arc::clone(
                buckets
                    .entry(host.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(self.burst, now)))),
            )
        };

        let mut bucket = bucket.lock().unwrap();
        bucket.refill(self.rate, self.burst, now);
        bucket.try_consume(self.rate)
    }

    /// Number of hosts with a bucket
    pub fn tracked_hosts(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }
}
