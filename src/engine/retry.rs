//! Fetch outcome classification and retry backoff
//!
//! Every fetch resolves to one of three classes. `Transient` outcomes
//! (timeouts, connection failures, throttling, server errors) re-enter the
//! frontier with an exponentially growing, jittered delay until the attempt
//! ceiling; `Permanent` outcomes (client-side rejections) fail the task
//! immediately.

use rand::Rng;
use std::time::Duration;

/// Classification of a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    /// 2xx: the task proceeds to extraction
    Success,
    /// Worth retrying: timeout, connection failure, 408/429, 5xx
    Transient,
    /// Never retried: other 4xx, malformed target, redirect loop
    Permanent,
}

/// Classifies an HTTP status code
pub fn classify_status(status: u16) -> OutcomeClass {
    match status {
        200..=299 => OutcomeClass::Success,
        408 | 429 => OutcomeClass::Transient,
        500..=599 => OutcomeClass::Transient,
        _ => OutcomeClass::Permanent,
    }
}

/// Classifies a transport-level error from the HTTP client
pub fn classify_error(error: &reqwest::Error) -> OutcomeClass {
    if error.is_timeout() || error.is_connect() {
        OutcomeClass::Transient
    } else if error.is_redirect() || error.is_builder() {
        // Redirect loops and unbuildable requests will not improve on retry.
        OutcomeClass::Permanent
    } else {
        // Remaining cases are transport-level (reset connections, truncated
        // bodies) and get the retry budget.
        OutcomeClass::Transient
    }
}

/// Exponential backoff with jitter, capped at a configured ceiling
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
    jitter_percent: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u32) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Delay before the retry following attempt number `attempt` (1-based:
    /// attempt 1 is the first fetch). Grows as base * 2^(attempt-1), capped,
    /// plus up to `jitter_percent` of the capped value.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let raw_ms = (self.base.as_millis() as u64).saturating_mul(1u64 << exponent);
        let capped_ms = raw_ms.min(self.cap.as_millis() as u64);

        let jitter_ms = if self.jitter_percent > 0 {
            let span = capped_ms * self.jitter_percent as u64 / 100;
            rand::thread_rng().gen_range(0..=span)
        } else {
            0
        };

        Duration::from_millis(capped_ms + jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_table() {
        assert_eq!(classify_status(200), OutcomeClass::Success);
        assert_eq!(classify_status(204), OutcomeClass::Success);
        assert_eq!(classify_status(408), OutcomeClass::Transient);
        assert_eq!(classify_status(429), OutcomeClass::Transient);
        assert_eq!(classify_status(500), OutcomeClass::Transient);
        assert_eq!(classify_status(503), OutcomeClass::Transient);
        assert_eq!(classify_status(404), OutcomeClass::Permanent);
        assert_eq!(classify_status(403), OutcomeClass::Permanent);
        assert_eq!(classify_status(400), OutcomeClass::Permanent);
        assert_eq!(classify_status(301), OutcomeClass::Permanent);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(60))
                .with_jitter(0);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped() {
        let backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500))
                .with_jitter(0);
        assert_eq!(backoff.delay(10), Duration::from_millis(500));
        assert_eq!(backoff.delay(30), Duration::from_millis(500));
    }

    #[test]
    fn jittered_delays_grow_strictly_below_cap() {
        // With 10% jitter, 2^n growth dominates: delay(n+1) > delay(n)
        // whenever the cap has not been reached.
        let backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(3600));
        for attempt in 1..10 {
            let shorter = backoff.delay(attempt);
            let longer = backoff.delay(attempt + 1);
            assert!(
                longer > shorter,
                "attempt {}: {:?} !> {:?}",
                attempt,
                longer,
                shorter
            );
        }
    }

    #[test]
    fn jitter_stays_within_percent_of_cap() {
        let backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(60))
                .with_jitter(10);
        for _ in 0..50 {
            let d = backoff.delay(1);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(110));
        }
    }

    #[test]
    fn large_attempt_does_not_overflow() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60))
            .with_jitter(0);
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(60));
    }
}
