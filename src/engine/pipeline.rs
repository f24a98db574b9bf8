//! Per-task pipeline: permit, fetch, classify, extract, dedup, append, discover
//!
//! `run_task` drives exactly one popped task to a settled state. Every path
//! out of here leaves the frontier consistent: the task is either completed,
//! terminally failed, or rescheduled with a deadline. A storage error is the
//! one case that propagates; the task is put back first so a checkpoint taken
//! afterwards still covers it.

use crate::config::{Config, FingerprintPolicy};
use crate::dedup::{fingerprint_fields, fingerprint_url, DedupDecision, Deduplicator};
use crate::engine::fetcher::fetch;
use crate::engine::limiter::{Acquisition, RateLimiter};
use crate::engine::retry::{ExponentialBackoff, OutcomeClass};
use crate::engine::CrawlStats;
use crate::extract::Extractor;
use crate::frontier::{CrawlTask, Frontier};
use crate::store::{ExtractedRecord, SqliteStore, Store};
use crate::url::{normalize_url, ScopeFilter};
use chrono::Utc;
use reqwest::Client;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a worker needs to run tasks, shared across the pool
pub struct PipelineContext {
    pub config: Arc<Config>,
    pub client: Client,
    pub frontier: Arc<Frontier>,
    pub limiter: Arc<RateLimiter>,
    pub dedup: Arc<Deduplicator>,
    pub store: Arc<Mutex<SqliteStore>>,
    pub extractor: Arc<dyn Extractor>,
    pub scope: ScopeFilter,
    pub backoff: ExponentialBackoff,
    pub stats: Arc<CrawlStats>,
    pub run_id: i64,
}

/// How one invocation of the pipeline settled its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Fetched and processed; the task is done
    Completed,
    /// No rate-limit token; rescheduled without consuming an attempt
    Deferred,
    /// Transient failure; rescheduled with backoff
    Retried,
    /// Terminally failed and recorded
    Failed,
}

/// Drives one task through the pipeline.
///
/// Only storage failures return `Err`; every fetch- or extraction-level
/// problem is absorbed into the returned outcome.
pub async fn run_task(ctx: &PipelineContext, mut task: CrawlTask) -> crate::Result<TaskOutcome> {
    let host = match task.host() {
        Some(host) => host,
        // Normalization guarantees a host, so this is unreachable for tasks
        // that came through push; treat it as permanent if it ever happens.
        None => {
            return fail_task(ctx, &task, "URL has no host");
        }
    };

    // Politeness gate. A denial is not an attempt: the task goes back to the
    // delayed queue for exactly as long as the bucket needs.
    if let Acquisition::RetryAfter(wait) = ctx.limiter.acquire(&host) {
        debug!(url = %task.url, wait_ms = wait.as_millis() as u64, "rate limited, deferring");
        ctx.frontier.reschedule(task, wait);
        ctx.stats.deferred.fetch_add(1, Ordering::Relaxed);
        return Ok(TaskOutcome::Deferred);
    }

    task.attempts += 1;
    let outcome = fetch(&ctx.client, &task.url).await;
    debug!(
        url = %task.url,
        status = ?outcome.status,
        attempt = task.attempts,
        latency_ms = outcome.latency.as_millis() as u64,
        "fetched"
    );

    match outcome.class {
        OutcomeClass::Success => {
            let body = outcome.body.unwrap_or_default();
            process_body(ctx, &task, &body).await?;
            ctx.frontier.complete(&task);
            ctx.stats.completed.fetch_add(1, Ordering::Relaxed);
            Ok(TaskOutcome::Completed)
        }
        OutcomeClass::Transient => {
            let reason = outcome.error.unwrap_or_else(|| "transient error".to_string());
            if task.attempts >= ctx.config.engine.max_attempts {
                warn!(url = %task.url, attempts = task.attempts, %reason, "retry budget exhausted");
                return fail_task(ctx, &task, &reason);
            }

            let delay = ctx.backoff.delay(task.attempts);
            info!(
                url = %task.url,
                attempt = task.attempts,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "transient failure, retrying"
            );
            ctx.frontier.reschedule(task, delay);
            ctx.stats.retried.fetch_add(1, Ordering::Relaxed);
            Ok(TaskOutcome::Retried)
        }
        OutcomeClass::Permanent => {
            let reason = outcome.error.unwrap_or_else(|| "permanent error".to_string());
            warn!(url = %task.url, %reason, "permanent failure");
            fail_task(ctx, &task, &reason)
        }
    }
}

/// Extraction, dedup, append and link discovery for a successful fetch
async fn process_body(ctx: &PipelineContext, task: &CrawlTask, body: &str) -> crate::Result<()> {
    let extraction = match ctx.extractor.extract(&task.url, body) {
        Ok(extraction) => extraction,
        // The fetch worked; a page the extractor cannot make sense of is
        // logged and skipped, not retried.
        Err(e) => {
            warn!(url = %task.url, error = %e, "extraction failed, skipping page");
            return Ok(());
        }
    };

    for fields in extraction.records {
        let fingerprint = match ctx.config.scope.fingerprint {
            FingerprintPolicy::Url => fingerprint_url(&task.url),
            FingerprintPolicy::Content => fingerprint_fields(&fields),
        };

        match checked_append(ctx, task, fields, fingerprint) {
            Ok(appended) => {
                if appended {
                    ctx.stats.records_appended.fetch_add(1, Ordering::Relaxed);
                } else {
                    debug!(url = %task.url, "duplicate record dropped");
                    ctx.stats.records_deduped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                // Put the task back before surfacing the error so the next
                // checkpoint still covers it.
                ctx.frontier
                    .reschedule(task.clone(), Duration::from_secs(1));
                return Err(e);
            }
        }
    }

    let child_depth = task.depth + 1;
    for link in extraction.links {
        let normalized = match normalize_url(&link) {
            Ok(url) => url,
            Err(_) => continue,
        };
        if !ctx.scope.admits(&normalized, child_depth) {
            continue;
        }
        if ctx
            .frontier
            .push(normalized, child_depth, 0, Some(task.id))
            .is_some()
        {
            debug!(parent = %task.url, depth = child_depth, "discovered follow-up task");
        }
    }

    Ok(())
}

/// Dedup check followed by the durable append, as one fallible unit
fn checked_append(
    ctx: &PipelineContext,
    task: &CrawlTask,
    fields: crate::extract::RecordFields,
    fingerprint: String,
) -> crate::Result<bool> {
    if ctx.dedup.check_and_mark(&fingerprint)? == DedupDecision::Duplicate {
        return Ok(false);
    }

    let record = ExtractedRecord {
        task_id: task.id,
        source_url: task.url.to_string(),
        fields,
        fingerprint,
        extracted_at: Utc::now(),
    };

    let appended = {
        let mut store = ctx.store.lock().unwrap();
        store.append(&record)?
    };
    Ok(appended)
}

/// Settles a task as terminally failed and records it for the post-run report
fn fail_task(ctx: &PipelineContext, task: &CrawlTask, reason: &str) -> crate::Result<TaskOutcome> {
    ctx.frontier.fail(task);
    ctx.stats.failed.fetch_add(1, Ordering::Relaxed);

    let mut store = ctx.store.lock().unwrap();
    store.record_failure(ctx.run_id, task.url.as_str(), task.attempts, reason)?;
    Ok(TaskOutcome::Failed)
}
