//! Run orchestration: startup, worker pool, checkpoint ticker, shutdown
//!
//! The orchestrator owns run setup (storage, checkpoint restore, seeding) and
//! the run loop: a fixed pool of workers draining the frontier plus a ticker
//! that periodically checkpoints the pending frontier. The run ends when the
//! frontier is quiescent or a shutdown is requested; either way a final
//! checkpoint is written so the next invocation can resume.

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::engine::fetcher::build_http_client;
use crate::engine::limiter::RateLimiter;
use crate::engine::pipeline::{run_task, PipelineContext};
use crate::engine::retry::ExponentialBackoff;
use crate::engine::{CrawlStats, StatsSnapshot};
use crate::extract::{Extractor, HtmlExtractor};
use crate::frontier::Frontier;
use crate::store::{open_store, RunStatus, SqliteStore, Store, StoreError};
use crate::url::{normalize_url, ScopeFilter};
use crate::TrawlineError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// How long an idle worker sleeps before re-checking the frontier
const IDLE_POLL: Duration = Duration::from_millis(50);

/// How long in-flight tasks get to finish after a shutdown request
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Consecutive storage failures before the run shuts itself down
const STORE_ERROR_LIMIT: u32 = 3;

/// Cooperative shutdown flag, shared between the signal handler and the run
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a shutdown; idempotent
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a shutdown has been requested
    pub async fn wait(&self) {
        while !self.is_requested() {
            self.inner.notify.notified().await;
        }
    }
}

/// Owns one crawl run from startup to final checkpoint
pub struct Orchestrator {
    ctx: Arc<PipelineContext>,
    shutdown: ShutdownSignal,
}

impl Orchestrator {
    /// Sets up a run with the default HTML extractor
    pub fn new(config: Config, config_hash: &str, fresh: bool) -> crate::Result<Self> {
        let extractor = HtmlExtractor::from_config(&config.extract)
            .map_err(|e| crate::ConfigError::Validation(e.to_string()))?;
        Self::with_extractor(config, config_hash, fresh, Arc::new(extractor))
    }

    /// Sets up a run with a caller-provided extractor.
    ///
    /// Opens storage, restores the latest checkpoint (unless `fresh`), seeds
    /// the frontier when nothing was restored, and registers the run. Fails
    /// when storage cannot be opened or there is nothing to crawl.
    pub fn with_extractor(
        config: Config,
        config_hash: &str,
        fresh: bool,
        extractor: Arc<dyn Extractor>,
    ) -> crate::Result<Self> {
        let config = Arc::new(config);
        let mut store = open_store(Path::new(&config.output.storage_path))?;

        if fresh {
            info!("starting fresh, discarding any existing checkpoint");
            store.clear_checkpoints()?;
        }

        let frontier = Arc::new(Frontier::new());
        let restored = if fresh {
            0
        } else {
            restore_checkpoint(&store, &frontier, &config)?
        };

        let seeds = normalized_seeds(&config)?;
        if restored == 0 {
            for seed in &seeds {
                frontier.push(seed.clone(), 0, 0, None);
            }
            info!(seeds = seeds.len(), "frontier seeded");
        } else {
            info!(tasks = restored, "frontier restored from checkpoint");
        }

        if frontier.is_quiescent() {
            return Err(TrawlineError::NothingToCrawl);
        }

        let run_id = store.create_run(config_hash)?;
        let store = Arc::new(Mutex::new(store));
        let dedup = Arc::new(Deduplicator::new(Arc::clone(&store))?);
        let client = build_http_client(&config.user_agent, config.engine.fetch_timeout())?;

        let ctx = PipelineContext {
            client,
            frontier,
            limiter: Arc::new(RateLimiter::new(
                config.politeness.per_host_rate,
                config.politeness.per_host_burst,
            )),
            dedup,
            extractor,
            scope: ScopeFilter::new(&config.scope, &seeds, config.engine.max_depth),
            backoff: ExponentialBackoff::new(
                Duration::from_millis(config.retry.backoff_base_ms),
                Duration::from_millis(config.retry.backoff_cap_ms),
            ),
            stats: Arc::new(CrawlStats::default()),
            store,
            config,
            run_id,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Handle for requesting shutdown from outside the run (signal handlers)
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the crawl to completion or shutdown and returns the final
    /// counters. A checkpoint is written on the way out in either case.
    pub async fn run(&self) -> crate::Result<StatsSnapshot> {
        let concurrency = self.ctx.config.engine.max_concurrency;
        info!(
            run_id = self.ctx.run_id,
            workers = concurrency,
            "crawl starting"
        );

        let ticker = self.spawn_checkpoint_ticker();

        let mut workers = JoinSet::new();
        let store_errors = Arc::new(AtomicU32::new(0));
        for worker_id in 0..concurrency {
            let ctx = Arc::clone(&self.ctx);
            let shutdown = self.shutdown.clone();
            let store_errors = Arc::clone(&store_errors);
            workers.spawn(async move {
                worker_loop(worker_id, ctx, shutdown, store_errors).await;
            });
        }

        self.drain_workers(&mut workers).await;

        // Stop the ticker whichever way the workers ended.
        self.shutdown.request();
        let _ = ticker.await;

        self.finish()
    }

    /// Waits for workers to exit, aborting stragglers once the grace period
    /// after a shutdown request has elapsed
    async fn drain_workers(&self, workers: &mut JoinSet<()>) {
        let shutdown = self.shutdown.clone();
        let deadline = async move {
            shutdown.wait().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        };
        tokio::pin!(deadline);

        let mut aborted = false;
        loop {
            tokio::select! {
                joined = workers.join_next() => {
                    match joined {
                        None => break,
                        Some(Err(e)) if e.is_panic() => {
                            error!("worker panicked: {}", e);
                        }
                        Some(_) => {}
                    }
                }
                _ = &mut deadline, if !aborted => {
                    warn!("shutdown grace period elapsed, aborting remaining workers");
                    workers.abort_all();
                    aborted = true;
                }
            }
        }
    }

    /// Final checkpoint, run bookkeeping and stats
    fn finish(&self) -> crate::Result<StatsSnapshot> {
        let interrupted = !self.ctx.frontier.is_quiescent();
        let pending = self.ctx.frontier.snapshot();

        {
            let mut store = self.ctx.store.lock().unwrap();
            let seq = store.checkpoint(&pending)?;
            debug!(seq, tasks = pending.len(), "final checkpoint written");

            let status = if interrupted {
                RunStatus::Interrupted
            } else {
                RunStatus::Completed
            };
            store.finish_run(self.ctx.run_id, status)?;
        }

        let stats = self.ctx.stats.snapshot();
        info!(
            run_id = self.ctx.run_id,
            completed = stats.completed,
            failed = stats.failed,
            retried = stats.retried,
            deferred = stats.deferred,
            records = stats.records_appended,
            duplicates = stats.records_deduped,
            interrupted,
            "crawl finished"
        );
        Ok(stats)
    }

    fn spawn_checkpoint_ticker(&self) -> tokio::task::JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let shutdown = self.shutdown.clone();
        let period = ctx.config.engine.checkpoint_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick would checkpoint the just-seeded
            // frontier; skip it.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let pending = ctx.frontier.snapshot();
                        let result = {
                            let mut store = ctx.store.lock().unwrap();
                            store.checkpoint(&pending)
                        };
                        match result {
                            Ok(seq) => {
                                debug!(seq, tasks = pending.len(), "checkpoint written");
                            }
                            // A failed checkpoint costs resume granularity,
                            // not correctness; skip the cycle.
                            Err(e) => warn!("checkpoint failed: {}", e),
                        }
                    }
                    _ = shutdown.wait() => break,
                }
            }
        })
    }
}

/// One worker: pop, run, repeat until quiescence or shutdown
async fn worker_loop(
    worker_id: u32,
    ctx: Arc<PipelineContext>,
    shutdown: ShutdownSignal,
    store_errors: Arc<AtomicU32>,
) {
    debug!(worker_id, "worker started");

    loop {
        if shutdown.is_requested() {
            break;
        }

        match ctx.frontier.pop() {
            Some(task) => match run_task(&ctx, task).await {
                Ok(_) => {
                    store_errors.store(0, Ordering::Relaxed);
                }
                Err(e) => {
                    let streak = store_errors.fetch_add(1, Ordering::Relaxed) + 1;
                    error!(worker_id, streak, "task failed with storage error: {}", e);
                    if streak >= STORE_ERROR_LIMIT {
                        error!("storage is persistently failing, shutting down");
                        shutdown.request();
                    }
                }
            },
            None => {
                if ctx.frontier.is_quiescent() {
                    break;
                }
                // Tasks are delayed or in flight elsewhere; check back soon.
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
    }

    debug!(worker_id, "worker exiting");
}

/// Restores pending tasks from the latest checkpoint. Returns the number of
/// tasks admitted to the frontier.
fn restore_checkpoint(
    store: &SqliteStore,
    frontier: &Frontier,
    config: &Config,
) -> crate::Result<usize> {
    let pending = match store.load_latest_checkpoint() {
        Ok(Some((seq, pending))) => {
            debug!(seq, tasks = pending.len(), "checkpoint loaded");
            pending
        }
        Ok(None) => return Ok(0),
        Err(StoreError::CheckpointCorrupt(detail)) => {
            // Without seeds there is no way to recover; with them, start over.
            if config.seeds.is_empty() {
                return Err(TrawlineError::CorruptCheckpoint(detail));
            }
            warn!("checkpoint is corrupt ({}), reseeding from config", detail);
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let mut restored = 0;
    for task in pending {
        match Url::parse(&task.url) {
            Ok(url) => {
                frontier.restore(task, url);
                restored += 1;
            }
            Err(e) => {
                warn!(url = %task.url, "dropping unparsable checkpointed task: {}", e);
            }
        }
    }
    Ok(restored)
}

/// Parses and normalizes the configured seeds, skipping none: validation
/// already rejected malformed seeds, so any error here is a real bug.
fn normalized_seeds(config: &Config) -> crate::Result<Vec<Url>> {
    config
        .seeds
        .iter()
        .map(|s| normalize_url(s).map_err(Into::into))
        .collect()
}
