//! Fixed-size worker pool draining the URL queue in batches
//!
//! The pool owns `W` worker units, each pinned to its own browser
//! session; sessions live in a slice keyed by worker index and survive
//! across batches. Each cycle claims up to `batch_size` rows, pushes them
//! onto a shared lock-free queue, lets every worker drain it concurrently,
//! waits for the batch to finish, then claims again — until the queue is
//! empty or the run limit is reached.

pub mod stats;
pub mod worker;

use std::sync::Arc;

use anyhow::Result;
use crossbeam_queue::SegQueue;
use log::{info, warn};
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::browser::{BrowserSession, SessionRegistry};
use crate::config::AppConfig;
use crate::guard::{ResourceGuard, auto_worker_count};
use crate::retry::RetryController;
use crate::store::{ProductStore, QueueClient};

pub use stats::{JobResult, LogObserver, NoOpObserver, ProgressObserver, RunStats, StatsSnapshot};
pub use worker::{WorkItem, WorkerUnit};

use stats::notify;

/// Final tally of one run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub urls_processed: usize,
    pub stats: StatsSnapshot,
}

pub struct WorkerPool {
    config: AppConfig,
    queue: Option<QueueClient>,
    store: Option<ProductStore>,
    breaker: Arc<CircuitBreaker>,
    stats: Arc<RunStats>,
    observer: Arc<dyn ProgressObserver>,
    registry: Arc<SessionRegistry>,
}

impl WorkerPool {
    pub fn new(config: AppConfig, queue: Option<QueueClient>, store: Option<ProductStore>) -> Self {
        Self {
            config,
            queue,
            store,
            breaker: Arc::new(CircuitBreaker::default()),
            stats: Arc::new(RunStats::new()),
            observer: Arc::new(LogObserver),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Replace the progress observer (defaults to per-job log lines).
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drain the database queue until it is empty or the run limit hits.
    pub async fn run(&self) -> Result<RunSummary> {
        let queue = self
            .queue
            .clone()
            .ok_or_else(|| anyhow::anyhow!("queue mode requires a database connection"))?;

        let worker_token = format!("worker-{}", Uuid::new_v4());
        let limit = self.config.effective_limit();

        let min_id = if self.config.url_offset > 0 {
            match queue.id_at_offset(self.config.url_offset as i64).await {
                Some(id) => {
                    info!("offset {} resolves to min_id {id}", self.config.url_offset);
                    id
                }
                None => {
                    warn!("offset {} beyond queue end, nothing to do", self.config.url_offset);
                    return Ok(RunSummary {
                        urls_processed: 0,
                        stats: self.stats.snapshot(),
                    });
                }
            }
        } else {
            0
        };

        let workers = self.build_workers();
        info!(
            "starting pool: {} workers, batch_size={}, token={worker_token}",
            workers.len(),
            self.config.batch_size
        );

        let mut processed = 0usize;
        loop {
            let remaining = limit.map(|l| l.saturating_sub(processed));
            if remaining == Some(0) {
                info!("run limit reached after {processed} urls");
                break;
            }
            let batch_size = remaining
                .map_or(self.config.batch_size, |r| r.min(self.config.batch_size))
                as i64;

            let batch = queue
                .claim(batch_size, &worker_token, &self.config.status_filters, min_id)
                .await;
            if batch.is_empty() {
                info!("queue drained after {processed} urls");
                break;
            }
            processed += batch.len();
            self.stats.record_submitted(batch.len());

            let jobs: Arc<SegQueue<WorkItem>> = Arc::new(SegQueue::new());
            for record in &batch {
                jobs.push(WorkItem::from(record));
            }
            self.drain_batch(&workers, jobs).await;

            if self.config.dry_run_only {
                info!("dry run: stopping after one batch");
                break;
            }
        }

        self.shutdown(&workers).await;
        Ok(RunSummary {
            urls_processed: processed,
            stats: self.stats.snapshot(),
        })
    }

    /// Process an inline URL payload through the same pipeline, without
    /// queue acks. Failed URLs are requeued in-process while their retry
    /// budget lasts.
    pub async fn run_bulk(&self, bulk: Vec<WorkItem>) -> Result<RunSummary> {
        let limit = self.config.effective_limit();
        let mut items = bulk;
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        let submitted = items.len();
        self.stats.record_submitted(submitted);

        let workers = self.build_workers();
        info!("starting bulk pool: {} workers, {submitted} urls", workers.len());

        let jobs: Arc<SegQueue<WorkItem>> = Arc::new(SegQueue::new());
        for item in items {
            jobs.push(item);
        }
        self.drain_batch(&workers, jobs).await;

        self.shutdown(&workers).await;
        Ok(RunSummary {
            urls_processed: submitted,
            stats: self.stats.snapshot(),
        })
    }

    /// One worker unit per slot, sharing the launch gate, breaker and
    /// profile registry.
    fn build_workers(&self) -> Vec<Arc<Mutex<WorkerUnit>>> {
        let worker_count = auto_worker_count(self.config.max_workers);
        let launch_gate = Arc::new(Semaphore::new(1));
        let guard = ResourceGuard::new(self.config.fd_threshold, self.config.child_proc_threshold);
        let retry = RetryController::new(self.config.max_retries);

        (0..worker_count)
            .map(|index| {
                let session = BrowserSession::new(
                    index,
                    self.config.session_config(),
                    guard,
                    Arc::clone(&launch_gate),
                    Arc::clone(&self.registry),
                );
                Arc::new(Mutex::new(WorkerUnit::new(
                    index,
                    session,
                    retry,
                    Arc::clone(&self.breaker),
                    self.queue.clone(),
                    self.store.clone(),
                    self.config.max_items_per_page,
                )))
            })
            .collect()
    }

    /// Fan a batch out to every worker and wait for the queue to drain.
    async fn drain_batch(&self, workers: &[Arc<Mutex<WorkerUnit>>], jobs: Arc<SegQueue<WorkItem>>) {
        let retry = RetryController::new(self.config.max_retries);
        let mut handles = Vec::with_capacity(workers.len());
        for unit in workers {
            let unit = Arc::clone(unit);
            let jobs = Arc::clone(&jobs);
            let stats = Arc::clone(&self.stats);
            let observer = Arc::clone(&self.observer);
            handles.push(tokio::spawn(async move {
                let mut unit = unit.lock().await;
                while let Some(item) = jobs.pop() {
                    let result = unit.run_job(&item).await;
                    // Bulk items have no queue row to park in `retrying`;
                    // requeue them in-process while budget remains.
                    if !result.success
                        && item.id.is_none()
                        && matches!(retry.decide(result.attempt), crate::retry::RetryDecision::Retry { .. })
                    {
                        // Mirrors a queue-mode re-claim, which also counts
                        // as a fresh submission.
                        stats.record_submitted(1);
                        jobs.push(WorkItem {
                            retry_count: result.attempt,
                            ..item.clone()
                        });
                    }
                    stats.record(&result);
                    let snapshot = stats.snapshot();
                    notify(observer.as_ref(), &result, &snapshot);
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("worker task panicked: {e}");
            }
        }
    }

    /// Cooperative shutdown: close every session, then sweep any profile
    /// directory a lost session left behind.
    async fn shutdown(&self, workers: &[Arc<Mutex<WorkerUnit>>]) {
        for unit in workers {
            unit.lock().await.close().await;
        }
        self.registry.sweep();
        info!("worker pool shut down");
    }
}
