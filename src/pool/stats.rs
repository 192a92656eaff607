//! Run statistics and the progress callback contract

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use serde::Serialize;

/// Outcome of one URL job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    /// Queue row id; `None` for inline bulk URLs.
    pub url_id: Option<i64>,
    pub url: String,
    pub success: bool,
    pub products_found: usize,
    pub products_saved: usize,
    /// 1-based attempt number this result corresponds to.
    pub attempt: u32,
    pub error: Option<String>,
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_products_found: usize,
    pub total_saved_to_db: usize,
}

/// Shared atomic counters updated after every job.
#[derive(Debug, Default)]
pub struct RunStats {
    submitted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    total_products_found: AtomicUsize,
    total_saved_to_db: AtomicUsize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, count: usize) {
        self.submitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record(&self, result: &JobResult) {
        if result.success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_products_found
            .fetch_add(result.products_found, Ordering::Relaxed);
        self.total_saved_to_db
            .fetch_add(result.products_saved, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_products_found: self.total_products_found.load(Ordering::Relaxed),
            total_saved_to_db: self.total_saved_to_db.load(Ordering::Relaxed),
        }
    }
}

/// Callback invoked after each completed job with the result and a
/// snapshot of the run counters.
///
/// Implementations run on worker tasks; panics are caught and swallowed
/// so a broken observer can never take down the pool.
pub trait ProgressObserver: Send + Sync {
    fn on_job_complete(&self, result: &JobResult, stats: &StatsSnapshot);
}

/// Observer that does nothing; every method inlines away.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {
    #[inline(always)]
    fn on_job_complete(&self, _result: &JobResult, _stats: &StatsSnapshot) {}
}

/// Observer that logs one line per job plus the running totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_job_complete(&self, result: &JobResult, stats: &StatsSnapshot) {
        if result.success {
            info!(
                "done {} (found={}, saved={}) [ok={} fail={} of {}]",
                result.url,
                result.products_found,
                result.products_saved,
                stats.succeeded,
                stats.failed,
                stats.submitted
            );
        } else {
            info!(
                "failed {} attempt {}: {} [ok={} fail={} of {}]",
                result.url,
                result.attempt,
                result.error.as_deref().unwrap_or("unknown error"),
                stats.succeeded,
                stats.failed,
                stats.submitted
            );
        }
    }
}

/// Deliver a result to the observer, swallowing panics.
pub fn notify(observer: &dyn ProgressObserver, result: &JobResult, stats: &StatsSnapshot) {
    let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_job_complete(result, stats)));
    if outcome.is_err() {
        debug!("progress observer panicked; ignoring");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, found: usize, saved: usize) -> JobResult {
        JobResult {
            url_id: Some(1),
            url: "https://shop.example.com/search".to_string(),
            success,
            products_found: found,
            products_saved: saved,
            attempt: 1,
            error: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn counters_accumulate() {
        let stats = RunStats::new();
        stats.record_submitted(3);
        stats.record(&result(true, 5, 4));
        stats.record(&result(true, 2, 2));
        stats.record(&result(false, 0, 0));

        let snap = stats.snapshot();
        assert_eq!(snap.submitted, 3);
        assert_eq!(snap.succeeded, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.total_products_found, 7);
        assert_eq!(snap.total_saved_to_db, 6);
        assert!(snap.total_saved_to_db <= snap.total_products_found);
    }

    #[test]
    fn observer_panics_are_swallowed() {
        struct Panicky;
        impl ProgressObserver for Panicky {
            fn on_job_complete(&self, _: &JobResult, _: &StatsSnapshot) {
                panic!("observer bug");
            }
        }
        // Must not propagate.
        notify(&Panicky, &result(true, 1, 1), &StatsSnapshot::default());
    }
}
