//! Process-wide circuit breaker for OS resource exhaustion
//!
//! Chromium spawns start failing with EAGAIN ("Errno 11", "Resource
//! temporarily unavailable") when the host runs out of pids, file
//! descriptors or memory maps. One worker backing off doesn't help — every
//! worker is competing for the same kernel budget — so the breaker is
//! global: a burst of consecutive resource errors sets a shared pause
//! deadline, all workers tear down their browser and sleep until it
//! passes, and the counter clears once the deadline expires.

use std::time::Duration;

use parking_lot::Mutex;
// tokio's Instant so the pause window follows the runtime clock (virtual
// under `start_paused` tests, wall clock in production).
use tokio::time::Instant;
use tracing::{info, warn};

/// Consecutive resource errors before the breaker trips.
pub const DEFAULT_ERRNO11_THRESHOLD: u32 = 3;

/// Base pause length; each consecutive error past zero adds
/// [`PAUSE_PER_ERROR_SECS`].
const PAUSE_BASE_SECS: u64 = 60;
const PAUSE_PER_ERROR_SECS: u64 = 20;

/// Message fragments marking the kernel-refused-a-resource error class.
const RESOURCE_ERROR_MARKERS: &[&str] = &[
    "errno 11",
    "resource temporarily unavailable",
    "eagain",
    "too many open files",
    "cannot allocate memory",
];

/// Does this error mean the OS refused to allocate a resource?
pub fn is_resource_exhaustion(error: &anyhow::Error) -> bool {
    let msg = format!("{error:#}").to_lowercase();
    RESOURCE_ERROR_MARKERS.iter().any(|m| msg.contains(m))
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive: u32,
    pause_until: Option<Instant>,
    /// Bumped on every trip; workers recycle their session when they
    /// observe a bump.
    teardown_epoch: u64,
}

/// Shared `{counter, pause deadline}` guarded by a mutex. Workers read at
/// job entry and sleep until the deadline — no busy-waiting.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: threshold.max(1),
        }
    }

    /// Any successful job resets the consecutive counter.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive = 0;
    }

    /// Count one resource-exhaustion error. Returns the pause duration
    /// when this error tripped the breaker.
    pub fn record_resource_failure(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        state.consecutive += 1;
        if state.consecutive < self.threshold {
            warn!(
                consecutive = state.consecutive,
                threshold = self.threshold,
                "resource exhaustion error recorded"
            );
            return None;
        }
        let pause =
            Duration::from_secs(PAUSE_BASE_SECS + PAUSE_PER_ERROR_SECS * u64::from(state.consecutive));
        state.pause_until = Some(Instant::now() + pause);
        state.teardown_epoch += 1;
        warn!(
            consecutive = state.consecutive,
            pause_secs = pause.as_secs(),
            "circuit breaker tripped, pausing all workers"
        );
        Some(pause)
    }

    /// Remaining global pause, if one is active. An expired deadline is
    /// cleared here together with the consecutive counter.
    pub fn pause_remaining(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        let deadline = state.pause_until?;
        let now = Instant::now();
        if now >= deadline {
            state.pause_until = None;
            state.consecutive = 0;
            info!("circuit breaker pause expired, resuming");
            return None;
        }
        Some(deadline - now)
    }

    /// Current teardown generation. A worker holding an older value must
    /// recycle its browser session before its next job.
    pub fn teardown_epoch(&self) -> u64 {
        self.state.lock().teardown_epoch
    }

    /// Block until no pause deadline is active. Sleeps the full remaining
    /// window per iteration rather than polling.
    pub async fn wait_until_clear(&self) {
        while let Some(remaining) = self.pause_remaining() {
            tokio::time::sleep(remaining).await;
        }
    }

    #[cfg(test)]
    fn consecutive(&self) -> u32 {
        self.state.lock().consecutive
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_ERRNO11_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn classifies_resource_errors() {
        assert!(is_resource_exhaustion(&anyhow!(
            "failed to launch browser: Resource temporarily unavailable (os error 11)"
        )));
        assert!(is_resource_exhaustion(&anyhow!("fork: Errno 11")));
        assert!(is_resource_exhaustion(&anyhow!("accept4: Too many open files")));
        assert!(!is_resource_exhaustion(&anyhow!("navigation timeout after 30 seconds")));
        assert!(!is_resource_exhaustion(&anyhow!("connection refused")));
    }

    #[test]
    fn trips_at_threshold_with_scaled_pause() {
        let breaker = CircuitBreaker::new(3);
        assert_eq!(breaker.record_resource_failure(), None);
        assert_eq!(breaker.record_resource_failure(), None);
        let pause = breaker.record_resource_failure().expect("third error trips");
        // 60 + 20 * 3
        assert_eq!(pause, Duration::from_secs(120));
        assert!(breaker.pause_remaining().is_some());
        assert_eq!(breaker.teardown_epoch(), 1);
    }

    #[test]
    fn success_resets_the_streak() {
        let breaker = CircuitBreaker::new(3);
        breaker.record_resource_failure();
        breaker.record_resource_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive(), 0);
        assert_eq!(breaker.record_resource_failure(), None);
    }

    #[test]
    fn additional_failures_extend_the_pause() {
        let breaker = CircuitBreaker::new(2);
        breaker.record_resource_failure();
        let first = breaker.record_resource_failure().expect("tripped");
        assert_eq!(first, Duration::from_secs(100));
        let second = breaker.record_resource_failure().expect("still over threshold");
        assert_eq!(second, Duration::from_secs(120));
        assert_eq!(breaker.teardown_epoch(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_clear_blocks_for_the_window() {
        let breaker = CircuitBreaker::new(1);
        let pause = breaker.record_resource_failure().expect("tripped");
        assert_eq!(pause, Duration::from_secs(80));

        let started = tokio::time::Instant::now();
        breaker.wait_until_clear().await;
        // Virtual clock: the wait must have spanned the pause window.
        assert!(started.elapsed() >= Duration::from_secs(80));
        assert!(breaker.pause_remaining().is_none());
        assert_eq!(breaker.consecutive(), 0);
    }
}
