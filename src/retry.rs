//! Retry policy for failed URLs
//!
//! Decides between another attempt and a terminal failure, and owns the
//! linear backoff applied to non-breaker errors before a failure is
//! surfaced to the queue.

use std::time::Duration;

/// What to do with a URL after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transition the row to `retrying` with the given counter.
    Retry { next_retry_count: i32 },
    /// Transition the row to `failed`.
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryController {
    max_retries: u32,
}

impl RetryController {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// `attempt_count` is 1-based: the first failure of a fresh row is
    /// attempt 1. A row retries while `attempt_count <= max_retries`.
    pub fn decide(&self, attempt_count: u32) -> RetryDecision {
        if attempt_count <= self.max_retries {
            RetryDecision::Retry {
                next_retry_count: attempt_count as i32,
            }
        } else {
            RetryDecision::Fail
        }
    }

    /// Linear backoff for non-breaker errors: `5 + 2 * retry_count`
    /// seconds.
    pub fn backoff(retry_count: u32) -> Duration {
        Duration::from_secs(5 + 2 * u64::from(retry_count))
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
