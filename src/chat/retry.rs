//! Fixed-delay retry for chat endpoint calls

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, SERVICE_UNAVAILABLE};

/// Retry policy for chat completions
///
/// Controls how many attempts a request gets in total and how long to wait
/// between them. The delay is constant; it does not grow per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Whether a failed attempt gets another try
    ///
    /// `attempt` is 1-based. The final attempt is never followed by a retry.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32, error: &Error) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt`
    #[must_use]
    pub const fn delay_after(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Determine whether an HTTP status indicates temporary unavailability.
///
/// Only 503 qualifies. Rate limits and other server errors end the request.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    status == SERVICE_UNAVAILABLE
}

/// Waits out the delay between attempts
///
/// Production code sleeps on the tokio timer; tests substitute an
/// implementation that records the requested delays.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
