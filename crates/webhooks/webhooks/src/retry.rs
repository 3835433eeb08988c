//! Retry policies for webhook delivery.

use std::time::Duration;

/// Trait for retry policies.
///
/// `attempt` counts completed attempts, so `retry_attempts = n` yields
/// exactly `n + 1` transport attempts in total.
pub trait RetryPolicy: Send + Sync {
    /// Returns the delay before the next attempt, or None once retries are
    /// exhausted.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Returns the number of configured retries (attempts beyond the first).
    fn retry_attempts(&self) -> u32;
}

/// Fixed delay retry policy.
///
/// Always waits the same delay between attempts. The configured delay range
/// (1-30 seconds) is narrow enough that backoff buys nothing.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    /// Delay between attempts.
    pub delay: Duration,
    /// Number of retries after the first attempt.
    pub retry_attempts: u32,
}

impl FixedDelay {
    /// Creates a new fixed delay policy.
    pub fn new(delay: Duration, retry_attempts: u32) -> Self {
        Self {
            delay,
            retry_attempts,
        }
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.retry_attempts {
            None
        } else {
            Some(self.delay)
        }
    }

    fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }
}

/// No-retry policy - a single attempt, used by test deliveries.
#[derive(Debug, Clone, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn retry_attempts(&self) -> u32 {
        0
    }
}
