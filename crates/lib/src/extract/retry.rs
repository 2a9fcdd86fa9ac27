//! # Retry Policy
//!
//! Sequential retries with capped exponential backoff. The policy is a plain
//! value handed to the caller, so tests can run with [`RetryPolicy::immediate`]
//! or with tokio's paused clock.

use crate::errors::ExtractError;
use std::{future::Future, time::Duration};
use tracing::warn;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

/// Why [`RetryPolicy::run`] gave up.
#[derive(Debug)]
pub enum RetryFailure {
    /// A non-retryable error ended the loop early.
    Fatal(ExtractError),
    /// Every attempt failed; carries the error from the final one.
    Exhausted { attempts: u32, last_error: ExtractError },
}

impl RetryPolicy {
    /// A policy that never sleeps.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The delay before 1-based `attempt`: nothing before the first, then
    /// `base * 2^(attempt - 2)` capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Every delay the policy would sleep through if all attempts fail.
    pub fn schedule(&self) -> Vec<Duration> {
        (2..=self.attempts()).map(|n| self.delay_before(n)).collect()
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Runs `operation` until it succeeds, hits a non-retryable error, or the
    /// attempts run out. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(RetryFailure::Fatal(e)),
                Err(e) if attempt >= attempts => {
                    return Err(RetryFailure::Exhausted {
                        attempts,
                        last_error: e,
                    })
                }
                Err(e) => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    warn!(attempt, ?delay, error = %e, "Attempt failed; retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_and_cap() {
        let policy = RetryPolicy::default().with_max_attempts(7);
        let millis: Vec<u128> = policy.schedule().iter().map(|d| d.as_millis()).collect();
        assert_eq!(millis, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        assert!(RetryPolicy::immediate(0).schedule().is_empty());
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }
}
