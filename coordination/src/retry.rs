//! Retry policy for throttled provider calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Growth factor per retry (2.0 doubles the delay each time).
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-indexed):
    /// `initial × multiplier^retry`, capped at `max_backoff_ms`.
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let delay = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        if !delay.is_finite() || delay >= self.max_backoff_ms as f64 {
            return self.max_backoff_ms;
        }
        delay as u64
    }

    pub fn backoff_duration(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms(retry))
    }

    /// Whether another retry is allowed after `retries_so_far` retries.
    pub fn should_retry(&self, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries
    }

    /// Total attempts this policy allows, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    /// Default: 3 retries, 1s initial backoff, 2x multiplier, 30s max.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(0), 1_000);
        assert_eq!(policy.backoff_ms(1), 2_000);
        assert_eq!(policy.backoff_ms(2), 4_000);
    }

    #[test]
    fn test_retry_policy_max_backoff() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 3.0,
            max_backoff_ms: 5_000,
        };
        assert_eq!(policy.backoff_ms(1), 3_000);
        assert_eq!(policy.backoff_ms(2), 5_000);
        assert_eq!(policy.backoff_ms(60), 5_000);
    }

    #[test]
    fn test_should_retry_is_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert_eq!(policy.max_attempts(), 4);
        assert!(!RetryPolicy::none().should_retry(0));
    }
}
