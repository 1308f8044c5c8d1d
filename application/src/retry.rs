//! Retry policy for envelope delivery.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for downstream delivery attempts.
///
/// Delay for attempt `n` (1-indexed) is `base_delay * multiplier^(n-1)`,
/// and the dispatcher gives up after `max_attempts` tries — at which point
/// the owning task moves to `Failed` and the caller sees
/// `DownstreamUnavailable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Backoff multiplier between consecutive retries.
    pub multiplier: f64,
    /// Total attempt ceiling, including the initial try.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_attempts: 4,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `attempts`-th failed try (1-indexed).
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let delay = base * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay)
    }

    /// Whether another attempt is allowed after `attempts` tries.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: 5,
        };
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn attempt_ceiling_is_inclusive_of_first_try() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(3));
        assert!(!policy.allows_retry(4));
    }
}
