use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter for retryable provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Un-jittered ceiling for the given retry (1-based): base × 2^(retry-1), capped.
    pub fn ceiling(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay before the given retry: uniform in [ceiling/2, ceiling], raised to
    /// any server-provided `Retry-After` and capped at `max_delay`.
    pub fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let ceiling = self.ceiling(retry);
        let floor = ceiling / 2;
        let jittered = if ceiling > floor {
            let span = (ceiling - floor).as_millis() as u64;
            floor + Duration::from_millis(rand::rng().random_range(0..=span))
        } else {
            ceiling
        };
        jittered
            .max(retry_after.unwrap_or_default())
            .min(self.max_delay)
    }
}
