//! Retry policy with exponential backoff

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many times a failed item is retried and how long to wait in between
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Backoff base in seconds; the wait after attempt `n` is `base^n`
    pub base_delay: f64,
    /// Upper bound on a single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 2.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: f64) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Total attempts allowed, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retrying, given the 0-based index of the attempt that failed
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base_delay.powi(exponent);
        if !seconds.is_finite() || seconds >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Whether another attempt is allowed after `attempts_made` attempts
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts()
    }
}
