//! Retry policy: decides whether and when a fetch is retried.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::domain::ChunkError;

/// Upper bound on a single backoff sleep.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Retry policy for retryable `Unreachable` fetches.
///
/// Exponential backoff with an optional random extra delay (jitter).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per location, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Extra random delay as a fraction of the computed delay.
    pub jitter: f64,
}

impl RetryPolicy {
    /// 3 attempts, 200ms -> 400ms.
    pub fn default_fetch() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default_fetch()
        }
    }

    /// Delay before the next attempt, given how many attempts were already made.
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - after attempt 1: 200ms
    /// - after attempt 2: 400ms
    ///
    /// 結果は `MAX_RETRY_DELAY` で頭打ち。NaN / 負の値になっても panic しない。
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let mut delay_secs = base_secs * self.multiplier.powi(exponent);
        if self.jitter > 0.0 && self.jitter.is_finite() {
            delay_secs += delay_secs * rand::thread_rng().gen_range(0.0..=self.jitter);
        }
        let capped = delay_secs.clamp(0.0, MAX_RETRY_DELAY.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(MAX_RETRY_DELAY)
    }

    /// Only retryable errors are retried, and only while attempts remain.
    pub fn should_retry(&self, attempts: u32, error: &ChunkError) -> bool {
        error.retryable && attempts < self.max_attempts
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }
}
