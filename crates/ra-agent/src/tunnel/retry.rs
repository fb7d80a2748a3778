//! Bounded retry policy

use std::time::Duration;

use ra_core::config::RetryConfig;

/// Attempt bound and delay schedule for retried operations
///
/// The policy holds no state: `delay_for` is a function of the attempt
/// number, so callers own the loop and the clock.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial: Duration,
    multiplier: f64,
    jitter: f64,
}

impl RetryPolicy {
    /// Create a policy from configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay, config.multiplier, config.jitter)
    }

    /// Create a policy with custom parameters
    pub fn new(max_attempts: u32, initial: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial,
            multiplier,
            jitter: if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) },
        }
    }

    /// Fixed delay between a bounded number of attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, 1.0, 0.0)
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt may follow the given (1-based) attempt
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after the given (1-based) failed attempt
    ///
    /// Negative or NaN results become zero; overflow saturates.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial.as_secs_f64() * self.multiplier.powi(exponent);

        let jitter_amount = if self.jitter > 0.0 && delay.is_finite() {
            delay * self.jitter * rand::random::<f64>()
        } else {
            0.0
        };
        let secs = delay + jitter_amount;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
