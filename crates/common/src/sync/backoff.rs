// Capped exponential backoff with reset
use std::time::Duration;

use crate::error::{CommonError, CommonResult};

/// Default base delay for exponential backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (15 minutes)
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(15 * 60);

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Exponential backoff calculator that tracks consecutive failures
///
/// Delays grow as `base * 2^attempt` and are capped at `max_delay`. No jitter
/// is applied, so consecutive delays never decrease until [`reset`] is
/// called.
///
/// [`reset`]: ExponentialBackoff::reset
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    attempt: u32,
    last_delay: Option<Duration>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            attempt: 0,
            last_delay: None,
        }
    }
}

impl ExponentialBackoff {
    /// Create a backoff with validated bounds
    pub fn new(base_delay: Duration, max_delay: Duration) -> CommonResult<Self> {
        if base_delay.is_zero() {
            return Err(CommonError::config_field("base_delay", "must be greater than zero"));
        }

        if base_delay > max_delay {
            return Err(CommonError::config(format!(
                "base_delay ({:?}) cannot be greater than max_delay ({:?})",
                base_delay, max_delay
            )));
        }

        Ok(Self { base_delay, max_delay, attempt: 0, last_delay: None })
    }

    /// Delay for the next failure, advancing the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.last_delay = Some(delay);
        delay
    }

    /// Calculate delay for a given attempt without advancing state
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Use saturating arithmetic so huge attempt counts stay at the cap
        let base_millis = self.base_delay.as_millis() as u64;
        let max_millis = self.max_delay.as_millis() as u64;

        let exponent = attempt.min(MAX_BACKOFF_EXPONENT);
        let multiplier = 2_u64.saturating_pow(exponent);

        let delay_millis = base_millis.saturating_mul(multiplier).min(max_millis);

        Duration::from_millis(delay_millis)
    }

    /// Forget all consecutive failures
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last_delay = None;
    }

    /// Number of consecutive failures recorded since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Most recently scheduled delay, if any
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Configured base delay
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Configured maximum delay
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}
