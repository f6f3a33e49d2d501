//! Reconnection policy for the billing connection

use std::time::Duration;

use storelink_common::{CommonResult, ExponentialBackoff};
use storelink_domain::ReconnectConfig;

use super::classifier::ResponseClass;

/// Decides whether and when to reconnect after a connection failure
///
/// Retries continue indefinitely; the delay doubles per consecutive failure
/// up to the configured ceiling and drops back to the base delay on `Ready`.
#[derive(Debug, Clone, Default)]
pub struct ReconnectionPolicy {
    backoff: ExponentialBackoff,
}

impl ReconnectionPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> CommonResult<Self> {
        Ok(Self { backoff: ExponentialBackoff::new(base_delay, max_delay)? })
    }

    pub fn from_config(config: &ReconnectConfig) -> CommonResult<Self> {
        config.validate()?;
        Self::new(config.base_delay(), config.max_delay())
    }

    /// Only recoverable failures are retried
    pub fn should_retry(&self, class: ResponseClass) -> bool {
        class.is_recoverable()
    }

    /// Delay before the next attempt; counts one more consecutive failure
    pub fn next_delay(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    /// Called on every transition to `Ready`
    pub fn reset(&mut self) {
        self.backoff.reset();
    }

    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }
}
