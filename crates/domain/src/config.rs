//! Configuration structures for the purchase pipeline

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storelink_common::error::{CommonError, CommonResult};

use crate::constants::{
    DEFAULT_LEDGER_FILE_NAME, DEFAULT_LOG_LEVEL, DEFAULT_RECONNECT_BASE_DELAY_MS,
    DEFAULT_RECONNECT_MAX_DELAY_MS,
};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// When false, purchases are recorded but never consumed/acknowledged
    #[serde(default = "default_true")]
    pub finish_transactions: bool,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
            finish_transactions: true,
        }
    }
}

impl BillingConfig {
    pub fn validate(&self) -> CommonResult<()> {
        self.reconnect.validate()
    }
}

/// Backoff bounds for reconnecting to the billing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_RECONNECT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RECONNECT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.base_delay_ms == 0 {
            return Err(CommonError::config_field(
                "reconnect.base_delay_ms",
                "must be greater than zero",
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(CommonError::config_field(
                "reconnect.max_delay_ms",
                format!(
                    "must be at least base_delay_ms ({} > {})",
                    self.base_delay_ms, self.max_delay_ms
                ),
            ));
        }
        Ok(())
    }
}

/// Where posted purchase tokens are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { path: default_ledger_path(), pool_size: default_pool_size() }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_RECONNECT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_RECONNECT_MAX_DELAY_MS
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_FILE_NAME)
}

fn default_pool_size() -> u32 {
    2
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
