//! Configuration loader
//!
//! Loads billing configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `STORELINK_LEDGER_PATH` is set, configuration comes from the
//!    environment
//! 2. Otherwise a config file is probed for and parsed
//! 3. When neither exists, defaults are used
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `STORELINK_LEDGER_PATH`: Posted-token database path (required for env
//!   loading)
//! - `STORELINK_LEDGER_POOL_SIZE`: Connection pool size
//! - `STORELINK_RECONNECT_BASE_DELAY_MS`: First reconnect delay
//! - `STORELINK_RECONNECT_MAX_DELAY_MS`: Reconnect delay ceiling
//! - `STORELINK_LOG_LEVEL`: Log filter directive (e.g. `info`, `storelink_core=debug`)
//! - `STORELINK_LOG_JSON`: Emit JSON log lines (true/false)
//! - `STORELINK_FINISH_TRANSACTIONS`: Consume/acknowledge purchases (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./storelink.toml` or `./storelink.json` (current working directory)
//! 2. `./config/storelink.toml` or `./config/storelink.json`
//! 3. The same names in the parent directory
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use storelink_common::{CommonError, CommonResult};
use storelink_domain::{BillingConfig, LedgerConfig, LoggingConfig, ReconnectConfig};

use crate::errors::InfraError;

const ENV_LEDGER_PATH: &str = "STORELINK_LEDGER_PATH";
const ENV_LEDGER_POOL_SIZE: &str = "STORELINK_LEDGER_POOL_SIZE";
const ENV_RECONNECT_BASE_DELAY_MS: &str = "STORELINK_RECONNECT_BASE_DELAY_MS";
const ENV_RECONNECT_MAX_DELAY_MS: &str = "STORELINK_RECONNECT_MAX_DELAY_MS";
const ENV_LOG_LEVEL: &str = "STORELINK_LOG_LEVEL";
const ENV_LOG_JSON: &str = "STORELINK_LOG_JSON";
const ENV_FINISH_TRANSACTIONS: &str = "STORELINK_FINISH_TRANSACTIONS";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["storelink.toml", "storelink.json", "config/storelink.toml", "config/storelink.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CommonError::Config` if the chosen source is invalid or the
/// resulting configuration fails validation.
pub fn load() -> CommonResult<BillingConfig> {
    if std::env::var_os(ENV_LEDGER_PATH).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No configuration found; using defaults");
            Ok(BillingConfig::default())
        }
    }
}

/// Load configuration from environment variables
///
/// `STORELINK_LEDGER_PATH` is required; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `CommonError::Config` if the ledger path is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> CommonResult<BillingConfig> {
    let defaults = BillingConfig::default();

    let config = BillingConfig {
        reconnect: ReconnectConfig {
            base_delay_ms: env_parse(ENV_RECONNECT_BASE_DELAY_MS)?
                .unwrap_or(defaults.reconnect.base_delay_ms),
            max_delay_ms: env_parse(ENV_RECONNECT_MAX_DELAY_MS)?
                .unwrap_or(defaults.reconnect.max_delay_ms),
        },
        ledger: LedgerConfig {
            path: PathBuf::from(env_var(ENV_LEDGER_PATH)?),
            pool_size: env_parse(ENV_LEDGER_POOL_SIZE)?.unwrap_or(defaults.ledger.pool_size),
        },
        logging: LoggingConfig {
            level: std::env::var(ENV_LOG_LEVEL).unwrap_or(defaults.logging.level),
            json: env_bool(ENV_LOG_JSON, defaults.logging.json),
        },
        finish_transactions: env_bool(ENV_FINISH_TRANSACTIONS, defaults.finish_transactions),
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// TOML and JSON are supported, detected by file extension.
///
/// # Errors
/// Returns `CommonError::Config` if no file is found, and
/// `CommonError::Serialization` if the file cannot be parsed.
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<BillingConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CommonError::config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration by file extension (`.toml` or `.json`)
fn parse_config(contents: &str, path: &Path) -> CommonResult<BillingConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    let parsed: Result<BillingConfig, InfraError> = match extension {
        "toml" => toml::from_str(contents).map_err(InfraError::from),
        "json" => serde_json::from_str(contents).map_err(InfraError::from),
        other => Err(InfraError::Config(format!("Unsupported config format: {}", other))),
    };
    Ok(parsed?)
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        if let Some(parent) = cwd.parent() {
            roots.push(parent.to_path_buf());
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    probe_in(&roots)
}

fn probe_in(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.is_file())
}

/// Get required environment variable
fn env_var(key: &str) -> CommonResult<String> {
    std::env::var(key).map_err(|_| {
        CommonError::config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> CommonResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CommonError::config_field(key, format!("invalid value '{}': {}", raw, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 7] = [
        ENV_LEDGER_PATH,
        ENV_LEDGER_POOL_SIZE,
        ENV_RECONNECT_BASE_DELAY_MS,
        ENV_RECONNECT_MAX_DELAY_MS,
        ENV_LOG_LEVEL,
        ENV_LOG_JSON,
        ENV_FINISH_TRANSACTIONS,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn env_bool_parsing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());

        std::env::set_var("STORELINK_TEST_BOOL_YES", "YES");
        std::env::set_var("STORELINK_TEST_BOOL_OFF", "off");
        std::env::remove_var("STORELINK_TEST_BOOL_MISSING");

        assert!(env_bool("STORELINK_TEST_BOOL_YES", false));
        assert!(!env_bool("STORELINK_TEST_BOOL_OFF", true));
        assert!(env_bool("STORELINK_TEST_BOOL_MISSING", true));

        std::env::remove_var("STORELINK_TEST_BOOL_YES");
        std::env::remove_var("STORELINK_TEST_BOOL_OFF");
    }

    #[test]
    fn load_from_env_uses_defaults_for_optional_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        clear_env();
        std::env::set_var(ENV_LEDGER_PATH, "/tmp/storelink-test.db");
        std::env::set_var(ENV_RECONNECT_BASE_DELAY_MS, "250");
        std::env::set_var(ENV_FINISH_TRANSACTIONS, "false");

        let config = load_from_env().expect("env config loads");
        clear_env();

        assert_eq!(config.ledger.path, PathBuf::from("/tmp/storelink-test.db"));
        assert_eq!(config.ledger.pool_size, LedgerConfig::default().pool_size);
        assert_eq!(config.reconnect.base_delay_ms, 250);
        assert_eq!(config.reconnect.max_delay_ms, ReconnectConfig::default().max_delay_ms);
        assert!(!config.finish_transactions);
        assert!(!config.logging.json);
    }

    #[test]
    fn load_from_env_requires_ledger_path() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, CommonError::Config { .. }));
        assert!(err.to_string().contains(ENV_LEDGER_PATH));
    }

    #[test]
    fn load_from_env_rejects_invalid_number() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        clear_env();
        std::env::set_var(ENV_LEDGER_PATH, "/tmp/storelink-test.db");
        std::env::set_var(ENV_LEDGER_POOL_SIZE, "not-a-number");

        let err = load_from_env().unwrap_err();
        clear_env();

        assert!(err.to_string().contains(ENV_LEDGER_POOL_SIZE));
    }

    #[test]
    fn load_from_env_validates_backoff_bounds() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        clear_env();
        std::env::set_var(ENV_LEDGER_PATH, "/tmp/storelink-test.db");
        std::env::set_var(ENV_RECONNECT_BASE_DELAY_MS, "5000");
        std::env::set_var(ENV_RECONNECT_MAX_DELAY_MS, "1000");

        let result = load_from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn parse_config_toml() {
        let toml_content = r#"
finish_transactions = false

[reconnect]
base_delay_ms = 500
max_delay_ms = 60000

[ledger]
path = "data/ledger.db"
"#;

        let config = parse_config(toml_content, Path::new("storelink.toml")).unwrap();
        assert_eq!(config.reconnect.base_delay_ms, 500);
        assert_eq!(config.ledger.path, PathBuf::from("data/ledger.db"));
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(!config.finish_transactions);
    }

    #[test]
    fn parse_config_json() {
        let json_content = r#"{ "logging": { "level": "debug", "json": true } }"#;

        let config = parse_config(json_content, Path::new("storelink.json")).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn parse_config_unsupported_format() {
        let err = parse_config("key: value", Path::new("storelink.yaml")).unwrap_err();
        assert!(matches!(err, CommonError::Config { .. }));
    }

    #[test]
    fn parse_config_invalid_json_is_serialization_error() {
        let err = parse_config("{ not json", Path::new("storelink.json")).unwrap_err();
        assert!(matches!(err, CommonError::Serialization { .. }));
    }

    #[test]
    fn probe_prefers_toml_then_nested_config_dir() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::create_dir_all(second.path().join("config")).unwrap();
        std::fs::write(second.path().join("config/storelink.json"), "{}").unwrap();

        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(probe_in(&roots), Some(second.path().join("config/storelink.json")));

        std::fs::write(first.path().join("storelink.toml"), "").unwrap();
        assert_eq!(probe_in(&roots), Some(first.path().join("storelink.toml")));
    }

    #[test]
    fn probe_returns_none_when_nothing_exists() {
        let empty = TempDir::new().unwrap();
        assert_eq!(probe_in(&[empty.path().to_path_buf()]), None);
    }
}
