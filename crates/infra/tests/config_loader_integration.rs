//! Integration tests for the configuration loader
//!
//! Tests loading configuration from files on disk.

use std::path::PathBuf;

use storelink_common::CommonError;
use storelink_infra::config;
use tempfile::TempDir;

#[test]
fn load_config_from_toml_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("storelink.toml");
    std::fs::write(
        &path,
        r#"
finish_transactions = true

[reconnect]
base_delay_ms = 2000
max_delay_ms = 120000

[ledger]
path = "/var/lib/storelink/ledger.db"
pool_size = 4

[logging]
level = "storelink_core=debug"
json = true
"#,
    )
    .expect("config written");

    let config = config::load_from_file(Some(path)).expect("config loads");

    assert_eq!(config.reconnect.base_delay_ms, 2_000);
    assert_eq!(config.reconnect.max_delay_ms, 120_000);
    assert_eq!(config.ledger.path, PathBuf::from("/var/lib/storelink/ledger.db"));
    assert_eq!(config.ledger.pool_size, 4);
    assert_eq!(config.logging.level, "storelink_core=debug");
    assert!(config.logging.json);
    assert!(config.finish_transactions);
}

#[test]
fn load_config_from_json_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("storelink.json");
    std::fs::write(&path, r#"{ "finish_transactions": false, "ledger": { "pool_size": 1 } }"#)
        .expect("config written");

    let config = config::load_from_file(Some(path)).expect("config loads");

    assert!(!config.finish_transactions);
    assert_eq!(config.ledger.pool_size, 1);
    assert_eq!(config.reconnect.base_delay_ms, 1_000);
}

#[test]
fn invalid_bounds_in_file_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("storelink.toml");
    std::fs::write(&path, "[reconnect]\nbase_delay_ms = 0\n").expect("config written");

    let err = config::load_from_file(Some(path)).unwrap_err();
    assert!(matches!(err, CommonError::Config { .. }));
    assert!(err.to_string().contains("reconnect.base_delay_ms"));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = config::load_from_file(Some(PathBuf::from("/nonexistent/storelink.toml")))
        .unwrap_err();
    assert!(matches!(err, CommonError::Config { .. }));
}
