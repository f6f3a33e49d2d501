//! Shared helpers for `storelink-infra` integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use storelink_infra::database::{DbManager, SqlitePostedTokenStore};
use tempfile::TempDir;

/// Temporary ledger database that keeps its directory alive for the
/// duration of a test.
pub struct TestLedger {
    pub manager: Arc<DbManager>,
    temp_dir: TempDir,
}

impl TestLedger {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("ledger.db"), 2)
            .expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), temp_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.manager.path().to_path_buf()
    }

    pub fn store(&self) -> Arc<SqlitePostedTokenStore> {
        Arc::new(SqlitePostedTokenStore::new(Arc::clone(&self.manager)))
    }

    /// A second, independent pool over the same file
    pub fn reopen(&self) -> Arc<SqlitePostedTokenStore> {
        let manager = DbManager::new(self.path(), 1).expect("db manager should reopen");
        Arc::new(SqlitePostedTokenStore::new(Arc::new(manager)))
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
