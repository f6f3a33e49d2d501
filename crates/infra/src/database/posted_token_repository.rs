//! SQLite-backed posted-token store.
//!
//! Implements the `PostedTokenStore` port from `storelink-core`. Calls are
//! synchronous; the ledger consults the store from the billing serialization
//! point and keeps an in-memory cache in front of it.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use storelink_common::CommonResult;
use storelink_core::PostedTokenStore;
use storelink_domain::token_prefix;
use tracing::debug;

use super::manager::DbManager;
use crate::errors::InfraError;

/// Posted purchase tokens persisted in the `posted_tokens` table.
pub struct SqlitePostedTokenStore {
    db: Arc<DbManager>,
}

impl SqlitePostedTokenStore {
    /// Create a store over a migrated database.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Number of tokens recorded so far.
    pub fn count(&self) -> CommonResult<u64> {
        let conn = self.db.get_connection()?;
        Ok(count_tokens(&conn)?)
    }
}

impl PostedTokenStore for SqlitePostedTokenStore {
    fn is_posted(&self, purchase_token: &str) -> CommonResult<bool> {
        let conn = self.db.get_connection()?;
        Ok(query_token_exists(&conn, purchase_token)?)
    }

    fn mark_posted(&self, purchase_token: &str) -> CommonResult<()> {
        let conn = self.db.get_connection()?;
        let inserted = insert_token(&conn, purchase_token)?;
        debug!(token = %token_prefix(purchase_token), inserted, "posted token recorded");
        Ok(())
    }
}

// ============================================================================
// Synchronous SQL Operations
// ============================================================================

fn query_token_exists(conn: &Connection, purchase_token: &str) -> Result<bool, InfraError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM posted_tokens WHERE purchase_token = ?1",
            params![purchase_token],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Returns whether a new row was written
fn insert_token(conn: &Connection, purchase_token: &str) -> Result<bool, InfraError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO posted_tokens (purchase_token, posted_at)
         VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![purchase_token],
    )?;
    Ok(changed > 0)
}

fn count_tokens(conn: &Connection) -> Result<u64, InfraError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM posted_tokens", [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (SqlitePostedTokenStore, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = DbManager::new(temp_dir.path().join("ledger.db"), 2).expect("manager created");
        db.run_migrations().expect("migrations run");
        (SqlitePostedTokenStore::new(Arc::new(db)), temp_dir)
    }

    #[test]
    fn unknown_token_is_not_posted() {
        let (store, _dir) = store();
        assert!(!store.is_posted("never-seen").unwrap());
    }

    #[test]
    fn marking_twice_keeps_one_row() {
        let (store, _dir) = store();

        store.mark_posted("tok1").unwrap();
        store.mark_posted("tok1").unwrap();

        assert!(store.is_posted("tok1").unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn missing_table_surfaces_as_error() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = DbManager::new(temp_dir.path().join("ledger.db"), 1).expect("manager created");
        let store = SqlitePostedTokenStore::new(Arc::new(db));

        assert!(store.is_posted("tok1").is_err());
        assert!(store.mark_posted("tok1").is_err());
    }
}
