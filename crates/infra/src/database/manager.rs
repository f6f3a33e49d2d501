//! Pooled sqlite access for the posted-token ledger.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use storelink_common::CommonResult;
use storelink_domain::LedgerConfig;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Owns the ledger's connection pool; shared behind an `Arc` by every
/// repository built on it.
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Pool over `db_path`, creating the file and its parent directories.
    /// The schema is not touched; see [`DbManager::open`].
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> CommonResult<Self> {
        let path = db_path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(InfraError::from)?;
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(InfraError::from)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "ledger database opened"
        );

        Ok(Self { pool, path })
    }

    /// Pool plus schema, as used at startup.
    pub fn open(config: &LedgerConfig) -> CommonResult<Self> {
        let manager = Self::new(&config.path, config.pool_size)?;
        manager.run_migrations()?;
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn get_connection(&self) -> CommonResult<SqliteConnection> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }

    /// Idempotent: every statement in the schema is `IF NOT EXISTS`.
    pub fn run_migrations(&self) -> CommonResult<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Round-trips a trivial query through a pooled connection.
    pub fn health_check(&self) -> CommonResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(InfraError::from)?;
        Ok(())
    }
}

fn create_schema(conn: &SqliteConnection) -> Result<(), InfraError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at)
         VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn migrations_create_schema_version() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("ledger.db");

        let manager = DbManager::new(&db_path, 2).expect("manager created");
        manager.run_migrations().expect("migrations run");
        manager.run_migrations().expect("migrations are idempotent");

        let conn = manager.get_connection().expect("connection acquired");
        let version: i32 =
            conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn health_check_succeeds_for_valid_database() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager =
            DbManager::new(temp_dir.path().join("ledger.db"), 2).expect("manager created");

        manager.health_check().expect("health check passed");
    }

    #[test]
    fn open_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let config =
            LedgerConfig { path: temp_dir.path().join("nested/dir/ledger.db"), pool_size: 1 };

        let manager = DbManager::open(&config).expect("ledger opened");

        assert!(manager.path().exists());
        assert_eq!(manager.pool().max_size(), 1);
    }

    #[test]
    fn zero_pool_size_is_clamped() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager =
            DbManager::new(temp_dir.path().join("ledger.db"), 0).expect("manager created");
        assert_eq!(manager.pool().max_size(), 1);
    }
}
