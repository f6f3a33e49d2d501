//! Wiring of the billing wrapper onto the SQLite ledger and tokio timers.

use std::sync::Arc;

use storelink_common::CommonResult;
use storelink_core::{BillingClientFactory, BillingWrapper};
use storelink_domain::BillingConfig;
use tokio::runtime::Handle;
use tracing::info;

use crate::database::{DbManager, SqlitePostedTokenStore};
use crate::scheduling::TokioDelayScheduler;

/// A wrapper together with the adapters it was built on
pub struct BillingRuntime {
    pub wrapper: BillingWrapper,
    pub db: Arc<DbManager>,
    pub scheduler: Arc<TokioDelayScheduler>,
}

/// Open the posted-token ledger and build a [`BillingWrapper`] whose
/// reconnect timers run on `handle`.
///
/// # Errors
/// Fails when the configuration is invalid or the ledger database cannot be
/// opened and migrated.
pub fn build_billing_runtime(
    config: &BillingConfig,
    factory: Arc<dyn BillingClientFactory>,
    handle: Handle,
) -> CommonResult<BillingRuntime> {
    config.validate()?;

    let db = Arc::new(DbManager::open(&config.ledger)?);
    let token_store = Arc::new(SqlitePostedTokenStore::new(Arc::clone(&db)));
    let scheduler = Arc::new(TokioDelayScheduler::new(handle));

    let wrapper = BillingWrapper::new(factory, scheduler.clone(), token_store, config)?;
    info!(
        ledger = %db.path().display(),
        finish_transactions = config.finish_transactions,
        "billing runtime ready"
    );

    Ok(BillingRuntime { wrapper, db, scheduler })
}
