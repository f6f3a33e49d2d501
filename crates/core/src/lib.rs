//! # Storelink Core
//!
//! Business logic for the store connection and purchase pipeline - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the billing client, delayed scheduling and
//!   posted-token persistence
//! - The connection state machine, deferred operation queue and
//!   reconnection policy
//! - Purchase update routing and transaction finalization
//!
//! ## Architecture Principles
//! - Only depends on `storelink-common` and `storelink-domain`
//! - No database, runtime or platform code
//! - All external collaborators via traits

pub mod billing;
pub mod ledger;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use billing::{
    classify, BillingClient, BillingClientFactory, BillingWrapper, ConnectionManager,
    ConnectionState, DelayScheduler, LaunchRequest, PurchaseUpdateRouter,
    PurchasesUpdateListener, ReconnectionPolicy, ResponseClass, TransactionFinalizer,
};
pub use ledger::{InMemoryTokenStore, PostedTokenLedger, PostedTokenStore};
