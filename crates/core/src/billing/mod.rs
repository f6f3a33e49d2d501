//! Store connection and purchase pipeline
//!
//! ```text
//! caller ──► BillingWrapper ──► ConnectionManager ──► BillingClient
//!                 │                   │   ▲                │
//!                 │      DeferredOperationQueue            │ callbacks
//!                 ▼                   ▼   │                ▼
//!        TransactionFinalizer   SerialExecutor ◄── PurchaseUpdateRouter
//!                 │                                        │
//!         PostedTokenLedger                   PurchasesUpdateListener
//! ```

pub mod classifier;
pub mod connection;
pub mod finalizer;
pub mod launch;
pub mod ports;
pub mod queue;
pub mod reconnect;
pub mod router;
pub mod wrapper;

pub use classifier::{classify, classify_result, ResponseClass};
pub use connection::{ConnectionManager, ConnectionState};
pub use finalizer::TransactionFinalizer;
pub use launch::{obfuscate_account_id, LaunchRequest, PendingLaunch};
pub use ports::{
    BillingClient, BillingClientFactory, BillingClientStateListener, DelayScheduler,
    PurchasesUpdateListener, PurchasesUpdatedListener,
};
pub use queue::{DeferredOperationQueue, QueuedOperation};
pub use reconnect::ReconnectionPolicy;
pub use router::PurchaseUpdateRouter;
pub use wrapper::BillingWrapper;
