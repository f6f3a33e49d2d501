//! Billing ports - interfaces to the external billing service and host
//!
//! The billing client is callback based: every request takes a completion
//! that the service invokes exactly once, asynchronously, on a thread of its
//! choosing. Implementations must not assume the completion runs on the
//! caller's thread.

use std::sync::Arc;
use std::time::Duration;

use storelink_domain::{
    ActivityHandle, BillingError, BillingFlowParams, BillingResult, ProductDetails, ProductType,
    RawPurchase, RawPurchaseHistoryRecord, Transaction,
};

/// Completion for a product details query
pub type ProductDetailsCallback = Box<dyn FnOnce(BillingResult, Vec<ProductDetails>) + Send>;

/// Completion for an active purchases query
pub type PurchasesCallback = Box<dyn FnOnce(BillingResult, Vec<RawPurchase>) + Send>;

/// Completion for a purchase history query
pub type PurchaseHistoryCallback =
    Box<dyn FnOnce(BillingResult, Vec<RawPurchaseHistoryRecord>) + Send>;

/// Completion for consume / acknowledge; carries the purchase token back
pub type TokenCallback = Box<dyn FnOnce(BillingResult, String) + Send>;

/// Receives connection lifecycle events for one `start_connection` call
pub trait BillingClientStateListener: Send + Sync {
    /// Called exactly once per `start_connection`
    fn on_billing_setup_finished(&self, result: BillingResult);

    /// The service dropped an established connection
    fn on_billing_service_disconnected(&self);
}

/// Receives purchase updates pushed by the billing service
///
/// Delivery is at-least-once: the same purchase may arrive more than once.
/// `purchases` is `None` when the service reports no list at all.
pub trait PurchasesUpdatedListener: Send + Sync {
    fn on_purchases_updated(&self, result: BillingResult, purchases: Option<Vec<RawPurchase>>);
}

/// Handle to the external billing service
pub trait BillingClient: Send + Sync {
    /// Synchronous readiness probe; may change at any time
    fn is_ready(&self) -> bool;

    /// Start connecting; `listener.on_billing_setup_finished` fires once
    fn start_connection(&self, listener: Arc<dyn BillingClientStateListener>);

    /// Synchronous teardown
    fn end_connection(&self);

    fn query_product_details(
        &self,
        product_type: ProductType,
        product_ids: Vec<String>,
        callback: ProductDetailsCallback,
    );

    fn query_purchases(&self, product_type: ProductType, callback: PurchasesCallback);

    fn query_purchase_history(&self, product_type: ProductType, callback: PurchaseHistoryCallback);

    /// Show the store's purchase UI; the outcome arrives as a purchase update
    ///
    /// The returned result only reports whether the flow could be launched.
    fn launch_billing_flow(&self, activity: &ActivityHandle, params: &BillingFlowParams)
        -> BillingResult;

    fn consume(&self, purchase_token: String, callback: TokenCallback);

    fn acknowledge(&self, purchase_token: String, callback: TokenCallback);
}

/// Builds billing clients
///
/// Called once per fresh connection; the previous client, if any, has already
/// been ended.
pub trait BillingClientFactory: Send + Sync {
    fn build(&self, updates: Arc<dyn PurchasesUpdatedListener>) -> Arc<dyn BillingClient>;
}

/// Runs a job after a delay
///
/// Used for reconnection backoff. Implementations may run the job on any
/// thread.
pub trait DelayScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, job: Box<dyn FnOnce() + Send>);
}

/// Application-facing receiver of purchase outcomes
///
/// Both methods are invoked on the billing serialization point.
pub trait PurchasesUpdateListener: Send + Sync {
    fn on_purchases_updated(&self, transactions: Vec<Transaction>);

    fn on_purchases_failed_to_update(&self, error: BillingError);
}
