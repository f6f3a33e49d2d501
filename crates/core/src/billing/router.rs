//! Purchase update routing
//!
//! Turns raw purchase updates from the billing client into transactions and
//! hands them, or a single failure, to the registered listener.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use storelink_common::SerialExecutor;
use storelink_domain::{
    BillingError, BillingResult, ProductType, PurchaseType, RawPurchase, Transaction,
};
use tracing::{debug, warn};

use super::classifier::{classify_result, ResponseClass};
use super::launch::PendingLaunch;
use super::ports::{PurchasesUpdateListener, PurchasesUpdatedListener};

pub struct PurchaseUpdateRouter {
    executor: Arc<SerialExecutor>,
    listener: Mutex<Option<Arc<dyn PurchasesUpdateListener>>>,
    /// Launch metadata keyed by product id until its update arrives or an
    /// update fails
    pending_launches: Mutex<HashMap<String, PendingLaunch>>,
    me: Weak<Self>,
}

impl PurchaseUpdateRouter {
    pub fn new(executor: Arc<SerialExecutor>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            executor,
            listener: Mutex::new(None),
            pending_launches: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn PurchasesUpdateListener>>) {
        *self.listener.lock() = listener;
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn record_launch<S: Into<String>>(&self, product_id: S, pending: PendingLaunch) {
        self.pending_launches.lock().insert(product_id.into(), pending);
    }

    pub fn pending_launches(&self) -> usize {
        self.pending_launches.lock().len()
    }

    /// Report a purchase flow that failed before the store showed any UI
    ///
    /// Must be called on the serialization point.
    pub fn fail_launch(&self, product_id: &str, error: BillingError) {
        self.pending_launches.lock().remove(product_id);
        match self.current_listener() {
            Some(listener) => listener.on_purchases_failed_to_update(error),
            None => {
                warn!(product_id, error = %error, "purchase flow failed with no listener attached")
            }
        }
    }

    /// Deliver one update to the listener; runs on the serialization point
    ///
    /// The store runs one purchase flow at a time, so a failed update drops
    /// all pending launch metadata.
    pub fn route_update(&self, result: BillingResult, purchases: Option<Vec<RawPurchase>>) {
        let class = classify_result(&result);
        let purchases = purchases.filter(|purchases| !purchases.is_empty());
        if !class.is_success() || purchases.is_none() {
            self.pending_launches.lock().clear();
        }

        let Some(listener) = self.current_listener() else {
            warn!(
                response = %result.response,
                "purchase update arrived with no listener attached; discarding"
            );
            return;
        };

        match (class, purchases) {
            (ResponseClass::Success, Some(purchases)) => {
                let transactions = self.normalize(&purchases);
                debug!(count = transactions.len(), "purchases updated");
                listener.on_purchases_updated(transactions);
            }
            (ResponseClass::Success, None) => {
                warn!("purchase update reported OK without purchases");
                listener.on_purchases_failed_to_update(BillingError::null_purchase_list());
            }
            (ResponseClass::Recoverable | ResponseClass::Terminal(_), _) => {
                let error = result.to_error("Error updating purchases");
                debug!(response = %result.response, kind = ?error.kind, "purchase update failed");
                listener.on_purchases_failed_to_update(error);
            }
        }
    }

    fn current_listener(&self) -> Option<Arc<dyn PurchasesUpdateListener>> {
        self.listener.lock().clone()
    }

    fn normalize(&self, purchases: &[RawPurchase]) -> Vec<Transaction> {
        let mut pending = self.pending_launches.lock();
        let mut matched = HashSet::new();

        let transactions = purchases
            .iter()
            .map(|raw| {
                let launch = raw
                    .product_ids
                    .iter()
                    .find_map(|id| pending.get(id).map(|launch| (id.clone(), launch.clone())));

                match launch {
                    Some((product_id, launch)) => {
                        matched.insert(product_id);
                        Transaction::from_purchase(
                            raw,
                            launch.product_type,
                            PurchaseType::FromPurchase,
                            launch.offering_context,
                            launch.subscription_option_id,
                        )
                    }
                    None => {
                        let product_type = if raw.is_auto_renewing {
                            ProductType::Subscription
                        } else {
                            ProductType::OneTime
                        };
                        Transaction::from_purchase(
                            raw,
                            product_type,
                            PurchaseType::FromPurchase,
                            None,
                            None,
                        )
                    }
                }
            })
            .collect();

        for product_id in matched {
            pending.remove(&product_id);
        }
        transactions
    }
}

impl PurchasesUpdatedListener for PurchaseUpdateRouter {
    fn on_purchases_updated(&self, result: BillingResult, purchases: Option<Vec<RawPurchase>>) {
        let Some(router) = self.me.upgrade() else {
            return;
        };
        self.executor.submit(move || router.route_update(result, purchases));
    }
}
