//! Application-facing billing facade

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use storelink_common::{CommonResult, SerialExecutor};
use storelink_domain::constants::MSG_NO_HISTORY_FOR_PRODUCT;
use storelink_domain::{
    BillingConfig, BillingError, ErrorKind, ProductDetails, ProductType, PurchaseType,
    RawPurchase, Result, Transaction,
};
use tracing::{debug, info};

use super::connection::{ConnectionManager, ConnectionState};
use super::finalizer::TransactionFinalizer;
use super::launch::LaunchRequest;
use super::ports::{BillingClientFactory, DelayScheduler, PurchasesUpdateListener};
use super::queue::QueuedOperation;
use super::reconnect::ReconnectionPolicy;
use super::router::PurchaseUpdateRouter;
use crate::ledger::{PostedTokenLedger, PostedTokenStore};

/// Store connection and purchase pipeline
///
/// All collaborators share one serialization point. Every method may be
/// called from any thread; continuations run on the serialization point.
pub struct BillingWrapper {
    manager: Arc<ConnectionManager>,
    router: Arc<PurchaseUpdateRouter>,
    finalizer: Arc<TransactionFinalizer>,
    finish_transactions: bool,
}

impl BillingWrapper {
    pub fn new(
        factory: Arc<dyn BillingClientFactory>,
        scheduler: Arc<dyn DelayScheduler>,
        token_store: Arc<dyn PostedTokenStore>,
        config: &BillingConfig,
    ) -> CommonResult<Self> {
        let policy = ReconnectionPolicy::from_config(&config.reconnect)?;
        let executor = Arc::new(SerialExecutor::new("billing"));
        let router = PurchaseUpdateRouter::new(Arc::clone(&executor));
        let manager = ConnectionManager::new(
            Arc::clone(&executor),
            factory,
            router.clone(),
            scheduler,
            policy,
        );
        let ledger = Arc::new(PostedTokenLedger::new(token_store));
        let finalizer = TransactionFinalizer::new(executor, Arc::clone(&manager), ledger);

        Ok(Self { manager, router, finalizer, finish_transactions: config.finish_transactions })
    }

    /// Attach (and connect) or detach (and close)
    pub fn set_listener(&self, listener: Option<Arc<dyn PurchasesUpdateListener>>) {
        match listener {
            Some(listener) => {
                self.router.set_listener(Some(listener));
                self.manager.connect();
            }
            None => self.close(),
        }
    }

    /// Pre-warm the connection
    pub fn start_connection(&self) {
        self.manager.connect();
    }

    /// Close the connection, failing queued requests, and drop the listener
    pub fn close(&self) {
        info!("closing billing wrapper");
        self.router.set_listener(None);
        self.manager.close();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_ready()
    }

    pub fn query_product_details<R, E>(
        &self,
        product_type: ProductType,
        product_ids: Vec<String>,
        on_receive: R,
        on_error: E,
    ) where
        R: FnOnce(Vec<ProductDetails>) + Send + 'static,
        E: FnOnce(BillingError) + Send + 'static,
    {
        if product_ids.is_empty() {
            debug!(%product_type, "no product ids requested");
            on_receive(Vec::new());
            return;
        }

        self.manager.dispatch(QueuedOperation::QueryProductDetails {
            product_type,
            product_ids,
            on_receive: Box::new(on_receive),
            on_error: Box::new(on_error),
        });
    }

    /// Launch the store purchase UI
    ///
    /// The outcome arrives through the listener, including launch failures.
    pub fn launch_purchase_flow(&self, request: LaunchRequest) {
        let product_id = request.product_id().to_string();
        info!(product_id = %product_id, "launching purchase flow");
        self.router.record_launch(product_id.clone(), request.pending_context());

        let router = Arc::clone(&self.router);
        self.manager.dispatch(QueuedOperation::LaunchPurchaseFlow {
            request,
            on_error: Box::new(move |error| router.fail_launch(&product_id, error)),
        });
    }

    pub fn consume_purchase<F>(&self, purchase_token: String, on_complete: F)
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        self.finalizer.finalize_token(purchase_token, false, on_complete);
    }

    pub fn acknowledge_purchase<F>(&self, purchase_token: String, on_complete: F)
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        self.finalizer.finalize_token(purchase_token, true, on_complete);
    }

    /// Finalize a transaction once the backend has accepted it
    ///
    /// With `finish_transactions` disabled the store is never called; the
    /// token is only recorded.
    pub fn finalize_and_save<F>(
        &self,
        should_consume: bool,
        transaction: &Transaction,
        on_complete: F,
    ) where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let should_consume = should_consume && self.finish_transactions;
        self.finalizer.finalize(transaction, should_consume, on_complete);
    }

    /// Active purchases for both product types, keyed by purchase token
    ///
    /// Subscriptions are queried first; the first failure is reported once
    /// and stops the query.
    pub fn query_active_purchases<S, E>(&self, app_user_id: &str, on_success: S, on_error: E)
    where
        S: FnOnce(HashMap<String, Transaction>) + Send + 'static,
        E: FnOnce(BillingError) + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        let user = app_user_id.to_string();
        let on_error: Box<dyn FnOnce(BillingError) + Send> = Box::new(on_error);

        let (first_error, second_error) = split_error_handler(on_error);
        self.manager.dispatch(QueuedOperation::QueryPurchases {
            app_user_id: app_user_id.to_string(),
            product_type: ProductType::Subscription,
            on_success: Box::new(move |subscriptions| {
                let mut active = restored(ProductType::Subscription, subscriptions);
                manager.dispatch(QueuedOperation::QueryPurchases {
                    app_user_id: user,
                    product_type: ProductType::OneTime,
                    on_success: Box::new(move |one_time| {
                        active.extend(restored(ProductType::OneTime, one_time));
                        on_success(active);
                    }),
                    on_error: second_error,
                });
            }),
            on_error: first_error,
        });
    }

    /// Purchase history for both product types
    pub fn query_purchase_history<S, E>(&self, app_user_id: &str, on_success: S, on_error: E)
    where
        S: FnOnce(Vec<Transaction>) + Send + 'static,
        E: FnOnce(BillingError) + Send + 'static,
    {
        debug!(app_user_id, "querying purchase history");
        let manager = Arc::clone(&self.manager);
        let on_error: Box<dyn FnOnce(BillingError) + Send> = Box::new(on_error);

        let (first_error, second_error) = split_error_handler(on_error);
        self.manager.dispatch(QueuedOperation::QueryPurchaseHistory {
            product_type: ProductType::Subscription,
            on_success: Box::new(move |subscription_records| {
                let mut history: Vec<Transaction> = subscription_records
                    .iter()
                    .map(|record| {
                        Transaction::from_history_record(record, ProductType::Subscription)
                    })
                    .collect();
                manager.dispatch(QueuedOperation::QueryPurchaseHistory {
                    product_type: ProductType::OneTime,
                    on_success: Box::new(move |one_time_records| {
                        history.extend(one_time_records.iter().map(|record| {
                            Transaction::from_history_record(record, ProductType::OneTime)
                        }));
                        on_success(history);
                    }),
                    on_error: second_error,
                });
            }),
            on_error: first_error,
        });
    }

    /// The history record for one product
    ///
    /// Fails with `PurchaseNotAllowed` when the product has never been bought.
    pub fn find_purchase_in_purchase_history<S, E>(
        &self,
        app_user_id: &str,
        product_type: ProductType,
        product_id: &str,
        on_success: S,
        on_error: E,
    ) where
        S: FnOnce(Transaction) + Send + 'static,
        E: FnOnce(BillingError) + Send + 'static,
    {
        debug!(app_user_id, product_id, %product_type, "searching purchase history");
        let product_id = product_id.to_string();
        let on_error: Box<dyn FnOnce(BillingError) + Send> = Box::new(on_error);
        let (found_error, query_error) = split_error_handler(on_error);

        self.manager.dispatch(QueuedOperation::QueryPurchaseHistory {
            product_type,
            on_success: Box::new(move |records| {
                let record = records.iter().find(|record| record.product_ids.contains(&product_id));
                match record {
                    Some(record) => {
                        on_success(Transaction::from_history_record(record, product_type))
                    }
                    None => found_error(BillingError::new(
                        ErrorKind::PurchaseNotAllowed,
                        format!("{MSG_NO_HISTORY_FOR_PRODUCT}: {product_id}"),
                    )),
                }
            }),
            on_error: query_error,
        });
    }
}

impl Drop for BillingWrapper {
    fn drop(&mut self) {
        if self.manager.state() != ConnectionState::Closed {
            self.manager.close();
        }
    }
}

fn restored(
    product_type: ProductType,
    purchases: Vec<RawPurchase>,
) -> HashMap<String, Transaction> {
    purchases
        .iter()
        .map(|raw| {
            let transaction = Transaction::from_purchase(
                raw,
                product_type,
                PurchaseType::FromRestore,
                None,
                None,
            );
            (transaction.purchase_token.clone(), transaction)
        })
        .collect()
}

type SharedErrorHandler = Box<dyn FnOnce(BillingError) + Send>;

/// Split one error continuation between two stages; whichever stage fails
/// first gets it, and the other becomes a no-op.
fn split_error_handler(handler: SharedErrorHandler) -> (SharedErrorHandler, SharedErrorHandler) {
    let slot = Arc::new(Mutex::new(Some(handler)));
    let second = Arc::clone(&slot);
    let take = |slot: Arc<Mutex<Option<SharedErrorHandler>>>| -> SharedErrorHandler {
        Box::new(move |error| {
            let handler = slot.lock().take();
            if let Some(handler) = handler {
                handler(error);
            }
        })
    };
    (take(slot), take(second))
}
