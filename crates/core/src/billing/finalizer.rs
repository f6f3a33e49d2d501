//! Transaction finalization (consume / acknowledge)

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use storelink_common::SerialExecutor;
use storelink_domain::{token_prefix, BillingError, Result, Transaction};
use tracing::{debug, info, warn};

use super::connection::ConnectionManager;
use super::queue::{CompletionHandler, QueuedOperation};
use crate::ledger::PostedTokenLedger;

/// Consumes one-time purchases and acknowledges subscriptions exactly once
///
/// The ledger short-circuits tokens that were already finalized. While a
/// store call for a token is in flight, further requests for that token wait
/// for its outcome instead of issuing a second call.
pub struct TransactionFinalizer {
    executor: Arc<SerialExecutor>,
    manager: Arc<ConnectionManager>,
    ledger: Arc<PostedTokenLedger>,
    in_flight: Mutex<HashMap<String, Vec<CompletionHandler>>>,
    me: Weak<Self>,
}

impl TransactionFinalizer {
    pub fn new(
        executor: Arc<SerialExecutor>,
        manager: Arc<ConnectionManager>,
        ledger: Arc<PostedTokenLedger>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            executor,
            manager,
            ledger,
            in_flight: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Finalize a transaction
    ///
    /// - already posted: success, no store call
    /// - pending: `PaymentPending` error, nothing recorded
    /// - acknowledged subscription or `should_consume == false`: recorded as
    ///   posted without a store call
    /// - otherwise acknowledge (subscriptions) or consume, then record
    pub fn finalize<F>(&self, transaction: &Transaction, should_consume: bool, on_complete: F)
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let Some(finalizer) = self.me.upgrade() else {
            return;
        };
        let token = transaction.purchase_token.clone();
        let is_subscription = transaction.is_subscription();
        let is_pending = transaction.is_pending();
        let is_acknowledged = transaction.is_acknowledged;

        self.executor.submit(move || {
            if finalizer.ledger.is_already_posted(&token) {
                debug!(token = %token_prefix(&token), "purchase already finalized");
                on_complete(Ok(token));
                return;
            }

            if is_pending {
                info!(token = %token_prefix(&token), "purchase is pending; not finalizing");
                on_complete(Err(BillingError::payment_pending()));
                return;
            }

            if (is_subscription && is_acknowledged) || !should_consume {
                debug!(
                    token = %token_prefix(&token),
                    is_acknowledged,
                    should_consume,
                    "skipping store call; recording purchase as posted"
                );
                finalizer.ledger.mark_posted(&token);
                on_complete(Ok(token));
                return;
            }

            finalizer.finalize_token_now(token, is_subscription, Box::new(on_complete));
        });
    }

    /// Consume (one-time) or acknowledge (subscription) a purchase token
    pub fn finalize_token<F>(&self, purchase_token: String, is_subscription: bool, on_complete: F)
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let Some(finalizer) = self.me.upgrade() else {
            return;
        };
        self.executor.submit(move || {
            if finalizer.ledger.is_already_posted(&purchase_token) {
                debug!(token = %token_prefix(&purchase_token), "purchase already finalized");
                on_complete(Ok(purchase_token));
                return;
            }
            finalizer.finalize_token_now(purchase_token, is_subscription, Box::new(on_complete));
        });
    }

    /// Tokens with a store call in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn finalize_token_now(
        self: &Arc<Self>,
        purchase_token: String,
        is_subscription: bool,
        on_complete: CompletionHandler,
    ) {
        {
            let mut in_flight = self.in_flight.lock();
            if let Some(waiters) = in_flight.get_mut(&purchase_token) {
                debug!(
                    token = %token_prefix(&purchase_token),
                    "finalization already in flight; waiting"
                );
                waiters.push(on_complete);
                return;
            }
            in_flight.insert(purchase_token.clone(), vec![on_complete]);
        }

        let finalizer = Arc::clone(self);
        let token = purchase_token.clone();
        self.manager.dispatch(QueuedOperation::ConsumeOrAcknowledge {
            purchase_token,
            is_subscription,
            on_complete: Box::new(move |result| finalizer.complete(&token, result)),
        });
    }

    fn complete(&self, purchase_token: &str, result: Result<String>) {
        match &result {
            Ok(_) => self.ledger.mark_posted(purchase_token),
            Err(err) => {
                warn!(token = %token_prefix(purchase_token), error = %err, "finalization failed")
            }
        }

        let waiters = self.in_flight.lock().remove(purchase_token).unwrap_or_default();
        for waiter in waiters {
            waiter(result.clone());
        }
    }
}
