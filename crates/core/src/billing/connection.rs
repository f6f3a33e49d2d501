//! Connection manager - owns the billing client and its lifecycle
//!
//! Every state transition, queue mutation and continuation runs on the shared
//! [`SerialExecutor`]. Client callbacks arrive on arbitrary threads and are
//! re-submitted to the executor before they touch any state. The state lock
//! is only held for short bookkeeping sections, never across a call into the
//! billing client or a caller continuation.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use storelink_common::SerialExecutor;
use storelink_domain::{impl_store_codes, BillingError, BillingResponse, BillingResult};
use tracing::{debug, error, info, warn};

use super::classifier::classify_result;
use super::ports::{
    BillingClient, BillingClientFactory, BillingClientStateListener, DelayScheduler,
    PurchasesUpdatedListener, TokenCallback,
};
use super::queue::{fail_all, DeferredOperationQueue, QueuedOperation};
use super::reconnect::ReconnectionPolicy;

/// Lifecycle of the billing connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Closed,
}

impl_store_codes!(ConnectionState {
    Disconnected => "disconnected",
    Connecting => "connecting",
    Ready => "ready",
    Closed => "closed",
});

struct ManagerState {
    connection: ConnectionState,
    client: Option<Arc<dyn BillingClient>>,
    queue: DeferredOperationQueue,
    policy: ReconnectionPolicy,
    /// Bumped for every connect attempt and on close; callbacks carrying an
    /// older value are stale.
    generation: u64,
    retry_pending: bool,
}

enum OperationOutcome {
    Success,
    Requeue,
    Failed(BillingError),
}

fn operation_outcome(result: &BillingResult, context: &str) -> OperationOutcome {
    if result.is_ok() {
        OperationOutcome::Success
    } else if result.response == BillingResponse::ServiceDisconnected {
        OperationOutcome::Requeue
    } else {
        OperationOutcome::Failed(result.to_error(context))
    }
}

/// Connection state machine and request dispatcher
pub struct ConnectionManager {
    executor: Arc<SerialExecutor>,
    factory: Arc<dyn BillingClientFactory>,
    updates: Arc<dyn PurchasesUpdatedListener>,
    scheduler: Arc<dyn DelayScheduler>,
    state: Mutex<ManagerState>,
}

impl ConnectionManager {
    pub fn new(
        executor: Arc<SerialExecutor>,
        factory: Arc<dyn BillingClientFactory>,
        updates: Arc<dyn PurchasesUpdatedListener>,
        scheduler: Arc<dyn DelayScheduler>,
        policy: ReconnectionPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            executor,
            factory,
            updates,
            scheduler,
            state: Mutex::new(ManagerState {
                connection: ConnectionState::Disconnected,
                client: None,
                queue: DeferredOperationQueue::new(),
                policy,
                generation: 0,
                retry_pending: false,
            }),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    /// `Ready` and the client itself agrees
    pub fn is_ready(&self) -> bool {
        self.ready_client().is_some()
    }

    pub fn queued_operations(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Consecutive reconnect attempts since the last `Ready`
    pub fn reconnect_attempt(&self) -> u32 {
        self.state.lock().policy.attempt()
    }

    /// Start connecting unless a connection is ready or already in flight
    pub fn connect(self: &Arc<Self>) {
        self.serialized(|manager| manager.ensure_connection());
    }

    /// Execute now when ready, otherwise defer until the connection is ready
    pub fn dispatch(self: &Arc<Self>, operation: QueuedOperation) {
        self.serialized(move |manager| manager.dispatch_now(operation));
    }

    /// Tear down the connection and fail every deferred operation
    ///
    /// Runs synchronously when called outside the serialization point.
    /// Callbacks from the closed connection are ignored afterwards.
    pub fn close(self: &Arc<Self>) {
        self.serialized(|manager| manager.close_now());
    }

    fn serialized<F>(self: &Arc<Self>, job: F)
    where
        F: FnOnce(&Arc<Self>) + Send + 'static,
    {
        let manager = Arc::clone(self);
        self.executor.submit(move || job(&manager));
    }

    fn serialized_weak<F>(manager: &Weak<Self>, job: F)
    where
        F: FnOnce(&Arc<Self>) + Send + 'static,
    {
        match manager.upgrade() {
            Some(manager) => manager.serialized(job),
            None => debug!("connection manager dropped; ignoring billing callback"),
        }
    }

    fn ready_client(&self) -> Option<Arc<dyn BillingClient>> {
        let (connection, client) = {
            let state = self.state.lock();
            (state.connection, state.client.clone())
        };
        if connection != ConnectionState::Ready {
            return None;
        }
        client.filter(|client| client.is_ready())
    }

    fn dispatch_now(self: &Arc<Self>, operation: QueuedOperation) {
        if self.state.lock().queue.is_empty() {
            if let Some(client) = self.ready_client() {
                self.execute(operation, client);
                return;
            }
        }

        let name = operation.name();
        let rejected = {
            let mut state = self.state.lock();
            if state.connection == ConnectionState::Closed {
                state.queue.reopen();
            }
            state.queue.enqueue(operation).err()
        };
        if let Some(operation) = rejected {
            operation.fail(BillingError::connection_closed());
            return;
        }

        debug!(
            operation = name,
            queued = self.queued_operations(),
            "billing connection not ready; operation deferred"
        );
        self.ensure_connection();
    }

    fn ensure_connection(self: &Arc<Self>) {
        let (connection, client) = {
            let state = self.state.lock();
            (state.connection, state.client.clone())
        };

        match connection {
            ConnectionState::Connecting => debug!("billing connection attempt already in flight"),
            ConnectionState::Ready => {
                if client.is_some_and(|client| client.is_ready()) {
                    self.drain_queue();
                } else {
                    info!("billing client reports not ready; reconnecting");
                    self.start_attempt();
                }
            }
            ConnectionState::Disconnected | ConnectionState::Closed => self.start_attempt(),
        }
    }

    fn start_attempt(self: &Arc<Self>) {
        let existing = self.state.lock().client.clone();
        let client = match existing {
            Some(client) => client,
            None => {
                debug!("building billing client");
                self.factory.build(Arc::clone(&self.updates))
            }
        };

        let generation = {
            let mut state = self.state.lock();
            if state.connection == ConnectionState::Closed {
                state.queue.reopen();
            }
            state.client = Some(Arc::clone(&client));
            state.connection = ConnectionState::Connecting;
            state.retry_pending = false;
            state.generation += 1;
            state.generation
        };

        info!(generation, "connecting to billing service");
        let listener = Arc::new(AttemptListener { manager: Arc::downgrade(self), generation });
        client.start_connection(listener);
    }

    fn on_setup_finished(self: &Arc<Self>, generation: u64, result: BillingResult) {
        {
            let state = self.state.lock();
            if state.generation != generation || state.connection != ConnectionState::Connecting {
                debug!(
                    generation,
                    current = state.generation,
                    state = %state.connection,
                    "ignoring stale billing setup callback"
                );
                return;
            }
        }

        let class = classify_result(&result);
        if class.is_success() {
            let queued = {
                let mut state = self.state.lock();
                state.connection = ConnectionState::Ready;
                state.policy.reset();
                state.queue.len()
            };
            info!(generation, queued, "billing connection ready");
            self.drain_queue();
            return;
        }

        if self.state.lock().policy.should_retry(class) {
            warn!(
                response = %result.response,
                debug_message = result.debug_message.as_deref().unwrap_or_default(),
                "billing setup failed; retrying"
            );
            self.schedule_retry();
            return;
        }

        let error = result.to_error("Billing setup failed");
        let (client, pending) = {
            let mut state = self.state.lock();
            state.connection = ConnectionState::Disconnected;
            state.retry_pending = false;
            (state.client.take(), state.queue.drain_in_order())
        };
        error!(
            response = %result.response,
            kind = ?error.kind,
            failed = pending.len(),
            "billing setup failed permanently"
        );
        if let Some(client) = client {
            client.end_connection();
        }
        fail_all(pending, &error);
    }

    fn on_service_disconnected(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.state.lock();
            let live =
                matches!(state.connection, ConnectionState::Ready | ConnectionState::Connecting);
            if state.generation != generation || !live || state.retry_pending {
                debug!(generation, state = %state.connection, "ignoring stale disconnect callback");
                return;
            }
            // Invalidate the attempt so a late setup callback for it is ignored.
            state.generation += 1;
        }

        warn!("billing service disconnected");
        self.schedule_retry();
    }

    fn schedule_retry(self: &Arc<Self>) {
        let (delay, generation, attempt) = {
            let mut state = self.state.lock();
            state.connection = ConnectionState::Connecting;
            state.retry_pending = true;
            let delay = state.policy.next_delay();
            (delay, state.generation, state.policy.attempt())
        };

        info!(attempt, delay_ms = delay.as_millis() as u64, "scheduling billing reconnect");
        let manager = Arc::downgrade(self);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                Self::serialized_weak(&manager, move |manager| manager.retry_connect(generation));
            }),
        );
    }

    fn retry_connect(self: &Arc<Self>, generation: u64) {
        let proceed = {
            let state = self.state.lock();
            state.retry_pending
                && state.generation == generation
                && state.connection == ConnectionState::Connecting
        };
        if !proceed {
            debug!(generation, "scheduled reconnect superseded");
            return;
        }
        self.start_attempt();
    }

    fn drain_queue(self: &Arc<Self>) {
        loop {
            let (client, operation) = {
                let mut state = self.state.lock();
                if state.connection != ConnectionState::Ready {
                    return;
                }
                let Some(client) = state.client.clone() else {
                    return;
                };
                let Some(operation) = state.queue.pop_front() else {
                    return;
                };
                (client, operation)
            };

            if !client.is_ready() {
                let rejected = self.state.lock().queue.push_front(operation).err();
                if let Some(operation) = rejected {
                    operation.fail(BillingError::connection_closed());
                }
                info!("billing client stopped being ready while draining; reconnecting");
                self.start_attempt();
                return;
            }

            self.execute(operation, client);
        }
    }

    /// Put an operation whose request hit a dropped connection back in line
    fn requeue(self: &Arc<Self>, operation: QueuedOperation) {
        let name = operation.name();
        let (rejected, was_ready) = {
            let mut state = self.state.lock();
            let was_ready = state.connection == ConnectionState::Ready && !state.retry_pending;
            if was_ready {
                state.generation += 1;
            }
            (state.queue.enqueue(operation).err(), was_ready)
        };
        if let Some(operation) = rejected {
            operation.fail(BillingError::connection_closed());
            return;
        }

        warn!(
            operation = name,
            "billing service disconnected during request; retrying after reconnect"
        );
        if was_ready {
            self.schedule_retry();
        } else {
            self.ensure_connection();
        }
    }

    fn execute(self: &Arc<Self>, operation: QueuedOperation, client: Arc<dyn BillingClient>) {
        debug!(operation = operation.name(), "executing billing operation");
        let manager = Arc::downgrade(self);

        match operation {
            QueuedOperation::QueryProductDetails {
                product_type,
                product_ids,
                on_receive,
                on_error,
            } => {
                let ids = product_ids.clone();
                client.query_product_details(
                    product_type,
                    product_ids,
                    Box::new(move |result, details| {
                        Self::serialized_weak(&manager, move |manager| {
                            match operation_outcome(&result, "Error fetching product details") {
                                OperationOutcome::Success => on_receive(details),
                                OperationOutcome::Requeue => {
                                    manager.requeue(QueuedOperation::QueryProductDetails {
                                        product_type,
                                        product_ids: ids,
                                        on_receive,
                                        on_error,
                                    });
                                }
                                OperationOutcome::Failed(err) => on_error(err),
                            }
                        });
                    }),
                );
            }
            QueuedOperation::QueryPurchases { app_user_id, product_type, on_success, on_error } => {
                debug!(%product_type, app_user_id = %app_user_id, "querying purchases");
                client.query_purchases(
                    product_type,
                    Box::new(move |result, purchases| {
                        Self::serialized_weak(&manager, move |manager| {
                            match operation_outcome(&result, "Error querying purchases") {
                                OperationOutcome::Success => on_success(purchases),
                                OperationOutcome::Requeue => {
                                    manager.requeue(QueuedOperation::QueryPurchases {
                                        app_user_id,
                                        product_type,
                                        on_success,
                                        on_error,
                                    });
                                }
                                OperationOutcome::Failed(err) => on_error(err),
                            }
                        });
                    }),
                );
            }
            QueuedOperation::QueryPurchaseHistory { product_type, on_success, on_error } => {
                client.query_purchase_history(
                    product_type,
                    Box::new(move |result, records| {
                        Self::serialized_weak(&manager, move |manager| {
                            match operation_outcome(&result, "Error querying purchase history") {
                                OperationOutcome::Success => on_success(records),
                                OperationOutcome::Requeue => {
                                    manager.requeue(QueuedOperation::QueryPurchaseHistory {
                                        product_type,
                                        on_success,
                                        on_error,
                                    });
                                }
                                OperationOutcome::Failed(err) => on_error(err),
                            }
                        });
                    }),
                );
            }
            QueuedOperation::LaunchPurchaseFlow { request, on_error } => {
                let params = request.to_flow_params();
                let result = client.launch_billing_flow(&request.activity, &params);
                match operation_outcome(&result, "Error launching purchase flow") {
                    OperationOutcome::Success => {
                        debug!(product_id = %params.product_id, "purchase flow launched");
                    }
                    OperationOutcome::Requeue => {
                        self.requeue(QueuedOperation::LaunchPurchaseFlow { request, on_error });
                    }
                    OperationOutcome::Failed(err) => on_error(err),
                }
            }
            QueuedOperation::ConsumeOrAcknowledge {
                purchase_token,
                is_subscription,
                on_complete,
            } => {
                let token = purchase_token.clone();
                let callback: TokenCallback = Box::new(move |result, _| {
                    Self::serialized_weak(&manager, move |manager| {
                        let context = if is_subscription {
                            "Error acknowledging purchase"
                        } else {
                            "Error consuming purchase"
                        };
                        match operation_outcome(&result, context) {
                            OperationOutcome::Success => on_complete(Ok(token)),
                            OperationOutcome::Requeue => {
                                manager.requeue(QueuedOperation::ConsumeOrAcknowledge {
                                    purchase_token: token,
                                    is_subscription,
                                    on_complete,
                                });
                            }
                            OperationOutcome::Failed(err) => on_complete(Err(err)),
                        }
                    });
                });

                if is_subscription {
                    client.acknowledge(purchase_token, callback);
                } else {
                    client.consume(purchase_token, callback);
                }
            }
        }
    }

    fn close_now(self: &Arc<Self>) {
        let (client, pending) = {
            let mut state = self.state.lock();
            state.connection = ConnectionState::Closed;
            state.generation += 1;
            state.retry_pending = false;
            (state.client.take(), state.queue.close())
        };

        info!(failed = pending.len(), "closing billing connection");
        if let Some(client) = client {
            client.end_connection();
        }
        fail_all(pending, &BillingError::connection_closed());
    }
}

/// State listener bound to one connect attempt
struct AttemptListener {
    manager: Weak<ConnectionManager>,
    generation: u64,
}

impl BillingClientStateListener for AttemptListener {
    fn on_billing_setup_finished(&self, result: BillingResult) {
        let generation = self.generation;
        ConnectionManager::serialized_weak(&self.manager, move |manager| {
            manager.on_setup_finished(generation, result);
        });
    }

    fn on_billing_service_disconnected(&self) {
        let generation = self.generation;
        ConnectionManager::serialized_weak(&self.manager, move |manager| {
            manager.on_service_disconnected(generation);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use storelink_domain::ProductType;

    use super::*;
    use crate::billing::classifier::classify;
    use crate::billing::router::PurchaseUpdateRouter;
    use crate::testing::{FakeBillingClientFactory, ManualScheduler};

    fn manager(
        factory: &Arc<FakeBillingClientFactory>,
        scheduler: &Arc<ManualScheduler>,
    ) -> Arc<ConnectionManager> {
        let executor = Arc::new(SerialExecutor::new("billing-test"));
        let router = PurchaseUpdateRouter::new(Arc::clone(&executor));
        let policy = ReconnectionPolicy::new(Duration::from_millis(100), Duration::from_millis(400))
            .unwrap();
        ConnectionManager::new(executor, factory.clone(), router, scheduler.clone(), policy)
    }

    fn history_query() -> QueuedOperation {
        QueuedOperation::QueryPurchaseHistory {
            product_type: ProductType::OneTime,
            on_success: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
        }
    }

    #[test]
    fn state_serializes_as_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
    }

    #[test]
    fn deferred_operations_are_counted_until_ready() {
        let factory = Arc::new(FakeBillingClientFactory::manual());
        let scheduler = Arc::new(ManualScheduler::new());
        let manager = manager(&factory, &scheduler);

        manager.dispatch(history_query());
        manager.dispatch(history_query());
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(manager.queued_operations(), 2);
        assert!(!manager.is_ready());

        factory.latest().unwrap().finish_setup(BillingResult::ok());
        assert_eq!(manager.queued_operations(), 0);
        assert!(manager.is_ready());
    }

    #[test]
    fn reconnect_attempts_reset_once_ready() {
        let factory = Arc::new(FakeBillingClientFactory::manual());
        let scheduler = Arc::new(ManualScheduler::new());
        let manager = manager(&factory, &scheduler);

        manager.connect();
        factory.latest().unwrap().finish_setup(BillingResult::new(BillingResponse::NetworkError));
        assert_eq!(manager.reconnect_attempt(), 1);
        assert!(scheduler.run_next());
        factory.latest().unwrap().finish_setup(BillingResult::new(BillingResponse::NetworkError));
        assert_eq!(manager.reconnect_attempt(), 2);
        assert_eq!(
            scheduler.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );

        assert!(scheduler.run_next());
        factory.latest().unwrap().finish_setup(BillingResult::ok());
        assert_eq!(manager.reconnect_attempt(), 0);
        assert_eq!(factory.built(), 1, "recoverable failures reuse the client");
    }

    #[test]
    fn setup_retries_exactly_when_policy_allows() {
        for response in BillingResponse::ALL {
            if response == BillingResponse::Ok {
                continue;
            }
            let factory = Arc::new(FakeBillingClientFactory::manual());
            let scheduler = Arc::new(ManualScheduler::new());
            let manager = manager(&factory, &scheduler);

            manager.connect();
            factory.latest().unwrap().finish_setup(BillingResult::new(response));

            let retried = ReconnectionPolicy::default().should_retry(classify(response));
            assert_eq!(scheduler.delays().len(), usize::from(retried), "{response:?}");
            let expected =
                if retried { ConnectionState::Connecting } else { ConnectionState::Disconnected };
            assert_eq!(manager.state(), expected, "{response:?}");
        }
    }

    #[test]
    fn scheduled_retry_after_close_does_nothing() {
        let factory = Arc::new(FakeBillingClientFactory::manual());
        let scheduler = Arc::new(ManualScheduler::new());
        let manager = manager(&factory, &scheduler);

        manager.connect();
        factory
            .latest()
            .unwrap()
            .finish_setup(BillingResult::new(BillingResponse::ServiceUnavailable));
        manager.close();

        assert!(scheduler.run_next());
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(factory.store().calls_matching("start_connection"), 1);
    }
}
