//! Test doubles for the billing ports
//!
//! Everything here is deterministic: the fake client answers synchronously
//! on the calling thread unless told to hold token callbacks or setup
//! results, and the manual scheduler only runs jobs when asked.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use storelink_domain::{
    ActivityHandle, BillingError, BillingFlowParams, BillingResult, ProductDetails, ProductType,
    PurchaseState, RawPurchase, RawPurchaseHistoryRecord, Transaction,
};

use crate::billing::ports::{
    BillingClient, BillingClientFactory, BillingClientStateListener, DelayScheduler,
    ProductDetailsCallback, PurchaseHistoryCallback, PurchasesCallback, PurchasesUpdateListener,
    PurchasesUpdatedListener, TokenCallback,
};

/// Store contents and scripted responses shared by every fake client
#[derive(Default)]
pub struct FakeStore {
    products: Mutex<Vec<ProductDetails>>,
    purchases: Mutex<HashMap<ProductType, Vec<RawPurchase>>>,
    history: Mutex<HashMap<ProductType, Vec<RawPurchaseHistoryRecord>>>,
    /// Results for upcoming requests, oldest first; `OK` once exhausted
    responses: Mutex<VecDeque<BillingResult>>,
    /// Results for upcoming `start_connection` calls
    setup_results: Mutex<VecDeque<BillingResult>>,
    calls: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn add_product(&self, product: ProductDetails) {
        self.products.lock().push(product);
    }

    pub fn add_purchase(&self, product_type: ProductType, purchase: RawPurchase) {
        self.purchases.lock().entry(product_type).or_default().push(purchase);
    }

    pub fn add_history(&self, product_type: ProductType, record: RawPurchaseHistoryRecord) {
        self.history.lock().entry(product_type).or_default().push(record);
    }

    pub fn push_response(&self, result: BillingResult) {
        self.responses.lock().push_back(result);
    }

    pub fn push_setup_result(&self, result: BillingResult) {
        self.setup_results.lock().push_back(result);
    }

    /// Every request made against any client, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn next_response(&self) -> BillingResult {
        self.responses.lock().pop_front().unwrap_or_else(BillingResult::ok)
    }
}

/// Scriptable in-memory billing client
pub struct FakeBillingClient {
    store: Arc<FakeStore>,
    updates: Arc<dyn PurchasesUpdatedListener>,
    auto_setup: bool,
    ready: Mutex<bool>,
    listener: Mutex<Option<Arc<dyn BillingClientStateListener>>>,
    hold_token_callbacks: Mutex<bool>,
    held: Mutex<Vec<TokenCallback>>,
    ended: Mutex<u32>,
}

impl FakeBillingClient {
    pub fn new(
        store: Arc<FakeStore>,
        updates: Arc<dyn PurchasesUpdatedListener>,
        auto_setup: bool,
    ) -> Self {
        Self {
            store,
            updates,
            auto_setup,
            ready: Mutex::new(false),
            listener: Mutex::new(None),
            hold_token_callbacks: Mutex::new(false),
            held: Mutex::new(Vec::new()),
            ended: Mutex::new(0),
        }
    }

    /// Answer the pending `start_connection`
    pub fn finish_setup(&self, result: BillingResult) {
        *self.ready.lock() = result.is_ok();
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_billing_setup_finished(result);
        }
    }

    /// Simulate the service dropping the connection
    pub fn disconnect(&self) {
        *self.ready.lock() = false;
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_billing_service_disconnected();
        }
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock() = ready;
    }

    /// Keep consume/acknowledge callbacks until [`complete_held`] is called
    ///
    /// [`complete_held`]: FakeBillingClient::complete_held
    pub fn hold_token_callbacks(&self, hold: bool) {
        *self.hold_token_callbacks.lock() = hold;
    }

    pub fn held_callbacks(&self) -> usize {
        self.held.lock().len()
    }

    /// Complete every held consume/acknowledge with `result`
    pub fn complete_held(&self, result: BillingResult) {
        let held: Vec<TokenCallback> = self.held.lock().drain(..).collect();
        for callback in held {
            callback(result.clone(), String::new());
        }
    }

    /// Push a purchase update as the service would
    pub fn push_update(&self, result: BillingResult, purchases: Option<Vec<RawPurchase>>) {
        self.updates.on_purchases_updated(result, purchases);
    }

    pub fn end_count(&self) -> u32 {
        *self.ended.lock()
    }

    fn token_request(&self, kind: &str, purchase_token: String, callback: TokenCallback) {
        self.store.record(format!("{kind}:{purchase_token}"));
        if *self.hold_token_callbacks.lock() {
            self.held.lock().push(callback);
            return;
        }
        callback(self.store.next_response(), purchase_token);
    }
}

impl BillingClient for FakeBillingClient {
    fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    fn start_connection(&self, listener: Arc<dyn BillingClientStateListener>) {
        self.store.record("start_connection".to_string());
        *self.listener.lock() = Some(listener);

        let scripted = self.store.setup_results.lock().pop_front();
        match scripted {
            Some(result) => self.finish_setup(result),
            None if self.auto_setup => self.finish_setup(BillingResult::ok()),
            None => {}
        }
    }

    fn end_connection(&self) {
        *self.ready.lock() = false;
        *self.ended.lock() += 1;
        self.store.record("end_connection".to_string());
    }

    fn query_product_details(
        &self,
        product_type: ProductType,
        product_ids: Vec<String>,
        callback: ProductDetailsCallback,
    ) {
        self.store
            .record(format!("query_product_details:{product_type}:{}", product_ids.join(",")));
        let details = self
            .store
            .products
            .lock()
            .iter()
            .filter(|product| {
                product.product_type == product_type && product_ids.contains(&product.product_id)
            })
            .cloned()
            .collect();
        callback(self.store.next_response(), details);
    }

    fn query_purchases(&self, product_type: ProductType, callback: PurchasesCallback) {
        self.store.record(format!("query_purchases:{product_type}"));
        let purchases = self.store.purchases.lock().get(&product_type).cloned().unwrap_or_default();
        callback(self.store.next_response(), purchases);
    }

    fn query_purchase_history(&self, product_type: ProductType, callback: PurchaseHistoryCallback) {
        self.store.record(format!("query_purchase_history:{product_type}"));
        let records = self.store.history.lock().get(&product_type).cloned().unwrap_or_default();
        callback(self.store.next_response(), records);
    }

    fn launch_billing_flow(
        &self,
        _activity: &ActivityHandle,
        params: &BillingFlowParams,
    ) -> BillingResult {
        self.store.record(format!("launch_billing_flow:{}", params.product_id));
        self.store.next_response()
    }

    fn consume(&self, purchase_token: String, callback: TokenCallback) {
        self.token_request("consume", purchase_token, callback);
    }

    fn acknowledge(&self, purchase_token: String, callback: TokenCallback) {
        self.token_request("acknowledge", purchase_token, callback);
    }
}

/// Builds [`FakeBillingClient`]s over one shared [`FakeStore`]
pub struct FakeBillingClientFactory {
    store: Arc<FakeStore>,
    auto_setup: bool,
    clients: Mutex<Vec<Arc<FakeBillingClient>>>,
}

impl FakeBillingClientFactory {
    /// Clients finish setup with `OK` as soon as they connect
    pub fn auto_connecting() -> Self {
        Self::with_auto_setup(true)
    }

    /// Clients wait for [`FakeBillingClient::finish_setup`]
    pub fn manual() -> Self {
        Self::with_auto_setup(false)
    }

    fn with_auto_setup(auto_setup: bool) -> Self {
        Self { store: Arc::new(FakeStore::default()), auto_setup, clients: Mutex::new(Vec::new()) }
    }

    pub fn store(&self) -> Arc<FakeStore> {
        Arc::clone(&self.store)
    }

    pub fn built(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn latest(&self) -> Option<Arc<FakeBillingClient>> {
        self.clients.lock().last().cloned()
    }
}

impl BillingClientFactory for FakeBillingClientFactory {
    fn build(&self, updates: Arc<dyn PurchasesUpdatedListener>) -> Arc<dyn BillingClient> {
        let client = Arc::new(FakeBillingClient::new(self.store(), updates, self.auto_setup));
        self.clients.lock().push(Arc::clone(&client));
        client
    }
}

/// Scheduler that records delays and runs jobs on demand
#[derive(Default)]
pub struct ManualScheduler {
    delays: Mutex<Vec<Duration>>,
    jobs: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay ever scheduled, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run the oldest scheduled job; false when nothing was scheduled
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

impl DelayScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Box<dyn FnOnce() + Send>) {
        self.delays.lock().push(delay);
        self.jobs.lock().push_back(job);
    }
}

/// What a [`RecordingListener`] saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Updated(Vec<Transaction>),
    Failed(BillingError),
}

/// Listener that records every callback
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }

    pub fn updates(&self) -> Vec<Vec<Transaction>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::Updated(transactions) => Some(transactions.clone()),
                ListenerEvent::Failed(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<BillingError> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::Failed(error) => Some(error.clone()),
                ListenerEvent::Updated(_) => None,
            })
            .collect()
    }
}

impl PurchasesUpdateListener for RecordingListener {
    fn on_purchases_updated(&self, transactions: Vec<Transaction>) {
        self.events.lock().push(ListenerEvent::Updated(transactions));
    }

    fn on_purchases_failed_to_update(&self, error: BillingError) {
        self.events.lock().push(ListenerEvent::Failed(error));
    }
}

/// A purchased one-time product with a single product id
pub fn raw_purchase(product_id: &str, purchase_token: &str) -> RawPurchase {
    RawPurchase {
        order_id: Some(format!("GPA.{purchase_token}")),
        product_ids: vec![product_id.to_string()],
        purchase_token: purchase_token.to_string(),
        purchase_state: PurchaseState::Purchased,
        purchase_time_millis: 1_700_000_000_000,
        is_acknowledged: false,
        is_auto_renewing: false,
        original_json: String::new(),
        signature: String::new(),
    }
}

pub fn history_record(product_id: &str, purchase_token: &str) -> RawPurchaseHistoryRecord {
    RawPurchaseHistoryRecord {
        product_ids: vec![product_id.to_string()],
        purchase_token: purchase_token.to_string(),
        purchase_time_millis: 1_700_000_000_000,
        original_json: String::new(),
        signature: String::new(),
    }
}

pub fn product(product_id: &str, product_type: ProductType) -> ProductDetails {
    ProductDetails {
        product_id: product_id.to_string(),
        product_type,
        title: product_id.to_string(),
        original_json: String::new(),
    }
}
