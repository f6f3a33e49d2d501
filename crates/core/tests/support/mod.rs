//! Shared test helpers for `storelink-core` integration tests.
//!
//! `Harness` wires a `BillingWrapper` to the fake billing client, a manual
//! scheduler and an in-memory token store so scenarios can drive the
//! connection step by step.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use storelink_core::testing::{
    FakeBillingClient, FakeBillingClientFactory, FakeStore, ManualScheduler, RecordingListener,
};
use storelink_core::{BillingWrapper, InMemoryTokenStore};
use storelink_domain::BillingConfig;

pub struct Harness {
    pub wrapper: BillingWrapper,
    pub factory: Arc<FakeBillingClientFactory>,
    pub scheduler: Arc<ManualScheduler>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub listener: Arc<RecordingListener>,
}

impl Harness {
    /// Clients connect only when the test calls `finish_setup`
    pub fn manual() -> Self {
        Self::build(FakeBillingClientFactory::manual(), BillingConfig::default())
    }

    /// Clients connect immediately
    pub fn auto() -> Self {
        Self::build(FakeBillingClientFactory::auto_connecting(), BillingConfig::default())
    }

    pub fn with_config(config: BillingConfig) -> Self {
        Self::build(FakeBillingClientFactory::auto_connecting(), config)
    }

    fn build(factory: FakeBillingClientFactory, config: BillingConfig) -> Self {
        let factory = Arc::new(factory);
        let scheduler = Arc::new(ManualScheduler::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let wrapper =
            BillingWrapper::new(factory.clone(), scheduler.clone(), tokens.clone(), &config)
                .expect("default config is valid");

        Self { wrapper, factory, scheduler, tokens, listener: Arc::new(RecordingListener::new()) }
    }

    /// Attach the recording listener (which also starts connecting)
    pub fn attach_listener(&self) {
        self.wrapper.set_listener(Some(self.listener.clone()));
    }

    pub fn client(&self) -> Arc<FakeBillingClient> {
        self.factory.latest().expect("a billing client has been built")
    }

    pub fn store(&self) -> Arc<FakeStore> {
        self.factory.store()
    }
}

/// Collects values handed to continuations
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self { values: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn sink(&self) -> impl FnOnce(T) + Send + 'static {
        let values = Arc::clone(&self.values);
        move |value| values.lock().push(value)
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }
}

/// Shared ordered log of labels, for asserting callback order
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn label<T: 'static>(&self, label: &'static str) -> impl FnOnce(T) + Send + 'static {
        let log = self.clone();
        move |_| log.push(label)
    }
}
