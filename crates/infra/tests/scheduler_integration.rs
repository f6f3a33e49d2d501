//! Tokio delay scheduler driving real reconnect timers.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storelink_core::testing::FakeBillingClientFactory;
use storelink_core::{ConnectionState, DelayScheduler, PostedTokenStore};
use storelink_domain::{BillingConfig, BillingResponse, BillingResult, ReconnectConfig};
use storelink_infra::{build_billing_runtime, TokioDelayScheduler};
use support::{wait_until, TestLedger};
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_job_runs_after_delay() {
    let scheduler = TokioDelayScheduler::current().expect("inside runtime");
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&runs);
    scheduler.schedule(
        Duration::from_millis(20),
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    assert!(wait_until(Duration::from_secs(2), || runs.load(Ordering::SeqCst) == 1).await);
    assert!(wait_until(Duration::from_secs(1), || scheduler.pending() == 0).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_scheduler_cancels_outstanding_jobs() {
    let scheduler = TokioDelayScheduler::current().expect("inside runtime");
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&runs);
    scheduler.schedule(
        Duration::from_millis(50),
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    drop(scheduler);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recoverable_setup_failure_reconnects_on_timer() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BillingConfig {
        reconnect: ReconnectConfig { base_delay_ms: 10, max_delay_ms: 100 },
        ..BillingConfig::default()
    };
    config.ledger.path = dir.path().join("ledger.db");

    let factory = Arc::new(FakeBillingClientFactory::manual());
    let runtime =
        build_billing_runtime(&config, factory.clone(), tokio::runtime::Handle::current())
            .expect("runtime builds");

    runtime.wrapper.start_connection();
    let client = factory.latest().expect("client built");
    client.finish_setup(BillingResult::new(BillingResponse::ServiceUnavailable));
    assert_eq!(runtime.wrapper.connection_state(), ConnectionState::Connecting);

    let store = factory.store();
    assert!(
        wait_until(Duration::from_secs(2), || store.calls_matching("start_connection") == 2).await,
        "reconnect timer should fire"
    );

    client.finish_setup(BillingResult::ok());
    assert!(runtime.wrapper.is_connected());
    assert_eq!(runtime.scheduler.pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runtime_persists_posted_tokens_in_sqlite() {
    let ledger = TestLedger::new();
    let mut config = BillingConfig::default();
    config.ledger.path = ledger.path();

    let factory = Arc::new(FakeBillingClientFactory::auto_connecting());
    let runtime =
        build_billing_runtime(&config, factory, tokio::runtime::Handle::current())
            .expect("runtime builds");

    runtime.wrapper.consume_purchase("tokDb".into(), |_| {});

    runtime.db.health_check().expect("database healthy");
    assert!(ledger.store().is_posted("tokDb").expect("store readable"));
}
