//! Transaction finalization and posted-token idempotence.

mod support;

use storelink_core::testing::raw_purchase;
use storelink_core::PostedTokenStore;
use storelink_domain::{
    BillingConfig, BillingResponse, BillingResult, ErrorKind, ProductType, PurchaseState,
    PurchaseType, Result, Transaction,
};
use support::{Harness, Recorder};

fn transaction(token: &str, product_type: ProductType, state: PurchaseState) -> Transaction {
    let mut raw = raw_purchase("coins", token);
    raw.purchase_state = state;
    Transaction::from_purchase(&raw, product_type, PurchaseType::FromPurchase, None, None)
}

#[test]
fn second_consume_of_same_token_short_circuits() {
    let harness = Harness::auto();
    let first = Recorder::<Result<String>>::new();
    let second = Recorder::<Result<String>>::new();

    harness.wrapper.consume_purchase("tok1".into(), first.sink());
    harness.wrapper.consume_purchase("tok1".into(), second.sink());

    assert_eq!(first.values(), vec![Ok("tok1".to_string())]);
    assert_eq!(second.values(), vec![Ok("tok1".to_string())]);
    assert_eq!(harness.store().calls_matching("consume:tok1"), 1);
    assert!(harness.tokens.is_posted("tok1").unwrap());
}

#[test]
fn duplicate_purchase_in_one_update_is_posted_once() {
    let harness = Harness::auto();
    harness.attach_listener();
    let client = harness.client();
    client.hold_token_callbacks(true);

    let purchase = raw_purchase("coins", "purchaseA");
    client.push_update(BillingResult::ok(), Some(vec![purchase.clone(), purchase]));

    let update = harness.listener.updates().remove(0);
    assert_eq!(update.len(), 2);

    let results = Recorder::<Result<String>>::new();
    for transaction in &update {
        harness.wrapper.finalize_and_save(true, transaction, results.sink());
    }

    assert_eq!(client.held_callbacks(), 1, "second request must wait for the first");
    client.complete_held(BillingResult::ok());

    assert_eq!(results.len(), 2);
    assert!(results.values().iter().all(|result| result.is_ok()));
    assert_eq!(harness.store().calls_matching("consume:purchaseA"), 1);
    assert_eq!(harness.tokens.len(), 1);
}

#[test]
fn pending_purchase_is_never_finalized_or_posted() {
    let harness = Harness::auto();
    let results = Recorder::<Result<String>>::new();

    let pending = transaction("tokP", ProductType::OneTime, PurchaseState::Pending);
    harness.wrapper.finalize_and_save(true, &pending, results.sink());

    assert_eq!(results.values()[0].as_ref().unwrap_err().kind, ErrorKind::PaymentPending);
    assert_eq!(harness.store().calls_matching("consume"), 0);
    assert!(harness.tokens.is_empty());
}

#[test]
fn subscriptions_are_acknowledged() {
    let harness = Harness::auto();
    let results = Recorder::<Result<String>>::new();

    let subscription = transaction("tokS", ProductType::Subscription, PurchaseState::Purchased);
    harness.wrapper.finalize_and_save(true, &subscription, results.sink());

    assert_eq!(harness.store().calls_matching("acknowledge:tokS"), 1);
    assert_eq!(harness.store().calls_matching("consume"), 0);
    assert_eq!(results.values(), vec![Ok("tokS".to_string())]);
}

#[test]
fn acknowledged_subscription_is_recorded_without_store_call() {
    let harness = Harness::auto();
    let results = Recorder::<Result<String>>::new();

    let mut subscription =
        transaction("tokAck", ProductType::Subscription, PurchaseState::Purchased);
    subscription.is_acknowledged = true;
    harness.wrapper.finalize_and_save(true, &subscription, results.sink());

    assert_eq!(results.values(), vec![Ok("tokAck".to_string())]);
    assert_eq!(harness.factory.built(), 0, "no connection needed");
    assert!(harness.tokens.is_posted("tokAck").unwrap());
}

#[test]
fn declining_to_consume_still_records_token() {
    let harness = Harness::auto();
    let results = Recorder::<Result<String>>::new();

    let consumable = transaction("tokKeep", ProductType::OneTime, PurchaseState::Purchased);
    harness.wrapper.finalize_and_save(false, &consumable, results.sink());

    assert_eq!(results.values(), vec![Ok("tokKeep".to_string())]);
    assert_eq!(harness.store().calls_matching("consume"), 0);
    assert!(harness.tokens.is_posted("tokKeep").unwrap());
}

#[test]
fn failed_consume_is_not_posted_and_can_be_retried() {
    let harness = Harness::auto();
    harness.store().push_response(BillingResult::new(BillingResponse::ItemNotOwned));
    let first = Recorder::<Result<String>>::new();

    harness.wrapper.consume_purchase("tokF".into(), first.sink());

    assert_eq!(first.values()[0].as_ref().unwrap_err().kind, ErrorKind::NotOwned);
    assert!(!harness.tokens.is_posted("tokF").unwrap());

    let retry = Recorder::<Result<String>>::new();
    harness.wrapper.consume_purchase("tokF".into(), retry.sink());
    assert_eq!(retry.values(), vec![Ok("tokF".to_string())]);
    assert_eq!(harness.store().calls_matching("consume:tokF"), 2);
}

#[test]
fn observer_mode_never_calls_the_store() {
    let config = BillingConfig { finish_transactions: false, ..BillingConfig::default() };
    let harness = Harness::with_config(config);
    let results = Recorder::<Result<String>>::new();

    let consumable = transaction("tokObs", ProductType::OneTime, PurchaseState::Purchased);
    harness.wrapper.finalize_and_save(true, &consumable, results.sink());

    assert_eq!(results.values(), vec![Ok("tokObs".to_string())]);
    assert_eq!(harness.store().calls_matching("consume"), 0);
    assert!(harness.tokens.is_posted("tokObs").unwrap());
}
