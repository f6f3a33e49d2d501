//! Raw store purchases and normalized transactions

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::offering::PresentedOfferingContext;
use super::product::ProductType;
use crate::constants::TOKEN_LOG_PREFIX_LEN;
use crate::impl_store_codes;

/// Purchase state as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Purchased,
    Pending,
    Unspecified,
}

impl_store_codes!(PurchaseState {
    Purchased => "purchased",
    Pending => "pending",
    Unspecified => "unspecified",
});

impl PurchaseState {
    /// Map the store's numeric purchase state; unknown values are unspecified
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Purchased,
            2 => Self::Pending,
            _ => Self::Unspecified,
        }
    }
}

/// Whether a transaction came from a new purchase or from a restore/sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    FromPurchase,
    FromRestore,
}

/// Purchase payload as delivered by the billing client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPurchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub product_ids: Vec<String>,
    pub purchase_token: String,
    pub purchase_state: PurchaseState,
    pub purchase_time_millis: i64,
    #[serde(default)]
    pub is_acknowledged: bool,
    #[serde(default)]
    pub is_auto_renewing: bool,
    #[serde(default)]
    pub original_json: String,
    #[serde(default)]
    pub signature: String,
}

/// Purchase history entry as delivered by the billing client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPurchaseHistoryRecord {
    pub product_ids: Vec<String>,
    pub purchase_token: String,
    pub purchase_time_millis: i64,
    #[serde(default)]
    pub original_json: String,
    #[serde(default)]
    pub signature: String,
}

/// Normalized purchase handed downstream
///
/// Built once by the update router or a purchase query and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ordered; a bundle purchase covers several products
    pub product_ids: Vec<String>,
    pub purchase_token: String,
    pub purchase_state: PurchaseState,
    pub is_acknowledged: bool,
    pub purchase_time: DateTime<Utc>,
    pub product_type: ProductType,
    pub purchase_type: PurchaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_renewing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presented_offering_context: Option<PresentedOfferingContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_option_id: Option<String>,
    #[serde(default)]
    pub original_json: String,
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Normalize a live purchase
    pub fn from_purchase(
        raw: &RawPurchase,
        product_type: ProductType,
        purchase_type: PurchaseType,
        presented_offering_context: Option<PresentedOfferingContext>,
        subscription_option_id: Option<String>,
    ) -> Self {
        Self {
            product_ids: raw.product_ids.clone(),
            purchase_token: raw.purchase_token.clone(),
            purchase_state: raw.purchase_state,
            is_acknowledged: raw.is_acknowledged,
            purchase_time: millis_to_datetime(raw.purchase_time_millis),
            product_type,
            purchase_type,
            order_id: raw.order_id.clone(),
            is_auto_renewing: product_type.is_subscription().then_some(raw.is_auto_renewing),
            presented_offering_context,
            subscription_option_id,
            original_json: raw.original_json.clone(),
            signature: raw.signature.clone(),
        }
    }

    /// Normalize a purchase history record; history carries no live state
    pub fn from_history_record(
        record: &RawPurchaseHistoryRecord,
        product_type: ProductType,
    ) -> Self {
        Self {
            product_ids: record.product_ids.clone(),
            purchase_token: record.purchase_token.clone(),
            purchase_state: PurchaseState::Unspecified,
            is_acknowledged: false,
            purchase_time: millis_to_datetime(record.purchase_time_millis),
            product_type,
            purchase_type: PurchaseType::FromRestore,
            order_id: None,
            is_auto_renewing: None,
            presented_offering_context: None,
            subscription_option_id: None,
            original_json: record.original_json.clone(),
            signature: record.signature.clone(),
        }
    }

    pub fn is_subscription(&self) -> bool {
        self.product_type.is_subscription()
    }

    pub fn is_pending(&self) -> bool {
        self.purchase_state == PurchaseState::Pending
    }

    /// First product id, used when a single id is needed
    pub fn primary_product_id(&self) -> Option<&str> {
        self.product_ids.first().map(String::as_str)
    }
}

/// Leading part of a purchase token, safe to put in logs
pub fn token_prefix(purchase_token: &str) -> &str {
    purchase_token
        .char_indices()
        .nth(TOKEN_LOG_PREFIX_LEN)
        .map_or(purchase_token, |(idx, _)| &purchase_token[..idx])
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}
