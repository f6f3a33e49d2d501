//! Product identity and purchase-flow parameters

use serde::{Deserialize, Serialize};

use crate::impl_store_codes;

/// Store product category
///
/// The pipeline only needs to know whether finalization means acknowledge
/// (subscriptions) or consume (one-time products).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Subscription,
    OneTime,
}

impl_store_codes!(ProductType {
    Subscription => "subs",
    OneTime => "inapp",
});

impl ProductType {
    pub const ALL: [ProductType; 2] = [Self::Subscription, Self::OneTime];

    pub fn is_subscription(self) -> bool {
        self == Self::Subscription
    }
}

/// Product as returned by a product details query
///
/// Only identity is modelled; pricing and offers stay in `original_json` for
/// downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product_id: String,
    pub product_type: ProductType,
    pub title: String,
    #[serde(default)]
    pub original_json: String,
}

/// What the caller wants to buy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasingData {
    pub product_id: String,
    pub product_type: ProductType,
    /// Base plan / offer selected for a subscription purchase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_option_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_token: Option<String>,
}

impl PurchasingData {
    pub fn one_time<S: Into<String>>(product_id: S) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: ProductType::OneTime,
            subscription_option_id: None,
            offer_token: None,
        }
    }

    pub fn subscription<S: Into<String>, O: Into<String>>(
        product_id: S,
        subscription_option_id: O,
        offer_token: Option<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: ProductType::Subscription,
            subscription_option_id: Some(subscription_option_id.into()),
            offer_token,
        }
    }
}

/// How an upgraded/downgraded subscription replaces the old one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementMode {
    WithTimeProration,
    ChargeProratedPrice,
    WithoutProration,
    ChargeFullPrice,
    Deferred,
}

/// Subscription being replaced by the new purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceProductInfo {
    pub old_product_id: String,
    pub old_purchase_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_mode: Option<ReplacementMode>,
}

/// Parameters handed to the billing client when launching a purchase flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingFlowParams {
    pub product_id: String,
    pub product_type: ProductType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_token: Option<String>,
    /// Hashed app user id so the store can flag suspicious activity
    pub obfuscated_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_info: Option<ReplaceProductInfo>,
    /// Whether the product was shown with personalized pricing
    #[serde(default)]
    pub is_offer_personalized: bool,
}
