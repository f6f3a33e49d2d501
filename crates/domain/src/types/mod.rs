//! Domain types and models
//!
//! Raw store payloads (`RawPurchase`, `RawPurchaseHistoryRecord`) are what the
//! billing client hands back; `Transaction` is the normalized, immutable
//! record the pipeline emits downstream.

pub mod activity;
pub mod offering;
pub mod product;
pub mod purchase;
pub mod response;

pub use activity::ActivityHandle;
pub use offering::PresentedOfferingContext;
pub use product::{
    BillingFlowParams, ProductDetails, ProductType, PurchasingData, ReplaceProductInfo,
    ReplacementMode,
};
pub use purchase::{
    token_prefix, PurchaseState, PurchaseType, RawPurchase, RawPurchaseHistoryRecord, Transaction,
};
pub use response::{BillingResponse, BillingResult};
