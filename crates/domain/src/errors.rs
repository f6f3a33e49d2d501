//! Error types surfaced to callers of the purchase pipeline

use serde::{Deserialize, Serialize};
use storelink_common::error::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::constants::{MSG_CONNECTION_CLOSED, MSG_NULL_PURCHASE_LIST, MSG_PENDING_PURCHASE};

/// Caller-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A transient store failure (service unavailable, network, disconnect)
    StoreProblem,
    /// The user cancelled the purchase flow
    PurchaseCancelled,
    /// The product is not available for purchase
    ProductNotAvailable,
    /// The product is already owned
    AlreadyOwned,
    /// The product is not owned
    NotOwned,
    /// Developer misconfiguration
    Configuration,
    /// The store app does not support the requested feature
    FeatureNotSupported,
    /// Billing is not available for this device or user
    PurchaseNotAllowed,
    /// The purchase is pending and cannot be finalized yet
    PaymentPending,
    /// The connection was closed before the request ran
    ConnectionClosed,
    /// The store returned a response that violates its own contract
    UnexpectedResponse,
    /// Escape hatch; seeing this means a response code was not mapped
    Unknown,
}

impl ErrorKind {
    pub const fn description(self) -> &'static str {
        match self {
            Self::StoreProblem => "There was a problem with the store",
            Self::PurchaseCancelled => "Purchase was cancelled",
            Self::ProductNotAvailable => "The product is not available for purchase",
            Self::AlreadyOwned => "This product is already active for the user",
            Self::NotOwned => "The product is not owned by the user",
            Self::Configuration => "There is an issue with the store configuration",
            Self::FeatureNotSupported => "The requested feature is not supported",
            Self::PurchaseNotAllowed => "The device or user is not allowed to make the purchase",
            Self::PaymentPending => "The payment is pending",
            Self::ConnectionClosed => "The billing connection was closed",
            Self::UnexpectedResponse => "Received an unexpected response from the store",
            Self::Unknown => "Unknown error",
        }
    }
}

/// Error reported to purchase pipeline callers
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct BillingError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying_message: Option<String>,
}

impl BillingError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self { kind, message: message.into(), underlying_message: None }
    }

    pub fn with_underlying<S: Into<String>>(mut self, underlying: S) -> Self {
        self.underlying_message = Some(underlying.into());
        self
    }

    pub fn connection_closed() -> Self {
        Self::new(ErrorKind::ConnectionClosed, MSG_CONNECTION_CLOSED)
    }

    pub fn null_purchase_list() -> Self {
        Self::new(ErrorKind::UnexpectedResponse, MSG_NULL_PURCHASE_LIST)
    }

    pub fn payment_pending() -> Self {
        Self::new(ErrorKind::PaymentPending, MSG_PENDING_PURCHASE)
    }

    pub fn store_problem<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::StoreProblem, message)
    }
}

impl ErrorClassification for BillingError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::StoreProblem | ErrorKind::PaymentPending)
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ErrorKind::PurchaseCancelled | ErrorKind::PaymentPending => ErrorSeverity::Info,
            ErrorKind::StoreProblem
            | ErrorKind::ConnectionClosed
            | ErrorKind::AlreadyOwned
            | ErrorKind::NotOwned
            | ErrorKind::ProductNotAvailable => ErrorSeverity::Warning,
            ErrorKind::Configuration
            | ErrorKind::FeatureNotSupported
            | ErrorKind::PurchaseNotAllowed
            | ErrorKind::UnexpectedResponse => ErrorSeverity::Error,
            ErrorKind::Unknown => ErrorSeverity::Critical,
        }
    }
}

/// Result type alias for purchase pipeline operations
pub type Result<T> = std::result::Result<T, BillingError>;
