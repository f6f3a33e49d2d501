//! Store response codes
//!
//! The billing service reports every outcome as an integer response code plus
//! an optional debug message. `BillingResponse` is the closed set of codes the
//! service defines; raw integers are converted at the client boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::BILLING_VERSION_MESSAGE_FRAGMENT;
use crate::errors::{BillingError, ErrorKind};

/// Every response code defined by the billing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingResponse {
    /// The request did not complete within the service's own timeout
    ServiceTimeout,
    /// The requested feature is not supported by the installed store app
    FeatureNotSupported,
    /// The app is not connected to the billing service
    ServiceDisconnected,
    /// Success
    Ok,
    /// The user cancelled the flow (also reported for cancelled setup)
    UserCanceled,
    /// The service is temporarily unavailable
    ServiceUnavailable,
    /// Billing is unavailable on this device or for this user
    BillingUnavailable,
    /// The requested product is not available for purchase
    ItemUnavailable,
    /// Invalid arguments were supplied to the API
    DeveloperError,
    /// Fatal error during the API action
    Error,
    /// The item is already owned
    ItemAlreadyOwned,
    /// The item is not owned, so it cannot be consumed
    ItemNotOwned,
    /// A network error occurred during the operation
    NetworkError,
}

impl BillingResponse {
    /// All codes, in numeric order
    pub const ALL: [BillingResponse; 13] = [
        Self::ServiceTimeout,
        Self::FeatureNotSupported,
        Self::ServiceDisconnected,
        Self::Ok,
        Self::UserCanceled,
        Self::ServiceUnavailable,
        Self::BillingUnavailable,
        Self::ItemUnavailable,
        Self::DeveloperError,
        Self::Error,
        Self::ItemAlreadyOwned,
        Self::ItemNotOwned,
        Self::NetworkError,
    ];

    /// Numeric code as reported by the service
    pub const fn code(self) -> i32 {
        match self {
            Self::ServiceTimeout => -3,
            Self::FeatureNotSupported => -2,
            Self::ServiceDisconnected => -1,
            Self::Ok => 0,
            Self::UserCanceled => 1,
            Self::ServiceUnavailable => 2,
            Self::BillingUnavailable => 3,
            Self::ItemUnavailable => 4,
            Self::DeveloperError => 5,
            Self::Error => 6,
            Self::ItemAlreadyOwned => 7,
            Self::ItemNotOwned => 8,
            Self::NetworkError => 12,
        }
    }

    /// Parse a raw service code; unknown codes are returned unchanged as `Err`
    pub fn from_code(code: i32) -> Result<Self, i32> {
        Self::ALL.iter().copied().find(|response| response.code() == code).ok_or(code)
    }

    /// Caller-facing error kind for a failed request with this code
    ///
    /// Exhaustive on purpose: a new code does not compile until it is mapped.
    pub const fn error_kind(self) -> ErrorKind {
        match self {
            Self::Ok => ErrorKind::Unknown,
            Self::UserCanceled => ErrorKind::PurchaseCancelled,
            Self::ServiceTimeout
            | Self::ServiceDisconnected
            | Self::ServiceUnavailable
            | Self::Error
            | Self::NetworkError => ErrorKind::StoreProblem,
            Self::FeatureNotSupported => ErrorKind::FeatureNotSupported,
            Self::BillingUnavailable => ErrorKind::PurchaseNotAllowed,
            Self::ItemUnavailable => ErrorKind::ProductNotAvailable,
            Self::DeveloperError => ErrorKind::Configuration,
            Self::ItemAlreadyOwned => ErrorKind::AlreadyOwned,
            Self::ItemNotOwned => ErrorKind::NotOwned,
        }
    }

    /// Service-style constant name, e.g. `SERVICE_UNAVAILABLE`
    pub const fn name(self) -> &'static str {
        match self {
            Self::ServiceTimeout => "SERVICE_TIMEOUT",
            Self::FeatureNotSupported => "FEATURE_NOT_SUPPORTED",
            Self::ServiceDisconnected => "SERVICE_DISCONNECTED",
            Self::Ok => "OK",
            Self::UserCanceled => "USER_CANCELED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BillingUnavailable => "BILLING_UNAVAILABLE",
            Self::ItemUnavailable => "ITEM_UNAVAILABLE",
            Self::DeveloperError => "DEVELOPER_ERROR",
            Self::Error => "ERROR",
            Self::ItemAlreadyOwned => "ITEM_ALREADY_OWNED",
            Self::ItemNotOwned => "ITEM_NOT_OWNED",
            Self::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for BillingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Response code plus the service's debug message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingResult {
    pub response: BillingResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
}

impl BillingResult {
    pub fn new(response: BillingResponse) -> Self {
        Self { response, debug_message: None }
    }

    pub fn with_message<S: Into<String>>(response: BillingResponse, message: S) -> Self {
        Self { response, debug_message: Some(message.into()) }
    }

    pub fn ok() -> Self {
        Self::new(BillingResponse::Ok)
    }

    pub fn is_ok(&self) -> bool {
        self.response == BillingResponse::Ok
    }

    /// Billing is unavailable because the store app is older than required
    pub fn is_billing_version_unsupported(&self) -> bool {
        self.response == BillingResponse::BillingUnavailable
            && self
                .debug_message
                .as_deref()
                .is_some_and(|msg| msg.contains(BILLING_VERSION_MESSAGE_FRAGMENT))
    }

    /// Build the caller-facing error for this result
    pub fn to_error<S: Into<String>>(&self, context: S) -> BillingError {
        let kind = if self.is_billing_version_unsupported() {
            ErrorKind::FeatureNotSupported
        } else {
            self.response.error_kind()
        };

        let error = BillingError::new(kind, format!("{}: {}", context.into(), self.response));
        match &self.debug_message {
            Some(message) if !message.is_empty() => error.with_underlying(message.clone()),
            _ => error,
        }
    }
}

impl From<BillingResponse> for BillingResult {
    fn from(response: BillingResponse) -> Self {
        Self::new(response)
    }
}
