//! Domain constants
//!
//! Centralized location for domain-level constants used by the purchase
//! pipeline.

// Reconnection defaults
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 15 * 60 * 1_000;

// Ledger defaults
pub const DEFAULT_LEDGER_FILE_NAME: &str = "storelink-ledger.db";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Number of purchase token characters included in log output.
pub const TOKEN_LOG_PREFIX_LEN: usize = 8;

// Messages surfaced through `BillingError`
pub const MSG_CONNECTION_CLOSED: &str = "Billing connection was closed before the request ran";
pub const MSG_NULL_PURCHASE_LIST: &str =
    "Purchases update reported OK but the purchase list was empty";
pub const MSG_PENDING_PURCHASE: &str = "Purchase is pending and cannot be finalized yet";
pub const MSG_NO_HISTORY_FOR_PRODUCT: &str = "No purchase history found for product";
/// Fragment of the store debug message emitted when the on-device billing
/// service is older than the minimum supported version.
pub const BILLING_VERSION_MESSAGE_FRAGMENT: &str = "API version is less than";
