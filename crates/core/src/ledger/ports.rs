//! Persistence port for posted purchase tokens

use storelink_common::CommonResult;

/// Persistent set of purchase tokens whose finalization already succeeded
///
/// Entries are only ever added; eviction belongs to the backing store.
pub trait PostedTokenStore: Send + Sync {
    fn is_posted(&self, purchase_token: &str) -> CommonResult<bool>;

    /// Record a token; recording an existing token is not an error
    fn mark_posted(&self, purchase_token: &str) -> CommonResult<()>;
}
