//! Posted-token ledger

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use storelink_domain::token_prefix;
use tracing::{debug, warn};

use super::ports::PostedTokenStore;

/// Records purchase tokens whose consume/acknowledge already succeeded
///
/// Tokens are cached in memory in front of the persistent store. Store read
/// failures count as "not posted"; store write failures leave the token
/// recorded in memory only.
pub struct PostedTokenLedger {
    store: Arc<dyn PostedTokenStore>,
    cache: Mutex<HashSet<String>>,
}

impl PostedTokenLedger {
    pub fn new(store: Arc<dyn PostedTokenStore>) -> Self {
        Self { store, cache: Mutex::new(HashSet::new()) }
    }

    pub fn is_already_posted(&self, purchase_token: &str) -> bool {
        if self.cache.lock().contains(purchase_token) {
            return true;
        }

        match self.store.is_posted(purchase_token) {
            Ok(true) => {
                self.cache.lock().insert(purchase_token.to_string());
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(
                    token = %token_prefix(purchase_token),
                    error = %err,
                    "posted-token lookup failed; treating token as not posted"
                );
                false
            }
        }
    }

    /// Idempotent
    pub fn mark_posted(&self, purchase_token: &str) {
        if !self.cache.lock().insert(purchase_token.to_string()) {
            return;
        }

        debug!(token = %token_prefix(purchase_token), "marking purchase token as posted");
        if let Err(err) = self.store.mark_posted(purchase_token) {
            warn!(
                token = %token_prefix(purchase_token),
                error = %err,
                "failed to persist posted token; kept in memory only"
            );
        }
    }
}
