//! In-process token store

use std::collections::HashSet;

use parking_lot::RwLock;
use storelink_common::CommonResult;

use super::ports::PostedTokenStore;

/// Token store that forgets everything on restart
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashSet<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

impl PostedTokenStore for InMemoryTokenStore {
    fn is_posted(&self, purchase_token: &str) -> CommonResult<bool> {
        Ok(self.tokens.read().contains(purchase_token))
    }

    fn mark_posted(&self, purchase_token: &str) -> CommonResult<()> {
        self.tokens.write().insert(purchase_token.to_string());
        Ok(())
    }
}
