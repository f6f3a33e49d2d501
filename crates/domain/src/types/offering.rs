//! Merchandising context attached to transactions

use serde::{Deserialize, Serialize};

/// Which merchandising surface led to a purchase
///
/// Carried through to the transaction for analytics; finalization ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedOfferingContext {
    pub offering_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_rule_id: Option<String>,
}

impl PresentedOfferingContext {
    pub fn new<S: Into<String>>(offering_identifier: S) -> Self {
        Self {
            offering_identifier: offering_identifier.into(),
            placement_identifier: None,
            targeting_rule_id: None,
        }
    }

    pub fn with_placement<S: Into<String>>(mut self, placement: S) -> Self {
        self.placement_identifier = Some(placement.into());
        self
    }
}
