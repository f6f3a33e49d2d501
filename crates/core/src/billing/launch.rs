//! Purchase flow launch requests

use sha2::{Digest, Sha256};
use storelink_domain::{
    ActivityHandle, BillingFlowParams, PresentedOfferingContext, ProductType, PurchasingData,
    ReplaceProductInfo,
};

/// Everything needed to launch one purchase flow
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub activity: ActivityHandle,
    pub app_user_id: String,
    pub purchasing_data: PurchasingData,
    pub replace_info: Option<ReplaceProductInfo>,
    pub offering_context: Option<PresentedOfferingContext>,
    pub is_personalized_price: bool,
}

impl LaunchRequest {
    pub fn new<S: Into<String>>(
        activity: ActivityHandle,
        app_user_id: S,
        purchasing_data: PurchasingData,
    ) -> Self {
        Self {
            activity,
            app_user_id: app_user_id.into(),
            purchasing_data,
            replace_info: None,
            offering_context: None,
            is_personalized_price: false,
        }
    }

    pub fn with_replace_info(mut self, replace_info: ReplaceProductInfo) -> Self {
        self.replace_info = Some(replace_info);
        self
    }

    pub fn with_offering_context(mut self, context: PresentedOfferingContext) -> Self {
        self.offering_context = Some(context);
        self
    }

    pub fn with_personalized_price(mut self, personalized: bool) -> Self {
        self.is_personalized_price = personalized;
        self
    }

    pub fn product_id(&self) -> &str {
        &self.purchasing_data.product_id
    }

    /// Context the update router attaches to the resulting transactions
    pub fn pending_context(&self) -> PendingLaunch {
        PendingLaunch {
            product_type: self.purchasing_data.product_type,
            offering_context: self.offering_context.clone(),
            subscription_option_id: self.purchasing_data.subscription_option_id.clone(),
        }
    }

    pub fn to_flow_params(&self) -> BillingFlowParams {
        BillingFlowParams {
            product_id: self.purchasing_data.product_id.clone(),
            product_type: self.purchasing_data.product_type,
            offer_token: self.purchasing_data.offer_token.clone(),
            obfuscated_account_id: obfuscate_account_id(&self.app_user_id),
            replace_info: self.replace_info.clone(),
            is_offer_personalized: self.is_personalized_price,
        }
    }
}

/// Launch metadata kept until the matching purchase update arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLaunch {
    pub product_type: ProductType,
    pub offering_context: Option<PresentedOfferingContext>,
    pub subscription_option_id: Option<String>,
}

/// SHA-256 of the app user id, hex encoded
pub fn obfuscate_account_id(app_user_id: &str) -> String {
    hex::encode(Sha256::digest(app_user_id.as_bytes()))
}
