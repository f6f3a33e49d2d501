//! Response classification
//!
//! Splits every store response into one of three buckets. The connection
//! manager retries `Recoverable` connection failures with backoff and never
//! retries `Terminal` ones.

use storelink_domain::{BillingResponse, BillingResult, ErrorKind};

/// Outcome bucket for a store response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    Recoverable,
    Terminal(ErrorKind),
}

impl ResponseClass {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub fn is_recoverable(self) -> bool {
        self == Self::Recoverable
    }
}

/// Classify a response code
///
/// The match is exhaustive so a newly added code fails to compile until it
/// has been placed in a bucket.
pub fn classify(response: BillingResponse) -> ResponseClass {
    match response {
        BillingResponse::Ok => ResponseClass::Success,
        BillingResponse::ServiceUnavailable
        | BillingResponse::Error
        | BillingResponse::NetworkError
        | BillingResponse::ServiceDisconnected
        | BillingResponse::UserCanceled
        | BillingResponse::ServiceTimeout => ResponseClass::Recoverable,
        BillingResponse::FeatureNotSupported
        | BillingResponse::BillingUnavailable
        | BillingResponse::ItemUnavailable
        | BillingResponse::ItemAlreadyOwned
        | BillingResponse::ItemNotOwned
        | BillingResponse::DeveloperError => ResponseClass::Terminal(response.error_kind()),
    }
}

/// Classify a full result, honouring the "billing version too old" message
///
/// The service reports an outdated store app as `BILLING_UNAVAILABLE` with a
/// version hint in the debug message; that case is a missing feature.
pub fn classify_result(result: &BillingResult) -> ResponseClass {
    if result.is_billing_version_unsupported() {
        return ResponseClass::Terminal(ErrorKind::FeatureNotSupported);
    }
    classify(result.response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_class_and_only_ok_succeeds() {
        for response in BillingResponse::ALL {
            let class = classify(response);
            assert_eq!(class.is_success(), response == BillingResponse::Ok, "{response}");
        }
    }

    #[test]
    fn terminal_codes_carry_caller_error_kind() {
        assert_eq!(
            classify(BillingResponse::ItemAlreadyOwned),
            ResponseClass::Terminal(ErrorKind::AlreadyOwned)
        );
        assert_eq!(
            classify(BillingResponse::DeveloperError),
            ResponseClass::Terminal(ErrorKind::Configuration)
        );
        assert_eq!(
            classify(BillingResponse::BillingUnavailable),
            ResponseClass::Terminal(ErrorKind::PurchaseNotAllowed)
        );
    }

    #[test]
    fn transient_codes_are_recoverable() {
        for response in [
            BillingResponse::ServiceUnavailable,
            BillingResponse::Error,
            BillingResponse::NetworkError,
            BillingResponse::ServiceDisconnected,
            BillingResponse::UserCanceled,
            BillingResponse::ServiceTimeout,
        ] {
            assert!(classify(response).is_recoverable(), "{response}");
        }
    }

    #[test]
    fn outdated_billing_version_is_feature_not_supported() {
        let result = BillingResult::with_message(
            BillingResponse::BillingUnavailable,
            "Billing API version is less than 3",
        );
        assert_eq!(
            classify_result(&result),
            ResponseClass::Terminal(ErrorKind::FeatureNotSupported)
        );
    }
}
