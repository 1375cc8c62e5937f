use serde::{Deserialize, Serialize};
use storekit_common::Environment;

use super::OfferType;

/// The claims of a signed subscription renewal record (`JWSRenewalInfoDecodedPayload`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwsRenewalInfo {
    pub original_transaction_id: Option<String>,
    pub auto_renew_product_id: Option<String>,
    pub product_id: Option<String>,
    pub auto_renew_status: Option<AutoRenewStatus>,
    pub expiration_intent: Option<ExpirationIntent>,
    pub is_in_billing_retry_period: Option<bool>,
    pub price_increase_status: Option<i32>,
    pub grace_period_expires_date: Option<i64>,
    pub offer_type: Option<OfferType>,
    pub offer_identifier: Option<String>,
    pub signed_date: Option<i64>,
    pub environment: Option<String>,
    pub recent_subscription_start_date: Option<i64>,
    pub renewal_date: Option<i64>,
}

impl JwsRenewalInfo {
    pub fn environment(&self) -> Option<Environment> {
        super::parse_environment(self.environment.as_deref())
    }

    pub fn will_auto_renew(&self) -> bool {
        self.auto_renew_status == Some(AutoRenewStatus::On)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum AutoRenewStatus {
    Off,
    On,
    Other(i32),
}

impl From<i32> for AutoRenewStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::On,
            v => Self::Other(v),
        }
    }
}

impl From<AutoRenewStatus> for i32 {
    fn from(value: AutoRenewStatus) -> Self {
        match value {
            AutoRenewStatus::Off => 0,
            AutoRenewStatus::On => 1,
            AutoRenewStatus::Other(v) => v,
        }
    }
}

/// Why a subscription lapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ExpirationIntent {
    CustomerCancelled,
    BillingError,
    DeclinedPriceIncrease,
    ProductUnavailable,
    Other(i32),
}

impl From<i32> for ExpirationIntent {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::CustomerCancelled,
            2 => Self::BillingError,
            3 => Self::DeclinedPriceIncrease,
            4 => Self::ProductUnavailable,
            v => Self::Other(v),
        }
    }
}

impl From<ExpirationIntent> for i32 {
    fn from(value: ExpirationIntent) -> Self {
        match value {
            ExpirationIntent::CustomerCancelled => 1,
            ExpirationIntent::BillingError => 2,
            ExpirationIntent::DeclinedPriceIncrease => 3,
            ExpirationIntent::ProductUnavailable => 4,
            ExpirationIntent::Other(v) => v,
        }
    }
}
