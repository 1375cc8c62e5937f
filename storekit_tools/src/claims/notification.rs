use serde::{Deserialize, Serialize};
use storekit_common::Environment;

/// The claims of an App Store Server Notification V2 (`responseBodyV2DecodedPayload`).
///
/// `data.signedTransactionInfo` and `data.signedRenewalInfo` are themselves signed payloads and need to be verified
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub notification_type: NotificationType,
    pub subtype: Option<NotificationSubtype>,
    #[serde(rename = "notificationUUID")]
    pub notification_uuid: String,
    pub version: Option<String>,
    pub signed_date: Option<i64>,
    pub data: Option<NotificationData>,
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub app_apple_id: Option<i64>,
    pub bundle_id: Option<String>,
    pub bundle_version: Option<String>,
    pub environment: Option<String>,
    pub signed_transaction_info: Option<String>,
    pub signed_renewal_info: Option<String>,
    pub status: Option<i32>,
}

impl NotificationData {
    pub fn environment(&self) -> Option<Environment> {
        super::parse_environment(self.environment.as_deref())
    }
}

/// Present instead of `data` for `RENEWAL_EXTENSION` / `SUMMARY` notifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub request_identifier: Option<String>,
    pub environment: Option<String>,
    pub app_apple_id: Option<i64>,
    pub bundle_id: Option<String>,
    pub product_id: Option<String>,
    pub storefront_country_codes: Option<Vec<String>>,
    pub succeeded_count: Option<i64>,
    pub failed_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Subscribed,
    DidChangeRenewalPref,
    DidChangeRenewalStatus,
    OfferRedeemed,
    DidRenew,
    Expired,
    DidFailToRenew,
    GracePeriodExpired,
    PriceIncrease,
    Refund,
    RefundDeclined,
    RefundReversed,
    ConsumptionRequest,
    RenewalExtended,
    RenewalExtension,
    Revoke,
    Test,
    ExternalPurchaseToken,
    OneTimeCharge,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSubtype {
    InitialBuy,
    Resubscribe,
    Downgrade,
    Upgrade,
    AutoRenewEnabled,
    AutoRenewDisabled,
    Voluntary,
    BillingRetry,
    PriceIncrease,
    GracePeriod,
    Pending,
    Accepted,
    BillingRecovery,
    ProductNotForSale,
    Summary,
    Failure,
    Unreported,
    #[serde(other)]
    Unknown,
}
