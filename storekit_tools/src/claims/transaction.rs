use serde::{Deserialize, Serialize};
use storekit_common::Environment;

/// The claims of a signed transaction (`JWSTransactionDecodedPayload`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwsTransaction {
    pub transaction_id: Option<String>,
    pub original_transaction_id: Option<String>,
    pub web_order_line_item_id: Option<String>,
    pub bundle_id: Option<String>,
    pub product_id: Option<String>,
    pub subscription_group_identifier: Option<String>,
    pub purchase_date: Option<i64>,
    pub original_purchase_date: Option<i64>,
    pub expires_date: Option<i64>,
    pub quantity: Option<i32>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub app_account_token: Option<String>,
    pub in_app_ownership_type: Option<InAppOwnershipType>,
    pub signed_date: Option<i64>,
    pub revocation_reason: Option<i32>,
    pub revocation_date: Option<i64>,
    pub is_upgraded: Option<bool>,
    pub offer_type: Option<OfferType>,
    pub offer_identifier: Option<String>,
    pub environment: Option<String>,
    pub storefront: Option<String>,
    pub storefront_id: Option<String>,
    pub transaction_reason: Option<String>,
    /// Price in milli-units of `currency`
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub offer_discount_type: Option<String>,
}

impl JwsTransaction {
    pub fn environment(&self) -> Option<Environment> {
        super::parse_environment(self.environment.as_deref())
    }

    pub fn is_revoked(&self) -> bool {
        self.revocation_date.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "Auto-Renewable Subscription")]
    AutoRenewableSubscription,
    #[serde(rename = "Non-Consumable")]
    NonConsumable,
    #[serde(rename = "Consumable")]
    Consumable,
    #[serde(rename = "Non-Renewing Subscription")]
    NonRenewingSubscription,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InAppOwnershipType {
    FamilyShared,
    Purchased,
    #[serde(other)]
    Unknown,
}

/// 1: introductory offer, 2: promotional offer, 3: offer code, 4: win-back offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum OfferType {
    Introductory,
    Promotional,
    OfferCode,
    WinBack,
    Other(i32),
}

impl From<i32> for OfferType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Introductory,
            2 => Self::Promotional,
            3 => Self::OfferCode,
            4 => Self::WinBack,
            v => Self::Other(v),
        }
    }
}

impl From<OfferType> for i32 {
    fn from(value: OfferType) -> Self {
        match value {
            OfferType::Introductory => 1,
            OfferType::Promotional => 2,
            OfferType::OfferCode => 3,
            OfferType::WinBack => 4,
            OfferType::Other(v) => v,
        }
    }
}
