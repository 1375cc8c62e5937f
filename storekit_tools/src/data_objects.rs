use serde::{Deserialize, Serialize};

/// One page of `GET /inApps/v1/history/{originalTransactionId}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub revision: String,
    pub bundle_id: Option<String>,
    pub app_apple_id: Option<i64>,
    pub environment: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub signed_transactions: Vec<String>,
}

/// Optional filters for the transaction history endpoint
#[derive(Debug, Clone, Default)]
pub struct TransactionHistoryQuery {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub product_ids: Vec<String>,
    pub product_types: Vec<String>,
    /// `ASCENDING` or `DESCENDING`
    pub sort: Option<String>,
    pub subscription_group_identifiers: Vec<String>,
    pub in_app_ownership_type: Option<String>,
    pub revoked: Option<bool>,
}

impl TransactionHistoryQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(d) = self.start_date {
            params.push(("startDate", d.to_string()));
        }
        if let Some(d) = self.end_date {
            params.push(("endDate", d.to_string()));
        }
        params.extend(self.product_ids.iter().map(|p| ("productId", p.clone())));
        params.extend(self.product_types.iter().map(|p| ("productType", p.clone())));
        if let Some(s) = &self.sort {
            params.push(("sort", s.clone()));
        }
        params.extend(self.subscription_group_identifiers.iter().map(|s| ("subscriptionGroupIdentifier", s.clone())));
        if let Some(t) = &self.in_app_ownership_type {
            params.push(("inAppOwnershipType", t.clone()));
        }
        if let Some(r) = self.revoked {
            params.push(("revoked", r.to_string()));
        }
        params
    }
}

/// One page of `GET /inApps/v2/refund/lookup/{originalTransactionId}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundLookupResponse {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub signed_transactions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLookupResponse {
    /// 0: valid order, 1: invalid order
    pub status: i32,
    #[serde(default)]
    pub signed_transactions: Vec<String>,
}

impl OrderLookupResponse {
    pub fn is_valid(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub environment: Option<String>,
    pub bundle_id: Option<String>,
    pub app_apple_id: Option<i64>,
    #[serde(default)]
    pub data: Vec<SubscriptionGroupIdentifierItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionGroupIdentifierItem {
    pub subscription_group_identifier: String,
    #[serde(default)]
    pub last_transactions: Vec<LastTransactionsItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastTransactionsItem {
    pub original_transaction_id: String,
    /// 1: active, 2: expired, 3: billing retry, 4: grace period, 5: revoked
    pub status: i32,
    pub signed_transaction_info: String,
    pub signed_renewal_info: String,
}

/// Body of `PUT /inApps/v1/transactions/consumption/{originalTransactionId}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRequest {
    pub customer_consented: bool,
    pub consumption_status: i32,
    pub platform: i32,
    pub sample_content_provided: bool,
    pub delivery_status: i32,
    pub app_account_token: String,
    pub account_tenure: i32,
    pub play_time: i32,
    pub lifetime_dollars_refunded: i32,
    pub lifetime_dollars_purchased: i32,
    pub user_status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_preference: Option<i32>,
}

/// Body of `PUT /inApps/v1/subscriptions/extend/{originalTransactionId}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRenewalDateRequest {
    /// At most 90
    pub extend_by_days: i32,
    pub extend_reason_code: i32,
    pub request_identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRenewalDateResponse {
    pub original_transaction_id: Option<String>,
    pub web_order_line_item_id: Option<String>,
    #[serde(default)]
    pub success: bool,
    pub effective_date: Option<i64>,
}

/// Body of `POST /inApps/v1/notifications/history`. Dates are in milliseconds since the epoch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationHistoryRequest {
    pub start_date: i64,
    pub end_date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_failures: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationHistoryResponse {
    #[serde(default)]
    pub pagination_token: String,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub notification_history: Vec<NotificationHistoryItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationHistoryItem {
    pub signed_payload: String,
    #[serde(default)]
    pub send_attempts: Vec<SendAttempt>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAttempt {
    pub attempt_date: i64,
    pub send_attempt_result: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationResponse {
    pub test_notification_token: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationStatus {
    pub signed_payload: String,
    #[serde(default)]
    pub send_attempts: Vec<SendAttempt>,
}
