use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Client,
    Method,
    Response,
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::StoreConfig,
    data_objects::{
        ConsumptionRequest,
        ExtendRenewalDateRequest,
        ExtendRenewalDateResponse,
        HistoryResponse,
        NotificationHistoryItem,
        NotificationHistoryRequest,
        NotificationHistoryResponse,
        OrderLookupResponse,
        RefundLookupResponse,
        StatusResponse,
        TestNotificationResponse,
        TestNotificationStatus,
        TransactionHistoryQuery,
    },
    helpers::fill_path,
    PayloadVerifier,
    StoreApiError,
    TokenIssuer,
    TrustAnchorSet,
};

pub const PATH_LOOKUP: &str = "/inApps/v1/lookup/{orderId}";
pub const PATH_TRANSACTION_HISTORY: &str = "/inApps/v1/history/{originalTransactionId}";
pub const PATH_REFUND_HISTORY: &str = "/inApps/v2/refund/lookup/{originalTransactionId}";
pub const PATH_SUBSCRIPTION_STATUSES: &str = "/inApps/v1/subscriptions/{originalTransactionId}";
pub const PATH_CONSUMPTION_INFO: &str = "/inApps/v1/transactions/consumption/{originalTransactionId}";
pub const PATH_EXTEND_RENEWAL_DATE: &str = "/inApps/v1/subscriptions/extend/{originalTransactionId}";
pub const PATH_NOTIFICATION_HISTORY: &str = "/inApps/v1/notifications/history";
pub const PATH_TEST_NOTIFICATION: &str = "/inApps/v1/notifications/test";
pub const PATH_TEST_NOTIFICATION_STATUS: &str = "/inApps/v1/notifications/test/{testNotificationToken}";

const USER_AGENT_VALUE: &str = "App Store Client";

/// Async client for the App Store Server API.
///
/// Requests are authorised with tokens from a shared [`TokenIssuer`]. Endpoints that return signed payloads hand them
/// back undecoded; run them through [`StoreApi::verifier`].
#[derive(Clone)]
pub struct StoreApi {
    host: String,
    client: Arc<Client>,
    tokens: Arc<TokenIssuer>,
    verifier: PayloadVerifier,
}

impl StoreApi {
    pub fn new(config: StoreConfig) -> Result<Self, StoreApiError> {
        let tokens = TokenIssuer::with_lifetime(&config.credentials, config.token_lifetime)?;
        let anchors = TrustAnchorSet::from_files(config.root_certificates.as_slice())?;
        Self::with_parts(config.host(), Arc::new(tokens), PayloadVerifier::new(anchors))
    }

    /// Builds a client around an existing token issuer and verifier, e.g. to share one issuer between clients.
    pub fn with_parts(
        host: String,
        tokens: Arc<TokenIssuer>,
        verifier: PayloadVerifier,
    ) -> Result<Self, StoreApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreApiError::Initialization(e.to_string()))?;
        info!("🚀️ App Store Server API client ready for {host}");
        Ok(Self { host, client: Arc::new(client), tokens, verifier })
    }

    pub fn verifier(&self) -> &PayloadVerifier {
        &self.verifier
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, StoreApiError> {
        let url = self.url(path);
        let token = self.tokens.current_token()?;
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url).header(AUTHORIZATION, format!("Bearer {token}"));
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| StoreApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("REST query successful. {status}");
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("🔐️ Bearer token was rejected. It will be regenerated for the next request.");
            self.tokens.invalidate();
        }
        let message = response.text().await.map_err(|e| StoreApiError::RestResponseError(e.to_string()))?;
        Err(StoreApiError::QueryError { status: status.as_u16(), message })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, StoreApiError> {
        let response = self.send(method, path, params, body).await?;
        response.json::<T>().await.map_err(|e| StoreApiError::JsonError(e.to_string()))
    }

    /// For endpoints that answer with an empty body
    async fn rest_command<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<u16, StoreApiError> {
        let response = self.send(method, path, &[], Some(body)).await?;
        Ok(response.status().as_u16())
    }

    pub async fn lookup_order_id(&self, order_id: &str) -> Result<OrderLookupResponse, StoreApiError> {
        let path = fill_path(PATH_LOOKUP, "orderId", order_id)?;
        debug!("Looking up order {order_id}");
        self.rest_query::<_, ()>(Method::GET, &path, &[], None).await
    }

    /// Fetches every page of a customer's transaction history, following `revision` until `hasMore` is false.
    pub async fn get_transaction_history(
        &self,
        original_transaction_id: &str,
        query: &TransactionHistoryQuery,
    ) -> Result<Vec<HistoryResponse>, StoreApiError> {
        let path = fill_path(PATH_TRANSACTION_HISTORY, "originalTransactionId", original_transaction_id)?;
        let base = query.to_params();
        let mut pages = Vec::new();
        let mut revision: Option<String> = None;
        loop {
            let mut params = base.clone();
            if let Some(r) = &revision {
                params.push(("revision", r.clone()));
            }
            let page = self.rest_query::<HistoryResponse, ()>(Method::GET, &path, &params, None).await?;
            let next = next_cursor(page.has_more, &page.revision, &revision);
            pages.push(page);
            match next {
                Some(r) => revision = Some(r),
                None => break,
            }
        }
        debug!("Fetched {} page(s) of transaction history for {original_transaction_id}", pages.len());
        Ok(pages)
    }

    pub async fn get_refund_history(
        &self,
        original_transaction_id: &str,
    ) -> Result<Vec<RefundLookupResponse>, StoreApiError> {
        let path = fill_path(PATH_REFUND_HISTORY, "originalTransactionId", original_transaction_id)?;
        let mut pages = Vec::new();
        let mut revision: Option<String> = None;
        loop {
            let params = revision.iter().map(|r| ("revision", r.clone())).collect::<Vec<_>>();
            let page = self.rest_query::<RefundLookupResponse, ()>(Method::GET, &path, &params, None).await?;
            let next = next_cursor(page.has_more, &page.revision, &revision);
            pages.push(page);
            match next {
                Some(r) => revision = Some(r),
                None => break,
            }
        }
        Ok(pages)
    }

    pub async fn get_all_subscription_statuses(
        &self,
        original_transaction_id: &str,
    ) -> Result<StatusResponse, StoreApiError> {
        let path = fill_path(PATH_SUBSCRIPTION_STATUSES, "originalTransactionId", original_transaction_id)?;
        self.rest_query::<_, ()>(Method::GET, &path, &[], None).await
    }

    /// Returns the HTTP status of the accepted request
    pub async fn send_consumption_info(
        &self,
        original_transaction_id: &str,
        body: &ConsumptionRequest,
    ) -> Result<u16, StoreApiError> {
        let path = fill_path(PATH_CONSUMPTION_INFO, "originalTransactionId", original_transaction_id)?;
        let status = self.rest_command(Method::PUT, &path, body).await?;
        info!("Sent consumption information for {original_transaction_id}");
        Ok(status)
    }

    pub async fn extend_subscription_renewal_date(
        &self,
        original_transaction_id: &str,
        body: &ExtendRenewalDateRequest,
    ) -> Result<ExtendRenewalDateResponse, StoreApiError> {
        let path = fill_path(PATH_EXTEND_RENEWAL_DATE, "originalTransactionId", original_transaction_id)?;
        let result = self.rest_query::<ExtendRenewalDateResponse, _>(Method::PUT, &path, &[], Some(body)).await?;
        info!("Extended renewal date of {original_transaction_id} by {} days", body.extend_by_days);
        Ok(result)
    }

    /// Collects the notification history across all pages.
    pub async fn get_notification_history(
        &self,
        body: &NotificationHistoryRequest,
    ) -> Result<Vec<NotificationHistoryItem>, StoreApiError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let params = token.iter().map(|t| ("paginationToken", t.clone())).collect::<Vec<_>>();
            let page: NotificationHistoryResponse =
                self.rest_query(Method::POST, PATH_NOTIFICATION_HISTORY, &params, Some(body)).await?;
            let next = next_cursor(page.has_more, &page.pagination_token, &token);
            items.extend(page.notification_history);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        Ok(items)
    }

    pub async fn request_test_notification(&self) -> Result<TestNotificationResponse, StoreApiError> {
        let result: TestNotificationResponse =
            self.rest_query::<_, ()>(Method::POST, PATH_TEST_NOTIFICATION, &[], None).await?;
        info!("Test notification requested. Token: {}", result.test_notification_token);
        Ok(result)
    }

    pub async fn get_test_notification_status(&self, token: &str) -> Result<TestNotificationStatus, StoreApiError> {
        let path = fill_path(PATH_TEST_NOTIFICATION_STATUS, "testNotificationToken", token)?;
        self.rest_query::<_, ()>(Method::GET, &path, &[], None).await
    }
}

/// The cursor for the next page, if there is one. A server that claims more pages but hands back no cursor, or the
/// same cursor again, would loop forever, so that ends pagination too.
fn next_cursor(has_more: bool, cursor: &str, previous: &Option<String>) -> Option<String> {
    if !has_more || cursor.is_empty() {
        return None;
    }
    if previous.as_deref() == Some(cursor) {
        warn!("Pagination cursor did not advance. Stopping.");
        return None;
    }
    Some(cursor.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pagination_cursor() {
        assert_eq!(next_cursor(false, "abc", &None), None);
        assert_eq!(next_cursor(true, "", &None), None);
        assert_eq!(next_cursor(true, "abc", &None), Some("abc".to_string()));
        assert_eq!(next_cursor(true, "abc", &Some("abc".to_string())), None);
        assert_eq!(next_cursor(true, "def", &Some("abc".to_string())), Some("def".to_string()));
    }
}
