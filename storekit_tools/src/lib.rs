//! Authentication for the App Store Server API.
//!
//! * Outbound: [`TokenIssuer`] mints and caches the short-lived ES256 bearer tokens every API request needs.
//! * Inbound: [`PayloadVerifier`] checks the `x5c` certificate chain and signature of the App Store's signed payloads
//!   (transactions, renewal info and server notifications) before handing back their claims.
//!
//! [`StoreApi`] ties the two together over HTTP.
mod api;
mod config;
mod error;
mod helpers;
mod key_material;
mod payload;
mod token_issuer;
mod trust_anchors;

mod data_objects;

pub mod chain;
pub mod claims;
pub mod jws;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::StoreApi;
pub use chain::{CertificateChain, ChainVerifier};
pub use config::{Credentials, StoreConfig, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME};
pub use data_objects::{
    ConsumptionRequest,
    ExtendRenewalDateRequest,
    ExtendRenewalDateResponse,
    HistoryResponse,
    LastTransactionsItem,
    NotificationHistoryItem,
    NotificationHistoryRequest,
    NotificationHistoryResponse,
    OrderLookupResponse,
    RefundLookupResponse,
    SendAttempt,
    StatusResponse,
    SubscriptionGroupIdentifierItem,
    TestNotificationResponse,
    TestNotificationStatus,
    TransactionHistoryQuery,
};
pub use error::{
    ChainValidationError,
    ConfigurationError,
    KeyFormatError,
    PayloadError,
    StoreApiError,
    TokenGenerationError,
};
pub use key_material::SigningKey;
pub use payload::PayloadVerifier;
pub use storekit_common::{Environment, Secret};
pub use token_issuer::{BearerToken, TokenClaims, TokenIssuer, AUDIENCE, SAFETY_MARGIN};
pub use trust_anchors::TrustAnchorSet;
