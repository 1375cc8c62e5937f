//! Decoded claim records for the three kinds of signed payload the App Store produces.
//!
//! Field names follow the wire format (camelCase). Anything that is not present on every payload is an `Option`, and
//! timestamps are left as the integer milliseconds the App Store sends.
mod notification;
mod renewal_info;
mod transaction;

use storekit_common::Environment;

pub use notification::{NotificationData, NotificationPayload, NotificationSubtype, NotificationType, Summary};
pub use renewal_info::{AutoRenewStatus, ExpirationIntent, JwsRenewalInfo};
pub use transaction::{InAppOwnershipType, JwsTransaction, OfferType, TransactionType};

/// Interprets the free-form `environment` claim. Values such as `Xcode` or `LocalTesting` have no counterpart and
/// yield `None`.
pub(crate) fn parse_environment(value: Option<&str>) -> Option<Environment> {
    value.and_then(|s| s.parse().ok())
}
