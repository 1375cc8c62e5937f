use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use storekit_tools::{
    claims::{JwsRenewalInfo, JwsTransaction, NotificationPayload},
    PayloadVerifier,
    StoreConfig,
    TrustAnchorSet,
};

use crate::{DecodeParams, PayloadKind};

pub fn new_payload_verifier(config: &StoreConfig) -> Result<PayloadVerifier> {
    let anchors = TrustAnchorSet::from_files(config.root_certificates.as_slice())
        .context("Set STOREKIT_ROOT_CERTS to a comma separated list of root certificate files")?;
    Ok(PayloadVerifier::new(anchors))
}

pub fn print_decoded_payload(params: DecodeParams) -> Result<()> {
    let config = StoreConfig::new_from_env_or_default();
    let verifier = new_payload_verifier(&config)?;
    let at = match params.at {
        Some(s) => DateTime::parse_from_rfc3339(&s).with_context(|| format!("Invalid time: {s}"))?.with_timezone(&Utc),
        None => Utc::now(),
    };
    let payload = params.payload.trim();
    let claims = match params.kind {
        PayloadKind::Transaction => serde_json::to_value(verifier.decode_at::<JwsTransaction>(payload, at)?)?,
        PayloadKind::Renewal => serde_json::to_value(verifier.decode_at::<JwsRenewalInfo>(payload, at)?)?,
        PayloadKind::Notification => serde_json::to_value(verifier.decode_at::<NotificationPayload>(payload, at)?)?,
    };
    println!("{}", to_pretty_json(&claims));
    Ok(())
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Could not represent claims as JSON. {e}"))
}
