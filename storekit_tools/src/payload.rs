use chrono::{DateTime, Utc};
use log::*;
use p256::ecdsa::{signature::Verifier, Signature};
use serde::de::DeserializeOwned;

use crate::{
    chain::ChainVerifier,
    claims::{JwsRenewalInfo, JwsTransaction, NotificationPayload},
    jws::{CompactJws, ES256},
    PayloadError,
    TrustAnchorSet,
};

/// Verifies App Store signed payloads and decodes their claims.
///
/// A payload is only decoded once its `alg` is `ES256`, its embedded certificate chain ends in one of the pinned roots,
/// and its signature checks out against the leaf certificate's key. Cloning is cheap; the trust anchors are shared.
#[derive(Debug, Clone)]
pub struct PayloadVerifier {
    chain_verifier: ChainVerifier,
}

impl PayloadVerifier {
    pub fn new(anchors: TrustAnchorSet) -> Self {
        Self { chain_verifier: ChainVerifier::new(anchors) }
    }

    pub fn chain_verifier(&self) -> &ChainVerifier {
        &self.chain_verifier
    }

    pub fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, PayloadError> {
        self.decode_at(payload, Utc::now())
    }

    /// As [`decode`](Self::decode), checking certificate validity at `at` instead of now.
    pub fn decode_at<T: DeserializeOwned>(&self, payload: &str, at: DateTime<Utc>) -> Result<T, PayloadError> {
        let jws = CompactJws::parse(payload)?;
        let header = jws.header()?;
        if header.alg != ES256 {
            warn!("🔐️ Rejected signed payload using the {} algorithm", header.alg);
            return Err(PayloadError::UnsupportedAlgorithm(header.alg));
        }
        let key = self.chain_verifier.verify_x5c_at(header.x5c.as_deref(), at)?;
        let verified = jws
            .signature()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
            .is_some_and(|signature| key.verify(jws.signing_input().as_bytes(), &signature).is_ok());
        if !verified {
            warn!("🔐️ Signed payload has an invalid signature");
            return Err(PayloadError::SignatureInvalid);
        }
        jws.claims()
    }

    pub fn decode_transaction(&self, payload: &str) -> Result<JwsTransaction, PayloadError> {
        self.decode(payload)
    }

    pub fn decode_renewal_info(&self, payload: &str) -> Result<JwsRenewalInfo, PayloadError> {
        self.decode(payload)
    }

    pub fn decode_notification(&self, payload: &str) -> Result<NotificationPayload, PayloadError> {
        self.decode(payload)
    }

    /// Decodes every payload that verifies, in input order. Payloads that fail are logged and left out.
    pub fn decode_all<T: DeserializeOwned, S: AsRef<str>>(&self, payloads: &[S]) -> Vec<T> {
        self.decode_all_at(payloads, Utc::now())
    }

    pub fn decode_all_at<T: DeserializeOwned, S: AsRef<str>>(&self, payloads: &[S], at: DateTime<Utc>) -> Vec<T> {
        payloads
            .iter()
            .enumerate()
            .filter_map(|(i, p)| match self.decode_at(p.as_ref(), at) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    warn!("🔐️ Skipping signed payload #{i}. {e}");
                    None
                },
            })
            .collect()
    }

    /// One result per payload, in input order.
    pub fn decode_each<T: DeserializeOwned, S: AsRef<str>>(&self, payloads: &[S]) -> Vec<Result<T, PayloadError>> {
        let now = Utc::now();
        payloads.iter().map(|p| self.decode_at(p.as_ref(), now)).collect()
    }
}
