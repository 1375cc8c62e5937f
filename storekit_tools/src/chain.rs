//! # Certificate chain verification for signed payloads
//!
//! Every JWS the App Store produces carries its signing certificate chain in the `x5c` header, ordered
//! `[leaf, intermediate, root]`. The payload can only be trusted if that chain holds up, so verification runs
//! through these steps in order, each with its own failure:
//!
//! | step        | check                                                            | failure                |
//! |-------------|------------------------------------------------------------------|------------------------|
//! | extract     | `x5c` is present and holds exactly three entries                 | `MissingChain`         |
//! | parse       | every entry is base64 DER X.509                                  | `MalformedCertificate` |
//! | links       | leaf is issued and signed by intermediate, intermediate by root  | `BrokenChain`          |
//! |             | and both issuers are CAs allowed to sign certificates            |                        |
//! | validity    | `not_before <= t <= not_after` for every certificate             | `Expired`              |
//! | anchor      | the root is byte-for-byte one of the pinned roots                | `UntrustedRoot`        |
//! | leaf key    | the leaf holds a P-256 public key                                | `UnsupportedKeyType`   |
//!
//! The verifier holds no mutable state and can be shared freely between threads.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use log::*;
use p256::{
    ecdsa::{signature::hazmat::PrehashVerifier, VerifyingKey},
    pkcs8::DecodePublicKey,
};
use sha2::{Digest, Sha256, Sha384};
use x509_cert::{
    der::{Decode, Encode},
    ext::pkix::{BasicConstraints, KeyUsage},
    Certificate,
};

use crate::{jws::CompactJws, ChainValidationError, TrustAnchorSet};

pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

const CHAIN_LENGTH: usize = 3;
const LEAF: usize = 0;
const INTERMEDIATE: usize = 1;
const ROOT: usize = 2;

/// The parsed `[leaf, intermediate, root]` triple from a single payload.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: [Certificate; CHAIN_LENGTH],
    root_der: Vec<u8>,
}

impl CertificateChain {
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[LEAF]
    }

    pub fn intermediate(&self) -> &Certificate {
        &self.certificates[INTERMEDIATE]
    }

    pub fn root(&self) -> &Certificate {
        &self.certificates[ROOT]
    }

    pub fn root_der(&self) -> &[u8] {
        &self.root_der
    }
}

#[derive(Debug, Clone)]
pub struct ChainVerifier {
    anchors: Arc<TrustAnchorSet>,
}

impl ChainVerifier {
    pub fn new(anchors: TrustAnchorSet) -> Self {
        Self { anchors: Arc::new(anchors) }
    }

    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    /// Validates the chain embedded in `payload` as of now and returns the leaf's public key.
    pub fn verify_chain(&self, payload: &str) -> Result<VerifyingKey, ChainValidationError> {
        self.verify_chain_at(payload, Utc::now())
    }

    pub fn verify_chain_at(&self, payload: &str, at: DateTime<Utc>) -> Result<VerifyingKey, ChainValidationError> {
        let header = CompactJws::parse(payload)
            .and_then(|jws| jws.header())
            .map_err(|e| ChainValidationError::MissingChain(e.to_string()))?;
        self.verify_x5c_at(header.x5c.as_deref(), at)
    }

    /// Runs the verification pipeline on an already extracted `x5c` header value.
    pub fn verify_x5c_at(
        &self,
        x5c: Option<&[String]>,
        at: DateTime<Utc>,
    ) -> Result<VerifyingKey, ChainValidationError> {
        let result = extract_chain(x5c).and_then(parse_chain).and_then(|chain| {
            check_links(&chain)?;
            check_validity(&chain, at)?;
            check_anchor(&chain, &self.anchors)?;
            leaf_public_key(&chain)
        });
        match &result {
            Ok(_) => trace!("🔐️ Certificate chain verified"),
            Err(e) => warn!("🔐️ Certificate chain rejected. {e}"),
        }
        result
    }
}

pub(crate) fn extract_chain(x5c: Option<&[String]>) -> Result<&[String], ChainValidationError> {
    let x5c = x5c.ok_or_else(|| ChainValidationError::MissingChain("No x5c header".into()))?;
    if x5c.len() != CHAIN_LENGTH {
        return Err(ChainValidationError::MissingChain(format!(
            "Expected {CHAIN_LENGTH} certificates in x5c, found {}",
            x5c.len()
        )));
    }
    Ok(x5c)
}

pub(crate) fn parse_chain(encoded: &[String]) -> Result<CertificateChain, ChainValidationError> {
    let ders = encoded
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            STANDARD
                .decode(entry)
                .map_err(|e| ChainValidationError::MalformedCertificate { index, reason: e.to_string() })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let parse = |index: usize| {
        Certificate::from_der(&ders[index])
            .map_err(|e| ChainValidationError::MalformedCertificate { index, reason: e.to_string() })
    };
    let certificates = [parse(LEAF)?, parse(INTERMEDIATE)?, parse(ROOT)?];
    let root_der = ders[ROOT].clone();
    Ok(CertificateChain { certificates, root_der })
}

pub(crate) fn check_links(chain: &CertificateChain) -> Result<(), ChainValidationError> {
    // The root vouches for one CA below it
    check_issuer_capability(chain.root(), 1)
        .map_err(|e| ChainValidationError::BrokenChain(format!("Root may not issue this chain. {e}")))?;
    check_issuer_capability(chain.intermediate(), 0)
        .map_err(|e| ChainValidationError::BrokenChain(format!("Intermediate may not issue certificates. {e}")))?;
    verify_issued_by(chain.intermediate(), chain.root())
        .map_err(|e| ChainValidationError::BrokenChain(format!("Intermediate is not vouched for by root. {e}")))?;
    verify_issued_by(chain.leaf(), chain.intermediate())
        .map_err(|e| ChainValidationError::BrokenChain(format!("Leaf is not vouched for by intermediate. {e}")))
}

pub(crate) fn check_validity(chain: &CertificateChain, at: DateTime<Utc>) -> Result<(), ChainValidationError> {
    let t = at.timestamp();
    for (index, cert) in chain.certificates.iter().enumerate() {
        let validity = &cert.tbs_certificate.validity;
        let not_before = unix_seconds(validity.not_before.to_unix_duration().as_secs());
        let not_after = unix_seconds(validity.not_after.to_unix_duration().as_secs());
        if t < not_before || t > not_after {
            return Err(ChainValidationError::Expired { index });
        }
    }
    Ok(())
}

pub(crate) fn check_anchor(chain: &CertificateChain, anchors: &TrustAnchorSet) -> Result<(), ChainValidationError> {
    if anchors.contains(chain.root_der()) {
        Ok(())
    } else {
        Err(ChainValidationError::UntrustedRoot)
    }
}

pub(crate) fn leaf_public_key(chain: &CertificateChain) -> Result<VerifyingKey, ChainValidationError> {
    let spki = chain
        .leaf()
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|_| ChainValidationError::UnsupportedKeyType)?;
    VerifyingKey::from_public_key_der(&spki).map_err(|_| ChainValidationError::UnsupportedKeyType)
}

fn unix_seconds(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Public keys a certificate in the chain may be signed with
enum IssuerKey {
    P256(VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl IssuerKey {
    fn from_certificate(cert: &Certificate) -> Result<Self, String> {
        let spki = cert.tbs_certificate.subject_public_key_info.to_der().map_err(|e| e.to_string())?;
        if let Ok(key) = VerifyingKey::from_public_key_der(&spki) {
            return Ok(Self::P256(key));
        }
        p384::ecdsa::VerifyingKey::from_public_key_der(&spki)
            .map(Self::P384)
            .map_err(|_| "Issuer key is neither P-256 nor P-384".to_string())
    }

    fn verify(&self, algorithm: &ObjectIdentifier, message: &[u8], der_signature: &[u8]) -> Result<(), String> {
        let digest = if *algorithm == ECDSA_WITH_SHA256 {
            Sha256::digest(message).to_vec()
        } else if *algorithm == ECDSA_WITH_SHA384 {
            Sha384::digest(message).to_vec()
        } else {
            return Err(format!("Unsupported signature algorithm {algorithm}"));
        };
        match self {
            Self::P256(key) => {
                let signature = p256::ecdsa::Signature::from_der(der_signature).map_err(|e| e.to_string())?;
                key.verify_prehash(&digest, &signature).map_err(|_| "Signature mismatch".to_string())
            },
            Self::P384(key) => {
                let signature = p384::ecdsa::Signature::from_der(der_signature).map_err(|e| e.to_string())?;
                key.verify_prehash(&digest, &signature).map_err(|_| "Signature mismatch".to_string())
            },
        }
    }
}

/// An issuer must be marked as a CA, may sign certificates if it restricts key usage at all, and must allow
/// `cas_below` intermediate CAs beneath it.
fn check_issuer_capability(issuer: &Certificate, cas_below: u8) -> Result<(), String> {
    let tbs = &issuer.tbs_certificate;
    let constraints = tbs.get::<BasicConstraints>().map_err(|e| e.to_string())?.map(|(_, ext)| ext);
    match constraints {
        Some(BasicConstraints { ca: true, path_len_constraint }) => {
            if path_len_constraint.is_some_and(|len| len < cas_below) {
                return Err("Path length constraint exceeded".into());
            }
        },
        _ => return Err("Certificate is not a CA".into()),
    }
    match tbs.get::<KeyUsage>().map_err(|e| e.to_string())? {
        Some((_, usage)) if !usage.key_cert_sign() => Err("Key usage does not include keyCertSign".into()),
        _ => Ok(()),
    }
}

fn verify_issued_by(child: &Certificate, issuer: &Certificate) -> Result<(), String> {
    if child.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Err("Issuer name does not match the parent's subject".into());
    }
    let tbs = child.tbs_certificate.to_der().map_err(|e| e.to_string())?;
    let signature = child.signature.as_bytes().ok_or("Signature is not a whole number of bytes")?;
    let key = IssuerKey::from_certificate(issuer)?;
    key.verify(&child.signature_algorithm.oid, &tbs, signature)
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone};
    use rcgen::{BasicConstraints, IsCa, KeyUsagePurpose, PKCS_ECDSA_P384_SHA384};

    use super::*;
    use crate::test_utils::{pki::x5c, TestPki};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    fn parsed(pki: &TestPki) -> CertificateChain {
        parse_chain(&x5c(&pki.chain())).unwrap()
    }

    #[test]
    fn valid_chain_yields_the_leaf_key() {
        let pki = TestPki::generate();
        let verifier = ChainVerifier::new(TrustAnchorSet::new([pki.root_der()]).unwrap());
        let payload = pki.sign_payload(&serde_json::json!({"hello": "world"}));
        let key = verifier.verify_chain_at(&payload, now()).unwrap();
        let expected = VerifyingKey::from_sec1_bytes(pki.leaf_key.public_key_raw()).unwrap();
        assert_eq!(key, expected);
    }

    #[test]
    fn extract_requires_three_entries() {
        assert!(matches!(extract_chain(None), Err(ChainValidationError::MissingChain(_))));
        let two = vec!["AA==".to_string(); 2];
        assert!(matches!(extract_chain(Some(&two)), Err(ChainValidationError::MissingChain(_))));
        let three = vec!["AA==".to_string(); 3];
        assert_eq!(extract_chain(Some(&three)).unwrap().len(), 3);
    }

    #[test]
    fn payload_without_x5c_is_missing_chain() {
        let pki = TestPki::generate();
        let verifier = ChainVerifier::new(TrustAnchorSet::new([pki.root_der()]).unwrap());
        let payload = crate::test_utils::pki::unsigned_payload(&serde_json::json!({"alg": "ES256"}), &1, b"sig");
        let err = verifier.verify_chain_at(&payload, now()).unwrap_err();
        assert!(matches!(err, ChainValidationError::MissingChain(_)), "was {err:?}");
        let err = verifier.verify_chain_at("not-a-jws", now()).unwrap_err();
        assert!(matches!(err, ChainValidationError::MissingChain(_)), "was {err:?}");
    }

    #[test]
    fn parse_reports_the_bad_entry() {
        let pki = TestPki::generate();
        let mut encoded = x5c(&pki.chain());
        encoded[1] = "!!not base64!!".into();
        let err = parse_chain(&encoded).unwrap_err();
        assert!(matches!(err, ChainValidationError::MalformedCertificate { index: 1, .. }), "was {err:?}");
        let mut encoded = x5c(&pki.chain());
        encoded[2] = STANDARD.encode(b"definitely not DER");
        let err = parse_chain(&encoded).unwrap_err();
        assert!(matches!(err, ChainValidationError::MalformedCertificate { index: 2, .. }), "was {err:?}");
    }

    #[test]
    fn links_hold_for_a_genuine_chain() {
        let pki = TestPki::generate();
        assert!(check_links(&parsed(&pki)).is_ok());
    }

    #[test]
    fn intermediate_signed_by_someone_else_breaks_the_chain() {
        let genuine = TestPki::generate();
        // Same subject names, different keys
        let impostor = TestPki::generate();
        let spliced = [impostor.leaf.der().to_vec(), impostor.intermediate.der().to_vec(), genuine.root_der()];
        let chain = parse_chain(&x5c(&spliced)).unwrap();
        let err = check_links(&chain).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
    }

    #[test]
    fn leaf_from_another_intermediate_breaks_the_chain() {
        let genuine = TestPki::generate();
        let impostor = TestPki::generate();
        let spliced = [impostor.leaf.der().to_vec(), genuine.intermediate.der().to_vec(), genuine.root_der()];
        let err = check_links(&parse_chain(&x5c(&spliced)).unwrap()).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
    }

    #[test]
    fn end_entity_intermediate_breaks_the_chain() {
        let pki = TestPki::builder().intermediate_ca(IsCa::ExplicitNoCa).build();
        let err = check_links(&parsed(&pki)).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
        // No basicConstraints at all is no better
        let pki = TestPki::builder().intermediate_ca(IsCa::NoCa).build();
        let err = check_links(&parsed(&pki)).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
    }

    #[test]
    fn intermediate_key_usage_must_allow_certificate_signing() {
        let pki = TestPki::builder().intermediate_key_usages(vec![KeyUsagePurpose::DigitalSignature]).build();
        let err = check_links(&parsed(&pki)).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
        let usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
        let pki = TestPki::builder().intermediate_key_usages(usages).build();
        assert!(check_links(&parsed(&pki)).is_ok());
    }

    #[test]
    fn root_path_length_must_allow_an_intermediate() {
        let pki = TestPki::builder().root_constraints(BasicConstraints::Constrained(0)).build();
        let err = check_links(&parsed(&pki)).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
        let pki = TestPki::builder().root_constraints(BasicConstraints::Constrained(1)).build();
        assert!(check_links(&parsed(&pki)).is_ok());
    }

    #[test]
    fn out_of_order_chain_is_broken() {
        let pki = TestPki::generate();
        let reordered = [pki.intermediate.der().to_vec(), pki.leaf.der().to_vec(), pki.root_der()];
        let err = check_links(&parse_chain(&x5c(&reordered)).unwrap()).unwrap_err();
        assert!(matches!(err, ChainValidationError::BrokenChain(_)), "was {err:?}");
    }

    #[test]
    fn validity_window_is_inclusive() {
        let pki = TestPki::builder().leaf_validity((2021, 1, 1), (2030, 1, 1)).build();
        let chain = parsed(&pki);
        let t0 = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(check_validity(&chain, t0).is_ok());
        assert!(check_validity(&chain, t1).is_ok());
        assert_eq!(check_validity(&chain, t1 + Duration::seconds(1)), Err(ChainValidationError::Expired { index: 0 }));
        assert_eq!(check_validity(&chain, t0 - Duration::seconds(1)), Err(ChainValidationError::Expired { index: 0 }));
    }

    #[test]
    fn anchor_must_match_exactly() {
        let pki = TestPki::generate();
        let stranger = TestPki::generate();
        let chain = parsed(&pki);
        assert!(check_anchor(&chain, &TrustAnchorSet::new([pki.root_der()]).unwrap()).is_ok());
        let anchors = TrustAnchorSet::new([stranger.root_der()]).unwrap();
        assert_eq!(check_anchor(&chain, &anchors), Err(ChainValidationError::UntrustedRoot));
    }

    #[test]
    fn self_consistent_chain_with_unpinned_root_is_untrusted() {
        let pki = TestPki::generate();
        let stranger = TestPki::generate();
        let verifier = ChainVerifier::new(TrustAnchorSet::new([stranger.root_der()]).unwrap());
        let payload = pki.sign_payload(&serde_json::json!({}));
        assert_eq!(verifier.verify_chain_at(&payload, now()), Err(ChainValidationError::UntrustedRoot));
    }

    #[test]
    fn leaf_must_hold_a_p256_key() {
        let pki = TestPki::builder().leaf_algorithm(&PKCS_ECDSA_P384_SHA384).build();
        let chain = parsed(&pki);
        assert!(check_links(&chain).is_ok());
        assert_eq!(leaf_public_key(&chain), Err(ChainValidationError::UnsupportedKeyType));
        let verifier = ChainVerifier::new(TrustAnchorSet::new([pki.root_der()]).unwrap());
        let header = serde_json::json!({"alg": "ES256", "x5c": x5c(&pki.chain())});
        let payload = crate::test_utils::pki::unsigned_payload(&header, &serde_json::json!({}), &[0u8; 64]);
        assert_eq!(verifier.verify_chain_at(&payload, now()), Err(ChainValidationError::UnsupportedKeyType));
    }
}
