//! Loading of the `.p8` private key that App Store Connect hands out for API access.
//!
//! The key must be a PEM-encoded PKCS#8 document holding a P-256 key. Loading runs through a fixed sequence of
//! checks so that each way a key can be unusable maps to its own [`KeyFormatError`]:
//!
//! 1. PEM decode. The label must be `PRIVATE KEY`.
//! 2. PKCS#8 structure parse.
//! 3. The algorithm must be `id-ecPublicKey`.
//! 4. The curve parameter must be `secp256r1`.
//! 5. The private scalar must be a valid P-256 secret.

use std::fmt;

use const_oid::ObjectIdentifier;
use jsonwebtoken::EncodingKey;
use p256::{ecdsa::VerifyingKey, SecretKey};
use pkcs8::{der::pem, DecodePrivateKey, EncodePrivateKey, PrivateKeyInfo};

use crate::KeyFormatError;

pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// A parsed ES256 signing key. It is created once and then only ever used to sign bearer tokens.
#[derive(Clone)]
pub struct SigningKey {
    encoding_key: EncodingKey,
    verifying_key: VerifyingKey,
}

impl SigningKey {
    pub fn from_pkcs8_pem(pem_bytes: &[u8]) -> Result<Self, KeyFormatError> {
        let der = decode_pem(pem_bytes)?;
        Self::from_pkcs8_der(&der)
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, KeyFormatError> {
        check_p256_pkcs8(der)?;
        let secret = SecretKey::from_pkcs8_der(der).map_err(|e| KeyFormatError::InvalidKey(e.to_string()))?;
        // Re-encode so that the public key is always embedded, which the signer requires
        let document = secret.to_pkcs8_der().map_err(|e| KeyFormatError::InvalidKey(e.to_string()))?;
        let encoding_key = EncodingKey::from_ec_der(document.as_bytes());
        let verifying_key = VerifyingKey::from(secret.public_key());
        Ok(Self { encoding_key, verifying_key })
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// The public half of the key, as registered with App Store Connect.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey").field("key", &"****").finish()
    }
}

fn decode_pem(pem_bytes: &[u8]) -> Result<Vec<u8>, KeyFormatError> {
    let (label, der) = pem::decode_vec(pem_bytes).map_err(|e| KeyFormatError::NotPem(e.to_string()))?;
    if label != PRIVATE_KEY_LABEL {
        return Err(KeyFormatError::NotPkcs8(format!("Unexpected PEM label '{label}'")));
    }
    Ok(der)
}

fn check_p256_pkcs8(der: &[u8]) -> Result<(), KeyFormatError> {
    let info = PrivateKeyInfo::try_from(der).map_err(|e| KeyFormatError::NotPkcs8(e.to_string()))?;
    if info.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(KeyFormatError::NotEllipticCurve);
    }
    let curve = info.algorithm.parameters_oid().map_err(|_| KeyFormatError::UnsupportedCurve)?;
    if curve != SECP256R1 {
        return Err(KeyFormatError::UnsupportedCurve);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use rcgen::{KeyPair, PKCS_ECDSA_P384_SHA384, PKCS_ED25519};

    use super::*;

    #[test]
    fn loads_p256_pkcs8_pem() {
        let pair = KeyPair::generate().unwrap();
        let key = SigningKey::from_pkcs8_pem(pair.serialize_pem().as_bytes()).unwrap();
        let expected = VerifyingKey::from_sec1_bytes(pair.public_key_raw()).unwrap();
        assert_eq!(key.verifying_key(), &expected);
        assert_eq!(format!("{key:?}"), "SigningKey { key: \"****\" }");
    }

    #[test]
    fn loads_p256_pkcs8_der() {
        let pair = KeyPair::generate().unwrap();
        assert!(SigningKey::from_pkcs8_der(&pair.serialize_der()).is_ok());
    }

    #[test]
    fn rejects_text_that_is_not_pem() {
        let err = SigningKey::from_pkcs8_pem(b"definitely not a key").unwrap_err();
        assert!(matches!(err, KeyFormatError::NotPem(_)), "was {err:?}");
    }

    #[test]
    fn rejects_pem_with_the_wrong_label() {
        let pair = KeyPair::generate().unwrap();
        let pem = pair.serialize_pem().replace("PRIVATE KEY", "CERTIFICATE");
        let err = SigningKey::from_pkcs8_pem(pem.as_bytes()).unwrap_err();
        assert!(matches!(err, KeyFormatError::NotPkcs8(_)), "was {err:?}");
    }

    #[test]
    fn rejects_garbage_der() {
        let err = SigningKey::from_pkcs8_der(&[0x30, 0x03, 0x02, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, KeyFormatError::NotPkcs8(_)), "was {err:?}");
    }

    #[test]
    fn rejects_other_curves() {
        let pair = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
        let err = SigningKey::from_pkcs8_pem(pair.serialize_pem().as_bytes()).unwrap_err();
        assert_eq!(err, KeyFormatError::UnsupportedCurve);
    }

    #[test]
    fn rejects_non_ec_keys() {
        let pair = KeyPair::generate_for(&PKCS_ED25519).unwrap();
        let err = SigningKey::from_pkcs8_pem(pair.serialize_pem().as_bytes()).unwrap_err();
        assert_eq!(err, KeyFormatError::NotEllipticCurve);
    }
}
