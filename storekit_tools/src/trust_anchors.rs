use std::fs;

use log::*;
use x509_cert::{
    der::{pem, Decode},
    Certificate,
};

use crate::ConfigurationError;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// The pinned root certificates that every signed payload's chain has to end in.
///
/// Roots are compared by their exact DER encoding. A certificate that merely carries the same subject name as a
/// pinned root is not trusted.
#[derive(Debug, Clone)]
pub struct TrustAnchorSet {
    roots: Vec<Vec<u8>>,
}

impl TrustAnchorSet {
    /// Each blob may be DER or PEM encoded.
    pub fn new<I, B>(blobs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let roots = blobs
            .into_iter()
            .enumerate()
            .map(|(index, blob)| {
                to_certificate_der(blob.as_ref())
                    .map_err(|reason| ConfigurationError::InvalidTrustAnchor { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if roots.is_empty() {
            return Err(ConfigurationError::NoTrustAnchors);
        }
        debug!("🔐️ {} trusted root certificate(s) loaded", roots.len());
        Ok(Self { roots })
    }

    pub fn from_files<P: AsRef<str>>(paths: &[P]) -> Result<Self, ConfigurationError> {
        let blobs = paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                fs::read(path).map_err(|e| ConfigurationError::Io { path: path.to_string(), reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(blobs)
    }

    pub fn contains(&self, der: &[u8]) -> bool {
        self.roots.iter().any(|root| root.as_slice() == der)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn to_certificate_der(blob: &[u8]) -> Result<Vec<u8>, String> {
    let start = blob.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(blob.len());
    let der = if blob[start..].starts_with(b"-----BEGIN") {
        let (label, der) = pem::decode_vec(&blob[start..]).map_err(|e| e.to_string())?;
        if label != CERTIFICATE_LABEL {
            return Err(format!("Expected a CERTIFICATE PEM block, found '{label}'"));
        }
        der
    } else {
        blob.to_vec()
    };
    Certificate::from_der(&der).map_err(|e| e.to_string())?;
    Ok(der)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::TestPki;

    #[test]
    fn at_least_one_anchor_is_required() {
        let err = TrustAnchorSet::new(Vec::<Vec<u8>>::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoTrustAnchors));
    }

    #[test]
    fn accepts_der_and_pem() {
        let pki = TestPki::generate();
        let anchors = TrustAnchorSet::new([pki.root_der(), pki.root.pem().into_bytes()]).unwrap();
        assert_eq!(anchors.len(), 2);
        assert!(anchors.contains(&pki.root_der()));
        assert!(!anchors.contains(&pki.intermediate.der().to_vec()));
    }

    #[test]
    fn rejects_blobs_that_are_not_certificates() {
        let pki = TestPki::generate();
        let err = TrustAnchorSet::new([pki.root_der(), b"not a certificate".to_vec()]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTrustAnchor { index: 1, .. }), "was {err:?}");
        let key_pem = pki.root_key.serialize_pem();
        let err = TrustAnchorSet::new([key_pem.as_bytes()]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTrustAnchor { index: 0, .. }), "was {err:?}");
    }

    #[test]
    fn missing_files_are_reported() {
        let err = TrustAnchorSet::from_files(&["/definitely/not/here.cer"]).unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }
}
