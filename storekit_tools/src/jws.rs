use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::PayloadError;

pub const ES256: &str = "ES256";

/// base64url as used by JOSE. Padding is tolerated on input but never produced.
pub const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_encode_padding(false).with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The protected header fields this crate cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub typ: Option<String>,
    /// Certificate chain, leaf first, each entry standard base64 DER
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

/// A compact JWS split into its three segments. Nothing has been verified yet.
#[derive(Debug, Clone, Copy)]
pub struct CompactJws<'a> {
    signing_input: &'a str,
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
}

impl<'a> CompactJws<'a> {
    pub fn parse(payload: &'a str) -> Result<Self, PayloadError> {
        let payload = payload.trim();
        let (signing_input, signature) = payload
            .rsplit_once('.')
            .ok_or_else(|| PayloadError::MalformedPayload("Expected three '.' separated segments".into()))?;
        let (header, claims) = signing_input
            .split_once('.')
            .ok_or_else(|| PayloadError::MalformedPayload("Expected three '.' separated segments".into()))?;
        if header.is_empty() || claims.contains('.') {
            return Err(PayloadError::MalformedPayload("Expected three '.' separated segments".into()));
        }
        Ok(Self { signing_input, header, claims, signature })
    }

    pub fn header(&self) -> Result<JwsHeader, PayloadError> {
        decode_json(self.header).map_err(|e| PayloadError::MalformedPayload(format!("Invalid JWS header. {e}")))
    }

    /// The bytes the signature covers: `header.claims` as transmitted
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    pub fn signature(&self) -> Option<Vec<u8>> {
        BASE64_URL.decode(self.signature).ok()
    }

    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        decode_json(self.claims).map_err(PayloadError::MalformedClaims)
    }
}

fn decode_json<T: DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = BASE64_URL.decode(segment).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
