use thiserror::Error;

/// Fatal problems found while building a client. Nothing is usable until these are fixed.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Missing configuration value: {0}")]
    MissingValue(&'static str),
    #[error("The private key is unusable. {0}")]
    InvalidKey(#[from] KeyFormatError),
    #[error("At least one trusted root certificate is required")]
    NoTrustAnchors,
    #[error("Trusted root certificate #{index} could not be loaded. {reason}")]
    InvalidTrustAnchor { index: usize, reason: String },
    #[error("Invalid token lifetime: {0}")]
    InvalidTokenLifetime(String),
    #[error("Could not read {path}. {reason}")]
    Io { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    #[error("Private key is not PEM encoded. {0}")]
    NotPem(String),
    #[error("Private key is not a PKCS#8 document. {0}")]
    NotPkcs8(String),
    #[error("Private key is not an elliptic curve key")]
    NotEllipticCurve,
    #[error("Private key is not on the P-256 curve")]
    UnsupportedCurve,
    #[error("Private key is malformed. {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, Error)]
pub enum TokenGenerationError {
    #[error("Could not sign bearer token. {0}")]
    SigningFailed(String),
    #[error("Could not compute the token expiry time")]
    InvalidExpiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainValidationError {
    #[error("The signed payload does not carry a usable x5c certificate chain. {0}")]
    MissingChain(String),
    #[error("Certificate #{index} in the chain is malformed. {reason}")]
    MalformedCertificate { index: usize, reason: String },
    #[error("The certificate chain is broken. {0}")]
    BrokenChain(String),
    #[error("Certificate #{index} is not valid at the verification time")]
    Expired { index: usize },
    #[error("The chain's root certificate is not a trusted anchor")]
    UntrustedRoot,
    #[error("The leaf certificate does not hold a P-256 public key")]
    UnsupportedKeyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Not a compact JWS. {0}")]
    MalformedPayload(String),
    #[error("Signing algorithm {0} is not accepted")]
    UnsupportedAlgorithm(String),
    #[error(transparent)]
    Chain(#[from] ChainValidationError),
    #[error("The payload signature is invalid")]
    SignatureInvalid,
    #[error("Could not decode payload claims. {0}")]
    MalformedClaims(String),
}

#[derive(Debug, Error)]
pub enum StoreApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid client configuration. {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Could not generate an access token. {0}")]
    Token(#[from] TokenGenerationError),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Signed payload rejected. {0}")]
    Payload(#[from] PayloadError),
}
