use std::{env, fs};

use chrono::Duration;
use log::*;
use storekit_common::{parse_boolean_flag, Environment, Secret};

use crate::ConfigurationError;

/// Default bearer token lifetime. The platform allows up to an hour; a shorter life limits the damage a leaked token
/// can do.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::minutes(20);
pub const MAX_TOKEN_LIFETIME: Duration = Duration::minutes(60);

/// Everything needed to mint App Store Server API bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Contents of the `.p8` file downloaded from App Store Connect
    pub private_key: Secret<Vec<u8>>,
    /// Your private key ID from App Store Connect (Ex: 2X9R4HXF34)
    pub key_id: String,
    /// Your issuer ID from the Keys page in App Store Connect (Ex: "57246542-96fe-1a63-e053-0824d011072a")
    pub issuer_id: String,
    /// Your app's bundle ID
    pub bundle_id: String,
    pub environment: Environment,
}

impl Credentials {
    pub fn new(
        private_key: Vec<u8>,
        key_id: &str,
        issuer_id: &str,
        bundle_id: &str,
        environment: Environment,
    ) -> Self {
        Self {
            private_key: Secret::new(private_key),
            key_id: key_id.to_string(),
            issuer_id: issuer_id.to_string(),
            bundle_id: bundle_id.to_string(),
            environment,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.private_key.reveal().is_empty() {
            return Err(ConfigurationError::MissingValue("private key"));
        }
        if self.key_id.trim().is_empty() {
            return Err(ConfigurationError::MissingValue("key id"));
        }
        if self.issuer_id.trim().is_empty() {
            return Err(ConfigurationError::MissingValue("issuer id"));
        }
        if self.bundle_id.trim().is_empty() {
            return Err(ConfigurationError::MissingValue("bundle id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub credentials: Credentials,
    /// Files holding the pinned root certificates (DER or PEM) that signed payloads must chain up to
    pub root_certificates: Vec<String>,
    pub token_lifetime: Duration,
    /// Replaces the environment's API host. Only useful for testing.
    pub api_host: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            root_certificates: Vec::new(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            api_host: None,
        }
    }
}

impl StoreConfig {
    pub fn new(credentials: Credentials, root_certificates: Vec<String>) -> Self {
        Self { credentials, root_certificates, ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let private_key = private_key_from_env();
        let key_id = env::var("STOREKIT_KEY_ID").unwrap_or_else(|_| {
            warn!("STOREKIT_KEY_ID not set. Token generation will fail.");
            String::default()
        });
        let issuer_id = env::var("STOREKIT_ISSUER_ID").unwrap_or_else(|_| {
            warn!("STOREKIT_ISSUER_ID not set. Token generation will fail.");
            String::default()
        });
        let bundle_id = env::var("STOREKIT_BUNDLE_ID").unwrap_or_else(|_| {
            warn!("STOREKIT_BUNDLE_ID not set. Token generation will fail.");
            String::default()
        });
        let sandbox = parse_boolean_flag(env::var("STOREKIT_SANDBOX").ok(), false);
        let environment = Environment::from_sandbox_flag(sandbox);
        info!("🪛️ Using the {environment} environment");
        let root_certificates = env::var("STOREKIT_ROOT_CERTS")
            .map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
            .unwrap_or_else(|_| {
                warn!("STOREKIT_ROOT_CERTS not set. No signed payload can be verified.");
                Vec::new()
            });
        let token_lifetime = env::var("STOREKIT_TOKEN_LIFETIME")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| {
                        error!(
                            "🪛️ {s} is not a valid value for STOREKIT_TOKEN_LIFETIME. {e} Using the default of {} \
                             seconds instead.",
                            DEFAULT_TOKEN_LIFETIME.num_seconds()
                        )
                    })
                    .ok()
            })
            .map(Duration::seconds)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let api_host = env::var("STOREKIT_API_HOST").ok();
        let credentials = Credentials {
            private_key: Secret::new(private_key),
            key_id,
            issuer_id,
            bundle_id,
            environment,
        };
        Self { credentials, root_certificates, token_lifetime, api_host }
    }

    /// The API base URL for requests, honouring any host override
    pub fn host(&self) -> String {
        match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => self.credentials.environment.host().to_string(),
        }
    }
}

fn private_key_from_env() -> Vec<u8> {
    if let Ok(pem) = env::var("STOREKIT_PRIVATE_KEY") {
        return pem.into_bytes();
    }
    match env::var("STOREKIT_PRIVATE_KEY_PATH") {
        Ok(path) => fs::read(&path).unwrap_or_else(|e| {
            error!("🪛️ Could not read the private key at {path}. {e}");
            Vec::new()
        }),
        Err(_) => {
            warn!("Neither STOREKIT_PRIVATE_KEY nor STOREKIT_PRIVATE_KEY_PATH is set. Token generation will fail.");
            Vec::new()
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn credentials_must_be_complete() {
        let creds = Credentials::new(b"key".to_vec(), "KEYID", "issuer", "com.example.app", Environment::Sandbox);
        assert!(creds.validate().is_ok());
        let creds = Credentials { key_id: " ".into(), ..creds };
        assert!(matches!(creds.validate(), Err(ConfigurationError::MissingValue("key id"))));
        assert!(matches!(Credentials::default().validate(), Err(ConfigurationError::MissingValue("private key"))));
    }

    #[test]
    fn host_override() {
        let mut config = StoreConfig::default();
        assert_eq!(config.host(), "https://api.storekit.itunes.apple.com");
        config.credentials.environment = Environment::Sandbox;
        assert_eq!(config.host(), "https://api.storekit-sandbox.itunes.apple.com");
        config.api_host = Some("http://127.0.0.1:8080/".into());
        assert_eq!(config.host(), "http://127.0.0.1:8080");
    }
}
