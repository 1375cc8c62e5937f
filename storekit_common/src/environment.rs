use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HOST_PRODUCTION: &str = "https://api.storekit.itunes.apple.com";
pub const HOST_SANDBOX: &str = "https://api.storekit-sandbox.itunes.apple.com";

/// The App Store environment a client talks to, and that signed payloads report in their `environment` claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    Sandbox,
    #[default]
    Production,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown App Store environment: {0}")]
pub struct EnvironmentParseError(String);

impl Environment {
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox {
            Self::Sandbox
        } else {
            Self::Production
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, Self::Sandbox)
    }

    /// Base URL of the App Store Server API for this environment
    pub fn host(&self) -> &'static str {
        match self {
            Self::Sandbox => HOST_SANDBOX,
            Self::Production => HOST_PRODUCTION,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => f.write_str("Sandbox"),
            Self::Production => f.write_str("Production"),
        }
    }
}

impl FromStr for Environment {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(EnvironmentParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hosts_follow_environment() {
        assert_eq!(Environment::from_sandbox_flag(true).host(), HOST_SANDBOX);
        assert_eq!(Environment::from_sandbox_flag(false).host(), HOST_PRODUCTION);
        assert_eq!(Environment::default(), Environment::Production);
    }

    #[test]
    fn parse_environment() {
        assert_eq!("Sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }
}
