//! Harness configuration.
//!
//! Configuration is loaded from environment variables. Only the collection URL,
//! suite selection and the addressing strategy are configurable.

use crate::locator::{Locator, DEFAULT_ID_FIELD};
use reqwest::Url;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Collection URL used when no override is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// How the harness derives resource references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorMode {
    /// Always use this strategy.
    Fixed(Locator),

    /// Pick from the first creation response of each suite.
    Detect { id_field: String },
}

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// URL of the resource collection (default: "http://localhost:8000/api").
    pub base_url: String,

    /// Suite keys to run. Empty means all.
    pub suites: Vec<String>,

    /// Addressing strategy (default: detect, identifier field "uuid").
    pub locator: LocatorMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid locator mode {0:?}: expected one of list, location, auto")]
    InvalidLocator(String),

    #[error("Unknown suite {0:?}")]
    UnknownSuite(String),

    #[error("Server not reachable at {host}:{port}. Start the server or set CONTRACT_BASE_URL")]
    Unreachable { host: String, port: u16 },

    #[error("Reachability probe did not complete: {0}")]
    ProbeFailed(String),
}

impl HarnessConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        // URL is the legacy name of the override
        let base_url = vars
            .get("CONTRACT_BASE_URL")
            .or_else(|| vars.get("URL"))
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_base_url(&base_url)?;

        let suites = vars
            .get("CONTRACT_SUITES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let id_field = vars
            .get("CONTRACT_ID_FIELD")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_ID_FIELD.to_string());

        let locator = match vars.get("CONTRACT_LOCATOR").map(|s| s.trim().to_ascii_lowercase()) {
            None => LocatorMode::Detect { id_field },
            Some(mode) => match mode.as_str() {
                "" | "auto" => LocatorMode::Detect { id_field },
                "list" => LocatorMode::Fixed(Locator::IdentifierInList { id_field }),
                "location" => LocatorMode::Fixed(Locator::LocationHeader),
                _ => return Err(ConfigError::InvalidLocator(mode)),
            },
        };

        Ok(Self {
            base_url,
            suites,
            locator,
        })
    }

    /// Configuration pointing at `base_url` with every other setting defaulted.
    pub fn for_url(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let vars = HashMap::from([("CONTRACT_BASE_URL".to_string(), base_url.into())]);
        Self::from_vars(&vars)
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
