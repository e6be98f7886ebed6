//! Environment backed configuration
//!
//! Values are read when a client is built, never cached, so a `.env` change
//! between two invocations is picked up.

use std::fmt;

use crate::api::alpaca::{AlpacaClient, ApiError};

pub const API_KEY_VAR: &str = "ALPACA_API_KEY";
pub const SECRET_KEY_VAR: &str = "ALPACA_SECRET_KEY";
pub const DATA_URL_VAR: &str = "ALPACA_DATA_URL";
pub const DATA_FEED_VAR: &str = "ALPACA_DATA_FEED";

/// Alpaca API key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Read `ALPACA_API_KEY` and `ALPACA_SECRET_KEY` from the process environment
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(&lookup, API_KEY_VAR)
            .ok_or(ApiError::MissingCredential(API_KEY_VAR))?;
        let secret_key = non_empty(&lookup, SECRET_KEY_VAR)
            .ok_or(ApiError::MissingCredential(SECRET_KEY_VAR))?;
        Ok(Self { api_key, secret_key })
    }
}

// Keep secrets out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("secret_key", &"****")
            .finish()
    }
}

/// Optional overrides for the market data endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub feed: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: AlpacaClient::DEFAULT_BASE_URL.to_string(),
            feed: None,
        }
    }
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_url: non_empty(&lookup, DATA_URL_VAR)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            feed: non_empty(&lookup, DATA_FEED_VAR).map(|feed| feed.to_lowercase()),
        }
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn mask(key: &str) -> String {
    let shown: String = key.chars().take(4).collect();
    format!("{}****", shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(lookup(&[
            (API_KEY_VAR, "PKTEST"),
            (SECRET_KEY_VAR, " secret "),
        ]))
        .expect("credentials should load");
        assert_eq!(creds, Credentials::new("PKTEST", "secret"));
    }

    #[test]
    fn test_missing_secret_is_reported_by_name() {
        let err = Credentials::from_lookup(lookup(&[(API_KEY_VAR, "PKTEST"), (SECRET_KEY_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential(SECRET_KEY_VAR)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", Credentials::new("PKABCDEFG", "topsecret"));
        assert!(rendered.contains("PKAB****"));
        assert!(!rendered.contains("topsecret"));
    }

    #[test]
    fn test_provider_settings_overrides() {
        let settings = ProviderSettings::from_lookup(lookup(&[
            (DATA_URL_VAR, "http://localhost:9000/v2/"),
            (DATA_FEED_VAR, "IEX"),
        ]));
        assert_eq!(settings.base_url, "http://localhost:9000/v2");
        assert_eq!(settings.feed.as_deref(), Some("iex"));

        let defaults = ProviderSettings::from_lookup(lookup(&[]));
        assert_eq!(defaults, ProviderSettings::default());
    }
}
