//! Store connection settings read from the environment.

use reqwest::Url;

use crate::errors::ConfigError;

/// Base endpoint of the hosted store.
pub const STORE_URL: &str = "STORE_URL";
/// Restricted credential: read plus insert under row-level policy.
pub const PUBLIC_KEY: &str = "PUBLIC_KEY";
/// Elevated credential: bypasses row-level policy, required for schema changes.
pub const SERVICE_KEY: &str = "SERVICE_KEY";

/// Trust tier of the credential an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTier {
    Public,
    Service,
}

impl CredentialTier {
    /// Environment variable holding the credential for this tier.
    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialTier::Public => PUBLIC_KEY,
            CredentialTier::Service => SERVICE_KEY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: Url,
    pub public_key: Option<String>,
    pub service_key: Option<String>,
}

impl StoreConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = read(STORE_URL).ok_or(ConfigError::Missing(STORE_URL))?;
        let url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: raw_url,
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        Ok(Self {
            url,
            public_key: read(PUBLIC_KEY),
            service_key: read(SERVICE_KEY),
        })
    }

    /// Returns the credential for the given tier.
    pub fn credential(&self, tier: CredentialTier) -> Result<&str, ConfigError> {
        let key = match tier {
            CredentialTier::Public => self.public_key.as_deref(),
            CredentialTier::Service => self.service_key.as_deref(),
        };
        key.ok_or(ConfigError::Missing(tier.env_var()))
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_url() {
        let err = StoreConfig::from_lookup(lookup(&[(PUBLIC_KEY, "anon")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(STORE_URL));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let config = StoreConfig::from_lookup(lookup(&[
            (STORE_URL, "https://abc.example.co"),
            (PUBLIC_KEY, "   "),
        ]))
        .unwrap();
        assert_eq!(
            config.credential(CredentialTier::Public),
            Err(ConfigError::Missing(PUBLIC_KEY))
        );
    }

    #[test]
    fn test_credential_tiers() {
        let config = StoreConfig::from_lookup(lookup(&[
            (STORE_URL, "https://abc.example.co/"),
            (PUBLIC_KEY, "anon"),
            (SERVICE_KEY, "service"),
        ]))
        .unwrap();
        assert_eq!(config.credential(CredentialTier::Public), Ok("anon"));
        assert_eq!(config.credential(CredentialTier::Service), Ok("service"));
        assert_eq!(config.base_url(), "https://abc.example.co");
    }

    #[test]
    fn test_service_tier_required_separately() {
        let config = StoreConfig::from_lookup(lookup(&[
            (STORE_URL, "https://abc.example.co"),
            (PUBLIC_KEY, "anon"),
        ]))
        .unwrap();
        assert_eq!(
            config.credential(CredentialTier::Service),
            Err(ConfigError::Missing(SERVICE_KEY))
        );
    }

    #[test]
    fn test_invalid_url() {
        let err = StoreConfig::from_lookup(lookup(&[(STORE_URL, "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = StoreConfig::from_lookup(lookup(&[(STORE_URL, "ftp://abc.example.co")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
