//! Authentication configuration types

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::constants::{JWKS_CACHE_TTL, PROVIDER_TIMEOUT};

/// How identities are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Real OIDC provider
    #[default]
    Provider,
    /// Fixed development identity, no provider calls
    Development,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oidc" | "provider" | "okta" => Ok(Self::Provider),
            "dev" | "development" => Ok(Self::Development),
            other => Err(format!("unknown auth mode: {other}")),
        }
    }
}

/// A secret string whose `Debug` output is redacted
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// OIDC provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider domain, e.g. `example.okta.com`. A value with a scheme is used as-is.
    pub domain: String,
    pub client_id: String,
    pub client_secret: Secret,
    /// Where the provider sends the browser back to
    pub redirect_uri: Url,
    pub jwks_cache_ttl: Duration,
    pub timeout: Duration,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<Secret>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            jwks_cache_ttl: JWKS_CACHE_TTL,
            timeout: PROVIDER_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!("dev".parse::<AuthMode>().unwrap(), AuthMode::Development);
        assert_eq!(
            "Development".parse::<AuthMode>().unwrap(),
            AuthMode::Development
        );
        assert_eq!("oidc".parse::<AuthMode>().unwrap(), AuthMode::Provider);
        assert!("saml".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::from("hunter2");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter2");
        assert!(Secret::from("  ").is_blank());
    }

    #[test]
    fn test_provider_config_debug_redacts_client_secret() {
        let config = ProviderConfig::new(
            "example.okta.com",
            "client-1",
            "super-secret-value",
            Url::parse("http://localhost:8080/auth/callback").unwrap(),
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("client-1"));
        assert_eq!(config.jwks_cache_ttl, JWKS_CACHE_TTL);
        assert_eq!(config.timeout, PROVIDER_TIMEOUT);
    }
}
