//! Configuration builder

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::{AuthMode, ProviderConfig, Secret};
use crate::constants::DEFAULT_FRONTEND_URL;

/// Service configuration, immutable after `build()`
#[derive(Debug, Clone)]
pub struct Config {
    pub auth_mode: AuthMode,
    pub environment: Environment,
    /// Present exactly when `auth_mode` is `Provider`
    pub provider: Option<ProviderConfig>,
    pub session_secret: Secret,
    pub frontend_url: Url,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Cookies carry the `Secure` attribute only in production.
    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        })
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 8080,
            cors_origin: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    auth_mode: Option<AuthMode>,
    environment: Option<Environment>,
    provider_domain: Option<String>,
    client_id: Option<String>,
    client_secret: Option<Secret>,
    redirect_uri: Option<Url>,
    jwks_cache_ttl: Option<Duration>,
    session_secret: Option<Secret>,
    frontend_url: Option<Url>,
    http: HttpConfig,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            auth_mode: None,
            environment: None,
            provider_domain: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            jwks_cache_ttl: None,
            session_secret: None,
            frontend_url: None,
            http: HttpConfig {
                host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 8080,
                cors_origin: None,
                request_timeout: Duration::from_secs(30),
            },
            telemetry: TelemetryConfig {
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub const fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn provider_domain(mut self, domain: String) -> Self {
        self.provider_domain = Some(domain);
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: String) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn client_secret(mut self, secret: Secret) -> Self {
        self.client_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = Some(uri);
        self
    }

    #[must_use]
    pub const fn jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn session_secret(mut self, secret: Secret) -> Self {
        self.session_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn frontend_url(mut self, url: Url) -> Self {
        self.frontend_url = Some(url);
        self
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.http.host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.http.port = port;
        self
    }

    #[must_use]
    pub fn cors_origin(mut self, origin: Option<String>) -> Self {
        self.http.cors_origin = origin;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> crate::Result<Config> {
        let session_secret = self
            .session_secret
            .filter(|s| !s.is_blank())
            .ok_or_else(|| Error::Config("session_secret is required".into()))?;

        let auth_mode = self.auth_mode.unwrap_or_default();
        let environment = self.environment.unwrap_or_default();
        if auth_mode == AuthMode::Development && environment == Environment::Production {
            return Err(Error::Config(
                "development auth mode cannot be used in production".into(),
            ));
        }

        let provider = match auth_mode {
            AuthMode::Development => None,
            AuthMode::Provider => {
                let domain = required(self.provider_domain, "provider_domain")?;
                let client_id = required(self.client_id, "client_id")?;
                let client_secret = self
                    .client_secret
                    .filter(|s| !s.is_blank())
                    .ok_or_else(|| Error::Config("client_secret is required".into()))?;
                let redirect_uri = self
                    .redirect_uri
                    .ok_or_else(|| Error::Config("redirect_uri is required".into()))?;

                let provider = ProviderConfig::new(domain, client_id, client_secret, redirect_uri);
                Some(match self.jwks_cache_ttl {
                    Some(ttl) => provider.with_jwks_cache_ttl(ttl),
                    None => provider,
                })
            }
        };

        let frontend_url = match self.frontend_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_FRONTEND_URL)
                .map_err(|e| Error::Config(format!("invalid default frontend URL: {e}")))?,
        };

        // Browser requests come from the frontend unless told otherwise
        let mut http = self.http;
        if http.cors_origin.is_none() && frontend_url.origin().is_tuple() {
            http.cors_origin = Some(frontend_url.origin().ascii_serialization());
        }

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            auth_mode,
            environment,
            provider,
            session_secret,
            frontend_url,
            http,
            telemetry: TelemetryConfig {
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

fn required(value: Option<String>, name: &str) -> crate::Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{name} is required in provider mode")))
}
