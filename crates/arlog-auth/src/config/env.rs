//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use super::builder::{ConfigBuilder, Environment};
use crate::Result;
use crate::auth::{AuthMode, Secret};

/// Environment variable names
mod vars {
    pub const AUTH_MODE: &str = "ARLOG_AUTH_MODE";
    pub const ENVIRONMENT: &str = "ARLOG_ENVIRONMENT";
    pub const PROVIDER_DOMAIN: &str = "ARLOG_PROVIDER_DOMAIN";
    pub const CLIENT_ID: &str = "ARLOG_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "ARLOG_CLIENT_SECRET";
    pub const REDIRECT_URI: &str = "ARLOG_REDIRECT_URI";
    pub const JWKS_CACHE_TTL_SECS: &str = "ARLOG_JWKS_CACHE_TTL_SECS";
    pub const SESSION_SECRET: &str = "ARLOG_SESSION_SECRET";
    pub const FRONTEND_URL: &str = "ARLOG_FRONTEND_URL";
    pub const HTTP_HOST: &str = "ARLOG_HTTP_HOST";
    pub const HTTP_PORT: &str = "ARLOG_HTTP_PORT";
    pub const CORS_ORIGIN: &str = "ARLOG_CORS_ORIGIN";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "ARLOG_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(mode) = env::var(vars::AUTH_MODE) {
        let mode: AuthMode = mode
            .parse()
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {e}", vars::AUTH_MODE)))?;
        builder = builder.auth_mode(mode);
    }

    if let Ok(environment) = env::var(vars::ENVIRONMENT) {
        let environment: Environment = environment.parse().unwrap_or_default();
        builder = builder.environment(environment);
    }

    // Provider
    if let Ok(domain) = env::var(vars::PROVIDER_DOMAIN) {
        builder = builder.provider_domain(domain);
    }

    if let Ok(client_id) = env::var(vars::CLIENT_ID) {
        builder = builder.client_id(client_id);
    }

    if let Ok(secret) = env::var(vars::CLIENT_SECRET) {
        builder = builder.client_secret(Secret::new(secret));
    }

    if let Ok(uri) = env::var(vars::REDIRECT_URI) {
        builder = builder.redirect_uri(parse_url(&uri, vars::REDIRECT_URI)?);
    }

    if let Ok(ttl_str) = env::var(vars::JWKS_CACHE_TTL_SECS)
        && let Ok(secs) = ttl_str.parse::<u64>()
    {
        builder = builder.jwks_cache_ttl(Duration::from_secs(secs));
    }

    // Session
    if let Ok(secret) = env::var(vars::SESSION_SECRET) {
        builder = builder.session_secret(Secret::new(secret));
    }

    if let Ok(url) = env::var(vars::FRONTEND_URL) {
        builder = builder.frontend_url(parse_url(&url, vars::FRONTEND_URL)?);
    }

    // HTTP
    if let Ok(host_str) = env::var(vars::HTTP_HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.http_host(host);
    }

    if let Ok(port_str) = env::var(vars::HTTP_PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.http_port(port);
    }

    if let Ok(origin) = env::var(vars::CORS_ORIGIN) {
        builder = builder.cors_origin(Some(origin));
    }

    // Logging
    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_url(value: &str, var: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| crate::Error::Config(format!("Invalid {var}: {e}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
