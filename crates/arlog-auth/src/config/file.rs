//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::{ConfigBuilder, Environment};
use crate::Result;
use crate::auth::{AuthMode, Secret};

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./arlog-auth.toml",
    "~/.config/arlog-auth/config.toml",
    "/etc/arlog-auth/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {e}",
            path.display()
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(auth) = config.auth {
        if let Some(mode) = auth.mode {
            let mode: AuthMode = mode
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid auth.mode: {e}")))?;
            builder = builder.auth_mode(mode);
        }

        if let Some(environment) = auth.environment {
            let environment: Environment = environment.parse().unwrap_or_default();
            builder = builder.environment(environment);
        }
    }

    if let Some(provider) = config.provider {
        if let Some(domain) = provider.domain {
            builder = builder.provider_domain(domain);
        }

        if let Some(client_id) = provider.client_id {
            builder = builder.client_id(client_id);
        }

        if let Some(secret) = provider.client_secret {
            builder = builder.client_secret(Secret::new(secret));
        }

        if let Some(uri) = provider.redirect_uri {
            let uri = Url::parse(&uri)
                .map_err(|e| crate::Error::Config(format!("Invalid provider.redirect_uri: {e}")))?;
            builder = builder.redirect_uri(uri);
        }

        if let Some(secs) = provider.jwks_cache_ttl_secs {
            builder = builder.jwks_cache_ttl(Duration::from_secs(secs));
        }
    }

    if let Some(session) = config.session {
        if let Some(secret) = session.secret {
            builder = builder.session_secret(Secret::new(secret));
        }

        if let Some(url) = session.frontend_url {
            let url = Url::parse(&url)
                .map_err(|e| crate::Error::Config(format!("Invalid session.frontend_url: {e}")))?;
            builder = builder.frontend_url(url);
        }
    }

    if let Some(http) = config.http {
        if let Some(host_str) = http.host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = http.port {
            builder = builder.http_port(port);
        }

        if let Some(origin) = http.cors_origin {
            builder = builder.cors_origin(Some(origin));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    auth: Option<AuthFileConfig>,
    provider: Option<ProviderFileConfig>,
    session: Option<SessionFileConfig>,
    http: Option<HttpFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct AuthFileConfig {
    mode: Option<String>,
    environment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderFileConfig {
    domain: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    jwks_cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SessionFileConfig {
    secret: Option<String>,
    frontend_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HttpFileConfig {
    host: Option<String>,
    port: Option<u16>,
    cors_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
