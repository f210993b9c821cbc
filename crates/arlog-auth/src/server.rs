//! Service wiring

use std::fmt;
use std::sync::Arc;

use crate::auth::{
    AuthGate, AuthMode, IdentitySource, OAuth2Flow, PermissionResolver, PermissionStore,
    ProviderClient, SessionTokenService,
};
use crate::{Config, Error, Result};

/// Shared handles behind every route
#[derive(Clone)]
pub struct AuthService {
    flow: Arc<OAuth2Flow>,
    gate: AuthGate,
    resolver: Arc<PermissionResolver>,
    secure_cookies: bool,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("flow", &self.flow)
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Build every component from validated configuration.
    ///
    /// The identity source is chosen here, once; the login flow and the
    /// request gate share it.
    pub fn from_config(config: &Config, store: Arc<dyn PermissionStore>) -> Result<Self> {
        let sessions = Arc::new(SessionTokenService::new(config.session_secret.expose())?);

        let source = match (config.auth_mode, &config.provider) {
            (AuthMode::Development, _) => IdentitySource::development(),
            (AuthMode::Provider, Some(provider)) => {
                let client = ProviderClient::new(provider)?;
                tracing::info!(issuer = %client.endpoints().issuer, "Identity provider configured");
                IdentitySource::Provider(client)
            }
            (AuthMode::Provider, None) => {
                return Err(Error::Config(
                    "provider settings are required in provider mode".into(),
                ));
            }
        };
        if source.is_development() {
            tracing::warn!("Development auth mode: identity provider bypassed");
        }
        let source = Arc::new(source);

        let flow = OAuth2Flow::new(
            Arc::clone(&source),
            Arc::clone(&sessions),
            &config.frontend_url,
        );

        Ok(Self {
            flow: Arc::new(flow),
            gate: AuthGate::new(source, sessions),
            resolver: Arc::new(PermissionResolver::new(store)),
            secure_cookies: config.secure_cookies(),
        })
    }

    pub fn flow(&self) -> Arc<OAuth2Flow> {
        Arc::clone(&self.flow)
    }

    pub const fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub const fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub const fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}
