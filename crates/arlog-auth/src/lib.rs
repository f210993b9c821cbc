//! OAuth2/OIDC authentication and namespace authorization for the ArLOG log dashboard

pub mod auth;
pub mod config;
mod constants;
mod error;
pub mod observability;
pub mod server;
#[cfg(test)]
mod test_support;
pub mod transport;

pub use auth::{
    AuthError, AuthGate, AuthMode, Identity, IdentitySource, JwksKeyStore, MemoryStore,
    OAuth2Flow, PermissionResolver, PermissionStore, PermissionView, SessionTokenService,
};
pub use config::{Config, ConfigBuilder, Environment, HttpConfig, TelemetryConfig};
pub use error::{Error, Result};
pub use server::AuthService;
