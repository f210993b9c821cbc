//! Authentication and authorization
//!
//! Two trust roots are kept apart:
//!
//! - Provider tokens (RS256/RS384/RS512) are verified against the provider's
//!   published key set via [`JwksKeyStore`].
//! - Session tokens (HS256) are minted and verified locally by
//!   [`SessionTokenService`].
//!
//! [`OAuth2Flow`] turns a provider login into a session token, [`AuthGate`]
//! checks that token on incoming requests and [`PermissionResolver`] maps the
//! resulting identity to cluster/namespace grants.
//!
//! Development mode is an [`IdentitySource`] variant picked once at startup.
//! The flow and the gate share the same instance.

mod claims;
mod config;
mod error;
mod flow;
mod identity;
mod jwks;
mod middleware;
mod permissions;
mod provider;
pub mod routes;
mod session;
mod store;

pub use claims::{Audience, ProviderClaims};
pub use config::{AuthMode, ProviderConfig, Secret};
pub use error::{AuthError, Result};
pub use flow::{CallbackParams, LoginStart, OAuth2Flow, generate_state};
pub use identity::{Identity, IdentitySource};
pub use jwks::{Jwk, JwkSet, JwksKeyStore};
pub use middleware::{
    AuthGate, CurrentIdentity, MaybeIdentity, bearer_token, optional_auth, require_auth,
};
pub use permissions::{
    Permission, PermissionResolver, PermissionStore, PermissionView, ResolvedPermissions,
    ServiceAccountToken, Team,
};
pub use provider::{ProviderClient, ProviderEndpoints, TokenResponse, UserInfo};
pub use session::{SessionClaims, SessionTokenService};
pub use store::MemoryStore;
