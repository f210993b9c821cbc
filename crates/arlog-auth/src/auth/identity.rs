//! Authenticated identity and where it comes from

use serde::Serialize;

use super::provider::ProviderClient;
use super::session::SessionClaims;

/// An authenticated user. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub groups: Vec<String>,
    pub provider_user_id: String,
}

impl Identity {
    /// Fixed identity used when no provider is configured.
    pub fn development() -> Self {
        Self {
            sub: "dev-user-123".to_string(),
            email: "dev@example.com".to_string(),
            name: "Development User".to_string(),
            groups: vec!["cosmos-team-okta-group".to_string()],
            provider_user_id: "dev-provider-id".to_string(),
        }
    }

    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            groups: claims.groups.clone(),
            provider_user_id: claims.provider_user_id.clone(),
        }
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Selected once at startup and shared by the login flow and the request gate.
#[derive(Debug)]
pub enum IdentitySource {
    Provider(ProviderClient),
    Development(Identity),
}

impl IdentitySource {
    pub fn development() -> Self {
        Self::Development(Identity::development())
    }

    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development(_))
    }
}
