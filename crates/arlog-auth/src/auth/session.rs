//! Session tokens issued by this service

use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, Result};
use super::identity::Identity;
use crate::constants::SESSION_TTL;

/// Claims of a session token. Every field is required on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub groups: Vec<String>,
    pub iat: u64,
    pub exp: u64,
    pub provider_user_id: String,
}

/// Issues and validates HS256 session tokens.
///
/// Validity is signature plus expiry only. There is no revocation list, so a
/// token stays usable until its 24 hour window closes.
pub struct SessionTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokenService {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(AuthError::Config(
                "session signing secret is missing or empty".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: SESSION_TTL,
        })
    }

    pub fn issue(&self, identity: &Identity) -> Result<String> {
        self.issue_at(identity, get_current_timestamp())
    }

    pub(crate) fn issue_at(&self, identity: &Identity, issued_at: u64) -> Result<String> {
        let claims = SessionClaims {
            sub: identity.sub.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            groups: identity.groups.clone(),
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
            provider_user_id: identity.provider_user_id.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign session token: {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
