//! Request authentication gate and identity extractors

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use super::error::AuthError;
use super::identity::{Identity, IdentitySource};
use super::session::SessionTokenService;

/// Validates session tokens on incoming requests
#[derive(Debug, Clone)]
pub struct AuthGate {
    source: Arc<IdentitySource>,
    sessions: Arc<SessionTokenService>,
}

impl AuthGate {
    pub const fn new(source: Arc<IdentitySource>, sessions: Arc<SessionTokenService>) -> Self {
        Self { source, sessions }
    }

    /// Resolve the caller. The development source skips validation entirely.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        if let IdentitySource::Development(identity) = self.source.as_ref() {
            return Ok(identity.clone());
        }

        let token = bearer_token(headers)?;
        let claims = self.sessions.validate(token)?;
        Ok(Identity::from_claims(&claims))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::HeaderMissing)?
        .to_str()
        .map_err(|_| AuthError::HeaderMalformed)?;

    if value.trim().is_empty() {
        return Err(AuthError::HeaderMissing);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::HeaderMalformed),
    }
}

/// Reject the request unless it carries a valid session token.
#[allow(clippy::future_not_send)]
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = gate.authenticate(request.headers()).inspect_err(|err| {
        tracing::warn!(
            code = err.code(),
            path = %request.uri().path(),
            "Rejected unauthenticated request"
        );
        #[cfg(feature = "metrics")]
        crate::observability::record_token_rejection(err.code());
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Attach an identity when the token is valid, otherwise continue without one.
#[allow(clippy::future_not_send)]
pub async fn optional_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.authenticate(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(err) => {
            tracing::debug!(code = err.code(), "Continuing without identity");
        }
    }
    next.run(request).await
}

/// Identity attached by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::NotAuthenticated)
    }
}

/// Identity attached by [`optional_auth`], if any
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Identity>().cloned()))
    }
}
