//! Authentication error types

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::constants::PROVIDER_RETRY_AFTER_SECS;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("state token mismatch")]
    Csrf,

    #[error("identity provider denied the login: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("identity provider request failed: {detail}")]
    Provider { status: Option<u16>, detail: String },

    #[error("no identity provider configured")]
    NoProvider,

    #[error("identity provider unreachable: {detail}")]
    Network { timeout: bool, detail: String },

    #[error("authorization header required")]
    HeaderMissing,

    #[error("invalid authorization header format")]
    HeaderMalformed,

    #[error("authentication required")]
    NotAuthenticated,

    #[error("token missing kid header")]
    MissingKid,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid signature")]
    BadSignature,

    #[error("invalid audience")]
    BadAudience,

    #[error("invalid issuer")]
    BadIssuer,

    #[error("token expired")]
    TokenExpired,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("JWKS parse failed: {0}")]
    JwksParse(String),

    #[error("no team mapped to groups {0:?}")]
    TeamNotFound(Vec<String>),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code, safe to expose to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Csrf => "csrf_mismatch",
            Self::ProviderDenied { .. } => "provider_denied",
            Self::Provider { .. } => "provider_error",
            Self::NoProvider => "no_provider",
            Self::Network { .. } => "network_error",
            Self::HeaderMissing => "header_missing",
            Self::HeaderMalformed => "header_malformed",
            Self::NotAuthenticated => "not_authenticated",
            Self::MissingKid => "missing_kid",
            Self::MalformedToken => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::BadAudience => "bad_audience",
            Self::BadIssuer => "bad_issuer",
            Self::TokenExpired => "token_expired",
            Self::KeyNotFound(_) => "key_not_found",
            Self::JwksParse(_) => "jwks_parse_error",
            Self::TeamNotFound(_) => "team_not_found",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Csrf => StatusCode::BAD_REQUEST,
            Self::NoProvider => StatusCode::NOT_FOUND,
            Self::Network { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProviderDenied { .. }
            | Self::HeaderMissing
            | Self::HeaderMalformed
            | Self::NotAuthenticated
            | Self::MissingKid
            | Self::MalformedToken
            | Self::BadSignature
            | Self::BadAudience
            | Self::BadIssuer
            | Self::TokenExpired
            | Self::KeyNotFound(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_)
            | Self::Provider { .. }
            | Self::JwksParse(_)
            | Self::TeamNotFound(_)
            | Self::Storage(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Token or header rejected; the request itself is at fault.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::HeaderMissing
                | Self::HeaderMalformed
                | Self::NotAuthenticated
                | Self::MissingKid
                | Self::MalformedToken
                | Self::BadSignature
                | Self::BadAudience
                | Self::BadIssuer
                | Self::TokenExpired
        )
    }

    /// The client may retry the whole login; nothing is retried internally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Message shown to clients. Upstream details stay in the logs.
    const fn public_message(&self) -> &'static str {
        match self {
            Self::Csrf => "Invalid state token",
            Self::ProviderDenied { .. } | Self::Provider { .. } | Self::KeyNotFound(_) => {
                "Authentication failed"
            }
            Self::Network { .. } => {
                "Authentication service temporarily unavailable, please retry"
            }
            Self::NoProvider => "No identity provider configured",
            Self::HeaderMissing => "Authorization header required",
            Self::HeaderMalformed => "Invalid authorization header format",
            Self::NotAuthenticated => "Authentication required",
            Self::TokenExpired
            | Self::MissingKid
            | Self::MalformedToken
            | Self::BadSignature
            | Self::BadAudience
            | Self::BadIssuer => "Invalid or expired token",
            Self::TeamNotFound(_) => "Failed to fetch user permissions",
            Self::Config(_) | Self::JwksParse(_) | Self::Storage(_) | Self::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidIssuer => Self::BadIssuer,
            ErrorKind::InvalidAudience => Self::BadAudience,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::BadSignature,
            _ => Self::MalformedToken,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::Network {
                timeout: err.is_timeout(),
                detail: err.to_string(),
            };
        }
        Self::Provider {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    code: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::ProviderDenied { error, description } => {
                tracing::warn!(error = %error, description = ?description, "Provider denied login");
            }
            Self::Provider { status, detail } => {
                tracing::error!(upstream_status = ?status, detail = %detail, "Provider request failed");
            }
            Self::Network { timeout, detail } => {
                tracing::error!(timeout, detail = %detail, "Provider unreachable");
            }
            err if status.is_server_error() => {
                tracing::error!(code = err.code(), error = %err, "Authentication subsystem error");
            }
            // Do not log token contents
            err if err.is_validation() => {
                tracing::debug!(code = err.code(), "Credential rejected");
            }
            err => {
                tracing::info!(code = err.code(), "Request rejected");
            }
        }

        let body = ErrorBody {
            error: self.public_message(),
            code: self.code(),
        };
        let mut response = (status, Json(body)).into_response();
        if self.is_retryable() {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(PROVIDER_RETRY_AFTER_SECS),
            );
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
