//! Constants for the auth service

use std::time::Duration;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "arlog-auth";

/// Lifetime of an issued session token
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Staleness bound for the cached provider key set
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Timeout applied to every outbound provider call
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry-After hint sent when the provider is unreachable
pub const PROVIDER_RETRY_AFTER_SECS: &str = "5";

/// Max age of the login state cookie, in seconds
pub const STATE_COOKIE_MAX_AGE_SECS: i64 = 600;

/// Cookie holding the single-use login state
pub const STATE_COOKIE: &str = "oauth_state";

/// Cookie cleared on logout
pub const SESSION_COOKIE: &str = "session_token";

/// Random bytes behind a login state value
pub const STATE_BYTES: usize = 32;

/// Scopes requested at the authorize endpoint
pub const OIDC_SCOPES: &str = "openid profile email groups";

/// Authorization server path below the provider base URL
pub const AUTH_SERVER_PATH: &str = "oauth2/default";

/// Path on the frontend that receives the session token
pub const FRONTEND_CALLBACK_PATH: &str = "/auth/callback";

/// Frontend location when none is configured
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Signing algorithms accepted for provider tokens
pub const PROVIDER_ALGORITHMS: [jsonwebtoken::Algorithm; 3] = [
    jsonwebtoken::Algorithm::RS256,
    jsonwebtoken::Algorithm::RS384,
    jsonwebtoken::Algorithm::RS512,
];
