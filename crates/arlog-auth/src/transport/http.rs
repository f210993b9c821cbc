//! HTTP server: auth endpoints, API routes and the serve loop

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{
    CurrentIdentity, Identity, MaybeIdentity, PermissionView, optional_auth, require_auth,
    routes,
};
use crate::config::HttpConfig;
use crate::constants::{DEFAULT_FRONTEND_URL, SERVICE_NAME};
use crate::server::AuthService;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct PermissionsResponse {
    success: bool,
    permissions: Vec<PermissionView>,
}

#[derive(Debug, Serialize)]
struct MeResponse {
    authenticated: bool,
    user: Option<Identity>,
}

/// Full application router
pub fn router(service: &AuthService, config: &HttpConfig) -> Router {
    let protected = Router::new()
        .route("/api/user/permissions", get(permissions_handler))
        .route_layer(from_fn_with_state(service.gate().clone(), require_auth))
        .with_state(service.clone());

    let optional = Router::new()
        .route("/api/me", get(me_handler))
        .route_layer(from_fn_with_state(service.gate().clone(), optional_auth));

    #[allow(unused_mut)]
    let mut app = Router::new().route("/health", get(health_handler));

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.merge(routes::router(service.flow(), service.secure_cookies()))
        .merge(protected)
        .merge(optional)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(build_cors_layer(config))
}

/// Serve until `shutdown` resolves.
pub async fn run_http(
    service: AuthService,
    config: &HttpConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    let cancellation_token = CancellationToken::new();

    emit_security_warnings(config.host, config, service.secure_cookies());

    let app = router(&service, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    let token = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown.await;
        token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &HttpConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_FRONTEND_URL));

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn emit_security_warnings(host: IpAddr, config: &HttpConfig, secure_cookies: bool) {
    let is_non_loopback = !host.is_loopback();
    let is_all_interfaces = host == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        || host == IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        tracing::warn!(
            "HTTP server binding to all interfaces (0.0.0.0). \
             This exposes the server to all network interfaces."
        );
    } else if is_non_loopback {
        tracing::warn!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        );
    }

    if !secure_cookies && is_non_loopback {
        tracing::warn!(
            "SECURITY WARNING: cookies are sent without the Secure attribute on a \
             network-reachable listener. Set ARLOG_ENVIRONMENT=production behind TLS."
        );
    }

    if config.cors_origin.is_none() {
        tracing::info!(
            "CORS origin not configured (ARLOG_CORS_ORIGIN). \
             Using default: {DEFAULT_FRONTEND_URL}"
        );
    }
}

async fn health_handler() -> impl IntoResponse {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
    })
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}

async fn permissions_handler(
    State(service): State<AuthService>,
    CurrentIdentity(identity): CurrentIdentity,
) -> crate::auth::Result<Json<PermissionsResponse>> {
    let resolved = service.resolver().resolve(&identity).await?;
    Ok(Json(PermissionsResponse {
        success: true,
        permissions: resolved.into_views(),
    }))
}

async fn me_handler(MaybeIdentity(identity): MaybeIdentity) -> Json<MeResponse> {
    Json(MeResponse {
        authenticated: identity.is_some(),
        user: identity,
    })
}
