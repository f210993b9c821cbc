//! Prometheus metrics for arlog-auth

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

const METRIC_UPTIME: &str = "arlog_auth_uptime_seconds";
const METRIC_INFO: &str = "arlog_auth_info";

const METRIC_LOGINS: &str = "arlog_auth_logins_total";
const METRIC_TOKEN_REJECTIONS: &str = "arlog_auth_token_rejections_total";
const METRIC_JWKS_REFRESHES: &str = "arlog_auth_jwks_refreshes_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");

    describe_counter!(METRIC_LOGINS, "Completed login callbacks by outcome");
    describe_counter!(
        METRIC_TOKEN_REJECTIONS,
        "Requests rejected by the auth gate by error code"
    );
    describe_counter!(METRIC_JWKS_REFRESHES, "Provider key set fetches by status");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a login callback. `outcome` is `success` or an error code.
pub fn record_login(outcome: &'static str) {
    counter!(METRIC_LOGINS, "outcome" => outcome).increment(1);
}

/// Record a request rejected by the required gate.
pub fn record_token_rejection(code: &'static str) {
    counter!(METRIC_TOKEN_REJECTIONS, "code" => code).increment(1);
}

/// Record a key set fetch.
pub fn record_jwks_refresh(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(METRIC_JWKS_REFRESHES, "status" => status).increment(1);
}
