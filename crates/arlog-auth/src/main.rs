use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use arlog_auth::auth::AuthMode;
use arlog_auth::config::{self, ConfigBuilder};
use arlog_auth::observability::init_observability;
use arlog_auth::transport::run_http;
use arlog_auth::{AuthService, Environment, MemoryStore};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "arlog-auth")]
#[command(about = "Authentication service for the ArLOG log dashboard", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "ARLOG_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// HTTP bind port
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Use the fixed development identity instead of the identity provider
    #[arg(long)]
    dev: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // CLI first so file and env can override it
    let mut builder = ConfigBuilder::new()
        .http_host(args.host)
        .http_port(args.port)
        .json_logs(args.json_logs);

    if args.dev {
        builder = builder.auth_mode(AuthMode::Development);
    }

    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }

    let config = config::load_config(builder, args.config.as_deref())?.build()?;

    init_observability(&config.telemetry)?;

    let store = MemoryStore::new();
    if config.environment == Environment::Development && store.seed_development()? {
        tracing::info!("Development permission data loaded");
    }

    let service = AuthService::from_config(&config, Arc::new(store))?;

    tracing::info!("Starting arlog-auth");
    tracing::info!("Auth mode: {:?}", config.auth_mode);
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Frontend: {}", config.frontend_url);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    run_http(service, &config.http, shutdown).await?;
    Ok(())
}
