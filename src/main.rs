//! Credentialing service: provider intake and review backend.

use std::net::SocketAddr;

use cred_telemetry::{TelemetryConfig, init_metrics, setup_telemetry};
use tokio::signal;
use tracing::info;

use credentialing_service::config::Config;
use credentialing_service::startup::build_app;

/// Build version (injected at compile time).
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init()?;

    let telemetry = setup_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
        json_logs: config.log_format == "json",
        log_directives: config.log_directives.clone(),
        otlp_endpoint: config.otlp_endpoint.clone(),
        sentry_dsn: config.sentry_dsn.clone(),
        environment: Some(config.environment.clone()),
        version: Some(VERSION.to_string()),
    });
    let metrics_handle = init_metrics();

    info!(
        version = VERSION,
        address = %config.http_addr,
        environment = %config.environment,
        otlp = config.otlp_endpoint.is_some(),
        pid = std::process::id(),
        "Starting credentialing-service"
    );

    let (app, addr) = build_app(&config, metrics_handle).await?;

    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    telemetry.shutdown();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
