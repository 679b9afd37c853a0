//! rates-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use rates_gateway::app_state::AppState;
use rates_gateway::config::{GatewayConfig, LogFormat};
use rates_gateway::domain::ConnectionRegistry;
use rates_gateway::server::{build_app, serve, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting rates-gateway");

    // One registry for the lifetime of the process
    let registry = Arc::new(ConnectionRegistry::new());
    let app_state = AppState::new(registry, config.outbound_buffer);
    let app = build_app(app_state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    serve(listener, app, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}
