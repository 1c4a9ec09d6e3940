use std::net::SocketAddr;

use anyhow::{Context, Result};
use door_control::{create_app_state, create_router, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    // A missing .env file is fine; real deployments use the environment.
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber to log to stdout, honouring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Door Control server v{}...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let state = create_app_state(&config).await?;

    let rate_limiter = state.rate_limiter().clone();
    rate_limiter.start_cleanup_task(config.rate_limit.sweep_interval);

    let app = create_router(state);

    info!("Starting at endpoint:{}", config.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    rate_limiter.shutdown();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
