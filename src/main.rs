use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use insite::analytics::AnalyticsService;
use insite::api;
use insite::auth::AccessGuard;
use insite::config::{Config, ValidationMode};

#[tokio::main]
async fn main() -> Result<()> {
    insite::init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let store = insite::build_store(&config)?;
    if let Err(e) = store.health().await {
        tracing::warn!("Time-series store is not healthy yet: {}", e);
    }

    // Initialize access guard
    let guard = Arc::new(AccessGuard::from_config(&config.validation)?);
    match config.validation.mode {
        ValidationMode::None => {
            info!("🔓 Member validation is disabled - all reads are allowed");
        }
        ValidationMode::Member => {
            info!(
                "🔐 Member validation enabled (best-effort, timeout {}ms)",
                config.validation.timeout_ms
            );
        }
    }

    let analytics = AnalyticsService::new(store, guard, config.influx.bucket.clone());
    let api_router = api::create_api_router(analytics);

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Analytics endpoints available at http://{}/api/v1/data/...", api_addr);

    axum::serve(api_listener, api_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
