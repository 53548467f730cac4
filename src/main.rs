//! pointcloud-push server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket and diagnostic endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pointcloud_push::app_state::AppState;
use pointcloud_push::config::ServerConfig;
use pointcloud_push::generator::SphereShellGenerator;
use pointcloud_push::server::build_app;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        addr = %config.listen_addr,
        mode = %config.delivery_mode,
        chunk_size = config.chunk_size,
        threshold = config.backpressure_threshold,
        max = config.max_backpressure,
        points = config.point_count,
        "starting pointcloud-push"
    );

    // Build application state
    let generator = Arc::new(SphereShellGenerator::new(config.point_count));
    let app = build_app(AppState::new(&config, generator));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
