use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scout_api::config::Config;
use scout_api::routes::build_router;
use scout_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("scout_api={},tower_http=info", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scout API v{}", env!("CARGO_PKG_VERSION"));

    let port = config.port;
    let retention = config.pipeline.run_retention;
    let state = AppState::from_config(config)?;
    info!(
        "Pipeline: {} concurrent run(s), {} queued, default timeout {:?}",
        state.config.pipeline.max_concurrent_runs,
        state.config.pipeline.max_queued_runs,
        state.config.pipeline.defaults.timeout
    );

    spawn_retention_sweep(state.clone(), retention);

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Evicts finished runs once they outlive the retention window, and expired
/// cache entries the backend does not drop on its own.
fn spawn_retention_sweep(state: AppState, retention: Duration) {
    let period = (retention / 4).clamp(Duration::from_secs(1), Duration::from_secs(300));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = state.orchestrator.registry().sweep().await;
            if evicted > 0 {
                info!("Evicted {evicted} finished run(s)");
            }
            if let Some(cache) = &state.cache {
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    info!("Purged {purged} expired cache entries from {}", cache.backend());
                }
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
