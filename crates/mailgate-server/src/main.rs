//! Gateway binary: configuration, provider registration, serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mailgate_core::ProviderRegistry;
use mailgate_providers::{ResendProvider, UniOneProvider};
use mailgate_server::api;
use mailgate_server::config::ServerConfig;
use mailgate_server::jobs::JobStore;
use mailgate_server::ratelimit::{RateLimitStore, spawn_sweeper};
use mailgate_server::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(
        ResendProvider::new()?.batch_options(config.batch),
    ));
    registry.register(Arc::new(UniOneProvider::new(config.unione_region)?));
    tracing::info!(providers = ?registry.names(), "registered providers");

    if !registry.contains(&config.default_provider) {
        tracing::warn!(
            provider = %config.default_provider,
            "default provider is not registered; form-surface sends will fail"
        );
    }

    let jobs = JobStore::new(config.job_store);
    let limiter_store = Arc::new(RateLimitStore::new());
    spawn_sweeper(Arc::clone(&limiter_store), SWEEP_INTERVAL);

    let port = config.port;
    let default_provider = config.default_provider.clone();
    let state = AppState::new(registry, jobs, config);
    let app = api::router(state, limiter_store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, provider = %default_provider, "mailgate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
