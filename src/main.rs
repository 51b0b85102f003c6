use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use service_metrics::config::Config;
use service_metrics::metrics::{EvictionTask, MetricsCollector};
use service_metrics::middleware::AuthConfig;
use service_metrics::{server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // ── 1. Logging ───────────────────────────────────────────────
    // RUST_LOG wins; otherwise the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // ── 2. Metrics store + background eviction ───────────────────
    let metrics_config = config.metrics();
    let metrics = Arc::new(MetricsCollector::new(metrics_config));
    let eviction = EvictionTask::spawn(metrics.clone(), metrics_config.cleanup_interval);
    tracing::info!(
        max_history = metrics_config.max_history,
        cleanup_interval = ?metrics_config.cleanup_interval,
        "metrics collector ready"
    );

    // ── 3. Build shared state + router ───────────────────────────
    let state = Arc::new(AppState {
        metrics,
        auth: AuthConfig::bearer(config.api_token.clone()),
        stream_interval: config.stream_interval,
    });
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server exited with error")?;

    // ── 5. Stop the eviction timer ───────────────────────────────
    eviction.stop().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
