//! OLOPA Deal API — entry point.
//!
//! Hosts a single in-memory [`olopa_deal::DealBook`] behind a small Axum REST
//! API for the browser UI. A background task settles funded deals once their
//! deadline passes.

mod api;
mod config;
mod errors;
mod settler;

use std::sync::Arc;
use std::time::Duration;

use olopa_deal::DealBook;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::ApiState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load optional .env file (ignored if missing) before reading RUST_LOG.
    let _ = dotenvy::dotenv();

    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let state = Arc::new(ApiState::new(Arc::new(DealBook::new())));
    let shutdown = CancellationToken::new();

    // ─── Settlement loop ──────────────────────────────────
    let settler = tokio::spawn(settler::run(
        Arc::clone(&state),
        Duration::from_secs(config.settle_interval_secs),
        shutdown.clone(),
    ));

    // ─── REST API ─────────────────────────────────────────
    let mut app = api::router(state).layer(TraceLayer::new_for_http());
    if config.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.bind_addr();
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = settler.await {
        warn!("Settlement loop ended abnormally: {e}");
    }
    Ok(())
}

/// Resolve on Ctrl-C, cancelling `shutdown` so background tasks stop too.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        shutdown.cancelled().await;
        return;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
