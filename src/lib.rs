//! Index Sentiment - live NIFTY 50 / Bank NIFTY sentiment dashboard
//!
//! Polls Angel One market movers and put-call ratios, resolves them to index
//! constituents, and serves a weighted sentiment view over HTTP.

pub mod brokers;
pub mod config;
pub mod error;
pub mod market;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod services;
pub mod state;

use config::AppConfig;
use scheduler::{RefreshScheduler, SessionResetScheduler};
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging, start background tasks and serve until Ctrl+C
pub async fn run() -> error::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "index_sentiment_lib=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Index Sentiment...");

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration: {:?}", config);

    let state = Arc::new(AppState::new(config)?);

    let refresh = RefreshScheduler::new(state.clone()).start();
    let reset = SessionResetScheduler::new(state.clone()).start();
    tracing::info!("Background tasks started");

    let result = server::serve(state, shutdown_signal()).await;

    refresh.abort();
    reset.abort();
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
