//! # Steward Export Server
//!
//! Standalone binary serving the streaming object export API.

use anyhow::Context;
use tokio::signal;
use tracing::info;

use steward_core::config::StewardConfig;
use steward_core::logging::init_structured_logging;
use steward_core::web::{router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = StewardConfig::from_env().context("loading configuration")?;
    let bind_address = config.bind_address.clone();

    let state = AppState::connect(config)
        .await
        .context("connecting to the object store")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!(bind_address = %bind_address, "steward export server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("steward export server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
