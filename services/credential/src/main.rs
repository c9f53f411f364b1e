//! Credential service binary.
//!
//! Runs against in-memory stores seeded from the `[[Users]]` and `[[Roles]]`
//! config sections. Rows and users live only as long as the process, and
//! opaque tokens are logged as sent rather than mailed.

use anyhow::Context;
use credential_service::http::{self, AppState, Collaborators};
use credential_service::observability::{init_tracing, TracingConfig};
use credential_service::Config;
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracing_config = TracingConfig::from_env();
    init_tracing(&tracing_config)?;

    info!(service = %tracing_config.service_name, "Starting credential service");

    let config = Config::load().context("loading configuration")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parsing listen address")?;

    let collaborators = Collaborators::in_memory(&config)
        .await
        .context("seeding in-memory stores")?;
    let state = AppState::build(&config, collaborators).context("resolving signing key")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, key_id = ?state.jwks.current_key_id(), "Credential service listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
