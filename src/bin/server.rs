//! Recache - Stub server binary
//!
//! Runs the in-memory cache server so the demo client has something to
//! connect to.

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recache::{CacheServer, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recache stub server");

    let config = Config::from_env();
    let server = CacheServer::bind(&config.address).await?;
    let shutdown = server.shutdown_handle();
    let handle = server.spawn();

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating shutdown...");
    shutdown.cancel();
    handle.await?;

    info!("Server shutdown complete");
    Ok(())
}
