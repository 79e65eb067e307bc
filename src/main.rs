//! Recache - Demo client binary
//!
//! Connects to a cache server, then reports the connection state once a
//! second until interrupted. Dropped connections are re-established by the
//! wrapper in the background.

use anyhow::Context;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recache::{Config, ReconnectingClient, TcpTransport};

/// Main entry point for the demo client.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the reconnecting client to the configured server
/// 4. Log the connected flag once a second
/// 5. Close the client on Ctrl+C/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recache client");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: address={}, custom_reconnect={}, timeout={}ms, delay={}ms, max_retries={}",
        config.address,
        config.custom_reconnect,
        config.connection_timeout_ms,
        config.reconnect_delay_ms,
        config.max_retries
    );

    let address = config.address.clone();
    let client = ReconnectingClient::new(TcpTransport::new(), config);

    client
        .connect()
        .await
        .with_context(|| format!("initial connect to {address} failed"))?;

    // Report the connection state once a second until shutdown
    let mut ticker = interval(Duration::from_secs(1));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("Is connected: {}", client.is_connected());
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    client.close().await;
    info!("Client shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
