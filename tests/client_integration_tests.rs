//! Integration Tests for the Reconnecting Client
//!
//! Exercises the full client over real TCP against the stub cache server.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use recache::{
    CacheServer, ClientError, Config, ConnectionState, ReconnectingClient, TcpTransport,
};

// == Helper Functions ==

/// Binds a stub server on an ephemeral port and returns (address, shutdown, handle).
async fn start_server() -> (
    String,
    tokio_util::sync::CancellationToken,
    tokio::task::JoinHandle<()>,
) {
    let server = CacheServer::bind("127.0.0.1:0").await.unwrap();
    let address = server.local_addr().unwrap().to_string();
    let shutdown = server.shutdown_handle();
    let handle = server.spawn();
    (address, shutdown, handle)
}

fn test_config(address: &str) -> Config {
    Config {
        address: address.to_string(),
        connection_timeout_ms: 2000,
        reconnect_delay_ms: 100,
        ..Config::default()
    }
}

/// Waits until the watched state satisfies `pred`, with a test-level deadline.
async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    pred: impl Fn(ConnectionState) -> bool,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            if pred(*rx.borrow()) {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("timed out waiting for connection state");
}

// == Connect and Round Trip ==

#[tokio::test]
async fn test_connect_set_get_roundtrip() {
    let (address, shutdown, _handle) = start_server().await;
    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));

    client.connect().await.unwrap();
    assert!(client.is_connected());

    client.set("greeting", "hello").await.unwrap();
    assert_eq!(
        client.get("greeting").await.unwrap(),
        Some("hello".to_string())
    );
    assert_eq!(client.get("missing").await.unwrap(), None);

    client.close().await;
    shutdown.cancel();
}

#[tokio::test]
async fn test_overwrite_returns_latest_value() {
    let (address, shutdown, _handle) = start_server().await;
    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));

    client.connect().await.unwrap();
    client.set("key", "v1").await.unwrap();
    client.set("key", "v2").await.unwrap();
    assert_eq!(client.get("key").await.unwrap(), Some("v2".to_string()));

    client.close().await;
    shutdown.cancel();
}

// == Connect Failures ==

#[tokio::test]
async fn test_unreachable_target_stays_disconnected() {
    // Bind then drop to obtain a port nothing is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Connection(_) | ClientError::Timeout(_)
    ));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(matches!(
        client.get("k").await,
        Err(ClientError::NotConnected)
    ));
}

// == Reconnect Scheduling ==

#[tokio::test]
async fn test_server_shutdown_triggers_reconnect() {
    let (address, shutdown, handle) = start_server().await;
    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));
    let mut states = client.watch_state();

    client.connect().await.unwrap();
    client.set("key", "value").await.unwrap();

    // Sever every live connection; the wrapper must notice and start the
    // retry loop on its own.
    shutdown.cancel();
    handle.await.unwrap();

    wait_for_state(&mut states, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;
    assert!(!client.is_connected());
    assert!(matches!(
        client.get("key").await,
        Err(ClientError::NotConnected)
    ));

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_no_reconnect_when_disabled() {
    let (address, shutdown, handle) = start_server().await;
    let config = Config {
        custom_reconnect: false,
        ..test_config(&address)
    };
    let client = ReconnectingClient::new(TcpTransport::new(), config);
    let mut states = client.watch_state();

    client.connect().await.unwrap();
    shutdown.cancel();
    handle.await.unwrap();

    wait_for_state(&mut states, |s| s == ConnectionState::Disconnected).await;

    // Give any (incorrect) retry loop time to show itself.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.stats().reconnect_attempts, 0);
}

// == Close Semantics ==

#[tokio::test]
async fn test_close_is_idempotent_and_final() {
    let (address, shutdown, _handle) = start_server().await;
    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));

    client.connect().await.unwrap();
    client.close().await;
    client.close().await;

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(client.get("k").await, Err(ClientError::Closed)));
    assert!(matches!(
        client.set("k", "v").await,
        Err(ClientError::Closed)
    ));
    assert!(matches!(client.connect().await, Err(ClientError::Closed)));

    shutdown.cancel();
}

#[tokio::test]
async fn test_close_during_reconnect_stops_retrying() {
    let (address, shutdown, handle) = start_server().await;
    let client = ReconnectingClient::new(TcpTransport::new(), test_config(&address));
    let mut states = client.watch_state();

    client.connect().await.unwrap();
    shutdown.cancel();
    handle.await.unwrap();

    wait_for_state(&mut states, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;
    client.close().await;

    let attempts = client.stats().reconnect_attempts;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.stats().reconnect_attempts, attempts);
}
