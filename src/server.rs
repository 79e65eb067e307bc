//! Stub Cache Server
//!
//! Minimal in-memory key-value server speaking the newline-delimited JSON
//! protocol. Exists as the collaborator for the demo stack and the
//! integration tests; protocol depth (TTL, eviction, auth) is deliberately
//! left out.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{Command, Reply};

type Store = Arc<RwLock<HashMap<String, String>>>;

// == Cache Server ==
/// In-memory cache server bound to one TCP listener.
pub struct CacheServer {
    listener: TcpListener,
    store: Store,
    shutdown: CancellationToken,
}

impl CacheServer {
    /// Binds a new server to `address`.
    pub async fn bind(address: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            store: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        })
    }

    /// Returns the bound address (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a token that stops the accept loop and severs every live
    /// connection when cancelled.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the accept loop and returns its handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.local_addr() {
                Ok(addr) => info!(%addr, "cache server listening"),
                Err(_) => info!("cache server listening"),
            }

            loop {
                let accepted = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    accepted = self.listener.accept() => accepted,
                };

                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "client connected");
                        let store = self.store.clone();
                        let shutdown = self.shutdown.clone();
                        tokio::spawn(handle_connection(stream, store, shutdown));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        break;
                    }
                }
            }
            info!("cache server stopped");
        })
    }
}

// == Connection Handling ==
/// Serves one client until EOF or shutdown.
async fn handle_connection(stream: TcpStream, store: Store, shutdown: CancellationToken) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };

        let reply = match serde_json::from_str::<Command>(&line) {
            Ok(command) => execute(command, &store).await,
            Err(e) => Reply::Error {
                message: format!("malformed command: {e}"),
            },
        };

        let mut out = match serde_json::to_string(&reply) {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "reply encoding failed");
                break;
            }
        };
        out.push('\n');
        if write_half.write_all(out.as_bytes()).await.is_err() {
            break;
        }
    }
    debug!("client disconnected");
}

/// Executes one command against the store.
async fn execute(command: Command, store: &Store) -> Reply {
    match command {
        Command::Get { key } => match store.read().await.get(&key) {
            Some(value) => Reply::Value {
                value: value.clone(),
            },
            None => Reply::NotFound,
        },
        Command::Set { key, value } => {
            if key.is_empty() {
                return Reply::Error {
                    message: "Key cannot be empty".to_string(),
                };
            }
            store.write().await.insert(key, value);
            Reply::Ok
        }
    }
}
