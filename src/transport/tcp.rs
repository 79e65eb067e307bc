//! TCP Transport
//!
//! Newline-delimited JSON over a single TCP stream. Requests and replies are
//! paired through a pending queue: the writer pushes one reply slot per line
//! written, and a background reader task fills the slots in order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};
use crate::models::{Command, Reply};
use crate::transport::{Connection, Transport};

type PendingQueue = Arc<StdMutex<VecDeque<oneshot::Sender<Result<Reply>>>>>;

// == TCP Transport ==
/// Produces [`TcpConnection`]s for the wrapper.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport;

impl TcpTransport {
    /// Creates a new TCP transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for TcpTransport {
    type Conn = TcpConnection;

    async fn connect(&self, address: &str) -> Result<TcpConnection> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ClientError::Connection(format!("{address}: {e}")))?;
        debug!(%address, "tcp connection established");
        Ok(TcpConnection::new(stream))
    }
}

// == TCP Connection ==
/// One live JSON-lines session with the cache server.
pub struct TcpConnection {
    writer: Mutex<OwnedWriteHalf>,
    pending: PendingQueue,
    closed: CancellationToken,
}

impl TcpConnection {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let pending: PendingQueue = Arc::new(StdMutex::new(VecDeque::new()));
        let closed = CancellationToken::new();

        tokio::spawn(read_loop(read_half, pending.clone(), closed.clone()));

        Self {
            writer: Mutex::new(write_half),
            pending,
            closed,
        }
    }

    /// Sends one command line and waits for the matching reply line.
    async fn request(&self, command: Command) -> Result<Reply> {
        if let Some(message) = command.validate() {
            return Err(ClientError::InvalidRequest(message));
        }
        if self.closed.is_cancelled() {
            return Err(ClientError::Connection("connection closed".to_string()));
        }

        let mut line = serde_json::to_string(&command)
            .map_err(|e| ClientError::Protocol(format!("command encoding failed: {e}")))?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        {
            // The writer lock also orders the pending queue: the slot pushed
            // here matches the line written here.
            let mut writer = self.writer.lock().await;
            self.pending
                .lock()
                .expect("pending queue poisoned")
                .push_back(tx);

            if let Err(e) = writer.write_all(line.as_bytes()).await {
                // The line never went out, so the slot must not wait for a reply.
                self.pending
                    .lock()
                    .expect("pending queue poisoned")
                    .pop_back();
                self.closed.cancel();
                return Err(ClientError::Connection(format!("write failed: {e}")));
            }
        }

        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(ClientError::Connection("connection closed".to_string())),
        }
    }
}

impl Connection for TcpConnection {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let reply = self
            .request(Command::Get {
                key: key.to_string(),
            })
            .await?;
        match reply {
            Reply::Value { value } => Ok(Some(value)),
            Reply::NotFound => Ok(None),
            Reply::Error { message } => Err(ClientError::Server(message)),
            Reply::Ok => Err(ClientError::Protocol(
                "unexpected ok reply to get".to_string(),
            )),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let reply = self
            .request(Command::Set {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await?;
        match reply {
            Reply::Ok => Ok(()),
            Reply::Error { message } => Err(ClientError::Server(message)),
            other => Err(ClientError::Protocol(format!(
                "unexpected reply to set: {other:?}"
            ))),
        }
    }

    async fn close(&self) {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

// == Reader Task ==
/// Fills pending reply slots in order until EOF, a read error, or close().
async fn read_loop(read_half: OwnedReadHalf, pending: PendingQueue, closed: CancellationToken) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = closed.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                trace!(%line, "reply line received");
                let slot = pending.lock().expect("pending queue poisoned").pop_front();
                let reply = serde_json::from_str::<Reply>(&line)
                    .map_err(|e| ClientError::Protocol(format!("malformed reply: {e}")));
                let malformed = reply.is_err();

                match slot {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => warn!("unsolicited reply line dropped"),
                }

                // A framing error poisons reply pairing for the whole stream.
                if malformed {
                    break;
                }
            }
            Ok(None) => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                debug!(error = %e, "connection read failed");
                break;
            }
        }
    }

    closed.cancel();
    // Waiters see a dropped sender and report the connection as closed.
    pending.lock().expect("pending queue poisoned").clear();
}
