//! Transport Layer
//!
//! The seam between the reconnecting wrapper and the underlying cache client.
//! The wrapper only ever talks to a [`Transport`] and the [`Connection`]s it
//! produces, so tests can substitute a scripted implementation and the TCP
//! details stay contained in [`tcp`].

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub mod tcp;

pub use tcp::{TcpConnection, TcpTransport};

// == Connection Trait ==
/// One live session with the cache server.
///
/// Handles are replaced, not repaired: once the `closed()` token trips, the
/// wrapper drops the handle and dials a fresh one.
pub trait Connection: Send + Sync + 'static {
    /// Retrieves the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Releases the session. Safe to call more than once.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Token that is cancelled when the session ends, whether by `close()`
    /// or by the peer going away.
    fn closed(&self) -> CancellationToken;
}

// == Transport Trait ==
/// Factory for [`Connection`]s.
pub trait Transport: Send + Sync + 'static {
    /// The connection type this transport produces.
    type Conn: Connection;

    /// Establishes one new session with the server at `address`.
    fn connect(&self, address: &str) -> impl Future<Output = Result<Self::Conn>> + Send;
}
