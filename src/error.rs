//! Error types for the cache client
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Client Error Enum ==
/// Unified error type for the cache client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection could not be established or was lost mid-operation
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Operation attempted while no connection is established
    #[error("Not connected")]
    NotConnected,

    /// Operation attempted after the client was closed
    #[error("Client is closed")]
    Closed,

    /// Connect attempt exceeded the configured timeout
    #[error("Connect timed out after {0} ms")]
    Timeout(u64),

    /// Invalid request data rejected before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed or unexpected reply from the server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error reply returned by the server
    #[error("Server error: {0}")]
    Server(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache client.
pub type Result<T> = std::result::Result<T, ClientError>;
