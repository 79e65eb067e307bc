//! Reply DTOs for the cache wire protocol
//!
//! Defines the structure of incoming response lines.

use serde::{Deserialize, Serialize};

/// A single response line received from the cache server.
///
/// Serialized as one JSON object per line, tagged by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    /// Command succeeded with no payload
    Ok,
    /// Value found for the requested key
    Value {
        /// The stored value
        value: String,
    },
    /// No value stored under the requested key
    NotFound,
    /// Command failed on the server side
    Error {
        /// Human-readable failure description
        message: String,
    },
}
