//! Command DTOs for the cache wire protocol
//!
//! Defines the structure of outgoing request lines.

use serde::{Deserialize, Serialize};

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LENGTH: usize = 256;

/// A single request line sent to the cache server.
///
/// Serialized as one JSON object per line, tagged by `cmd`:
/// `{"cmd":"get","key":"k"}` or `{"cmd":"set","key":"k","value":"v"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Command {
    /// Retrieve the value stored under `key`
    Get {
        /// The cache key
        key: String,
    },
    /// Store `value` under `key`
    Set {
        /// The cache key
        key: String,
        /// The value to store
        value: String,
    },
}

impl Command {
    /// Validates the command data before it is sent.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let key = match self {
            Command::Get { key } => key,
            Command::Set { key, .. } => key,
        };
        if key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}
