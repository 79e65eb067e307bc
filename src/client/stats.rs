//! Client Statistics Module
//!
//! Tracks connection lifecycle metrics: connects, disconnects, and
//! reconnect attempts.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Client Stats ==
/// Tracks connection lifecycle metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientStats {
    /// Number of successfully established connections (initial and reconnects)
    pub connects: u64,
    /// Number of observed connection losses
    pub disconnects: u64,
    /// Number of reconnect attempts started
    pub reconnect_attempts: u64,
    /// Timestamp of the most recent successful connect
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent connection loss
    pub last_disconnected_at: Option<DateTime<Utc>>,
}

impl ClientStats {
    // == Constructor ==
    /// Creates a new ClientStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Connect ==
    /// Increments the connect counter and stamps the connect time.
    pub fn record_connect(&mut self) {
        self.connects += 1;
        self.last_connected_at = Some(Utc::now());
    }

    // == Record Disconnect ==
    /// Increments the disconnect counter and stamps the disconnect time.
    pub fn record_disconnect(&mut self) {
        self.disconnects += 1;
        self.last_disconnected_at = Some(Utc::now());
    }

    // == Record Reconnect Attempt ==
    /// Increments the reconnect attempt counter.
    pub fn record_reconnect_attempt(&mut self) {
        self.reconnect_attempts += 1;
    }
}
