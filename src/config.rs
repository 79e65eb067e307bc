//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;
use std::time::Duration;

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the cache server (host:port)
    pub address: String,
    /// Whether the underlying client library should manage its own retries
    pub auto_reconnect: bool,
    /// Timeout in milliseconds for a single connect attempt
    pub connection_timeout_ms: u64,
    /// Maximum number of failed reconnect attempts before giving up (0 = unlimited)
    pub max_retries: u32,
    /// Whether the wrapper owns reconnect scheduling
    pub custom_reconnect: bool,
    /// Fixed delay in milliseconds between reconnect attempts
    pub reconnect_delay_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ADDRESS` - Cache server address (default: 127.0.0.1:7600)
    /// - `AUTO_RECONNECT` - Underlying-library retry flag (default: true)
    /// - `CONNECTION_TIMEOUT_MS` - Connect timeout in ms (default: 5000)
    /// - `MAX_RETRIES` - Reconnect attempt ceiling, 0 = unlimited (default: 0)
    /// - `CUSTOM_RECONNECT` - Wrapper-owned reconnect scheduling (default: true)
    /// - `RECONNECT_DELAY_MS` - Fixed reconnect delay in ms (default: 1000)
    pub fn from_env() -> Self {
        Self {
            address: env::var("CACHE_ADDRESS").unwrap_or_else(|_| "127.0.0.1:7600".to_string()),
            auto_reconnect: env::var("AUTO_RECONNECT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            connection_timeout_ms: env::var("CONNECTION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            custom_reconnect: env::var("CUSTOM_RECONNECT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            reconnect_delay_ms: env::var("RECONNECT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        }
    }

    /// Returns the connect timeout as a Duration.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Returns the fixed reconnect delay as a Duration.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7600".to_string(),
            auto_reconnect: true,
            connection_timeout_ms: 5000,
            max_retries: 0,
            custom_reconnect: true,
            reconnect_delay_ms: 1000,
        }
    }
}
