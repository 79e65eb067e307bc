//! Recache - A reconnecting key-value cache client
//!
//! Wraps a single cache connection with automatic reconnect scheduling,
//! so that dropped connections are re-established without caller involvement.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod transport;

pub use client::{ClientStats, ConnectionState, ReconnectingClient};
pub use config::Config;
pub use error::{ClientError, Result};
pub use server::CacheServer;
pub use transport::TcpTransport;
