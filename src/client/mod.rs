//! Client Module
//!
//! The reconnecting client wrapper and its supporting pieces: the pure
//! lifecycle state machine, the cancellable reconnect timer, and connection
//! statistics.

mod state;
mod stats;
mod timer;
mod wrapper;


pub use state::{ConnectionState, Effect, LifecycleEvent, StateMachine};
pub use stats::ClientStats;
pub use wrapper::ReconnectingClient;
