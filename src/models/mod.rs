//! Wire protocol DTOs
//!
//! Commands and replies exchanged with the cache server as
//! newline-delimited JSON.

mod command;
mod reply;

pub use command::{Command, MAX_KEY_LENGTH};
pub use reply::Reply;
