//! Authoritative session server.
//!
//! Owns the seeded RNG and the only copy of the game that resolves combat. Clients submit
//! commands with their mirror checksum and receive the resulting events.

pub mod config;
pub mod game;
pub mod protocol;

pub use config::{ConfigError, ServerConfig};
pub use game::{ApplyResult, ServerGame, TurnManager};
pub use protocol::*;
