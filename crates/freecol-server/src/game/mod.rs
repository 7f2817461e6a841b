//! Game session and turn flow.

pub mod state;
mod turn;

pub use state::{ApplyResult, ServerGame};
pub use turn::TurnManager;
