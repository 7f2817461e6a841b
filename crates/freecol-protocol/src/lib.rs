//! Shared vocabulary between the rules core, the server and clients.

mod command;
mod event;
mod ids;
mod move_type;
mod position;
mod types;
pub mod wire;

pub use crate::command::*;
pub use crate::event::*;
pub use crate::ids::*;
pub use crate::move_type::*;
pub use crate::position::*;
pub use crate::types::*;
