//! Rules core for a colonization game: move classification, combat adjudication and
//! the controller that applies both to a shared game state.

mod ability;
mod combat;
mod cost;
mod engine;
mod entities;
mod game;
mod map;
mod mirror;
mod modifier;
mod movement;
mod options;
mod player;
mod rng;
mod rules;
mod scenario;
mod settlement;
mod unit;
mod was;

#[cfg(test)]
mod testing;

pub use crate::ability::*;
pub use crate::combat::*;
pub use crate::cost::*;
pub use crate::engine::*;
pub use crate::entities::*;
pub use crate::game::*;
pub use crate::map::*;
pub use crate::mirror::*;
pub use crate::modifier::*;
pub use crate::movement::*;
pub use crate::options::*;
pub use crate::player::*;
pub use crate::rng::*;
pub use crate::rules::*;
pub use crate::scenario::*;
pub use crate::settlement::*;
pub use crate::unit::*;
pub use crate::was::*;
