//! Rules data: compiled from YAML into dense, id-indexed tables.

mod loader;
mod types;

pub use loader::{load_rules, RulesError, RulesSource};
pub use types::*;
