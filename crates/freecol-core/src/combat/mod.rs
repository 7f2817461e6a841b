//! Combat: modifier assembly, odds, and adjudication of a single attack.
//!
//! Callers must classify the move first. Handing this module a pairing the classifier
//! would not produce (own units, missing units, an undefended settlement) panics.

mod modifiers;
mod resolve;

use freecol_protocol::{PlayerId, Position, SettlementId, UnitId};

use crate::game::GameState;
use crate::rules::CompiledRules;
use crate::unit::Unit;

pub use modifiers::{defence_power, defensive_modifiers, offence_power, offensive_modifiers};
pub use resolve::{combat_odds, resolve_combat, CombatResolution};

fn expect_unit(state: &GameState, id: UnitId) -> &Unit {
    state
        .unit(id)
        .unwrap_or_else(|| panic!("combat references unknown unit {id:?}"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatTarget {
    Unit(UnitId),
    Settlement(SettlementId),
}

/// Strongest candidate against `attacker`; ties go to the lowest id.
fn strongest(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    candidates: impl Iterator<Item = UnitId>,
) -> Option<UnitId> {
    let mut best: Option<(UnitId, f32)> = None;
    for id in candidates {
        let power = defence_power(rules, state, attacker, id);
        if best.map_or(true, |(_, p)| power > p) {
            best = Some((id, power));
        }
    }
    best.map(|(id, _)| id)
}

/// Unit that defends a tile without a settlement against `attacker`.
pub fn tile_defender(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    position: Position,
) -> Option<UnitId> {
    let own: PlayerId = state.unit(attacker)?.owner;
    let tile = state.tile(position)?;
    let candidates = tile
        .units
        .iter()
        .copied()
        .filter(|id| state.unit(*id).is_some_and(|u| u.owner != own));
    strongest(rules, state, attacker, candidates)
}

/// Unit that defends a settlement: the best defensive unit on the tile, else any land
/// unit there, else the first resident as the automatic defender.
pub fn settlement_defender(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    settlement: SettlementId,
) -> Option<UnitId> {
    let settlement = state.settlement(settlement)?;
    let land_units: Vec<UnitId> = state.land_units_at(rules, settlement.position, settlement.owner);
    let defensive = land_units
        .iter()
        .copied()
        .filter(|id| state.unit(*id).is_some_and(|u| u.is_defensive(rules)));
    strongest(rules, state, attacker, defensive)
        .or_else(|| strongest(rules, state, attacker, land_units.iter().copied()))
        .or_else(|| settlement.units.first().copied())
}
