//! Movement point costs, and the interface pathfinding consumes them through.

use freecol_protocol::{MoveType, Position, UnitId};

use crate::ability::Ability;
use crate::game::GameState;
use crate::map::Tile;
use crate::rules::CompiledRules;
use crate::unit::Unit;

fn has_road(tile: &Tile) -> bool {
    tile.road || tile.settlement.is_some()
}

/// Terrain cost of stepping between two adjacent tiles. `None` when either is off the map.
pub fn basic_move_cost(
    rules: &CompiledRules,
    state: &GameState,
    from: Position,
    to: Position,
) -> Option<u32> {
    let from_tile = state.tile(from)?;
    let to_tile = state.tile(to)?;
    if has_road(from_tile) && has_road(to_tile) {
        return Some(1);
    }
    if from_tile.river > 0 && to_tile.river > 0 {
        return Some(1);
    }
    Some(to_tile.kind(rules).move_cost)
}

/// Cost the unit actually pays given `moves_left`.
///
/// A unit that has not moved yet this turn may always enter an adjacent tile, as may a
/// unit entering a settlement; either spends whatever it has left.
pub fn move_cost(
    rules: &CompiledRules,
    state: &GameState,
    unit: &Unit,
    from: Position,
    to: Position,
    moves_left: u32,
) -> Option<u32> {
    let cost = basic_move_cost(rules, state, from, to)?;
    if cost <= moves_left || moves_left == 0 {
        return Some(cost);
    }
    let full_allowance = moves_left >= unit.initial_moves(rules);
    let into_settlement = state.tile(to).is_some_and(|t| t.settlement.is_some());
    if full_allowance || into_settlement {
        Some(moves_left)
    } else {
        Some(cost)
    }
}

/// Converts a classified move into a movement point cost; `None` means illegal.
pub trait CostDecider {
    fn cost_of(
        &self,
        rules: &CompiledRules,
        state: &GameState,
        unit: UnitId,
        move_type: MoveType,
        from: Position,
        to: Position,
    ) -> Option<u32>;
}

/// Costs as the server charges them.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicCostDecider;

impl CostDecider for BasicCostDecider {
    fn cost_of(
        &self,
        rules: &CompiledRules,
        state: &GameState,
        unit_id: UnitId,
        move_type: MoveType,
        from: Position,
        to: Position,
    ) -> Option<u32> {
        if !move_type.is_legal() {
            return None;
        }
        let unit = state.unit(unit_id)?;
        match move_type {
            // Sailing off the map edge ends the turn.
            MoveType::MoveHighSeas if !state.map.contains(to) => Some(unit.moves_left),
            MoveType::Move | MoveType::MoveHighSeas | MoveType::ExploreLostCityRumour => {
                move_cost(rules, state, unit, from, to, unit.moves_left)
            }
            MoveType::AttackUnit | MoveType::AttackSettlement => {
                let owner = state.player(unit.owner)?;
                if unit.abilities(rules, owner).has(Ability::MultipleAttacks) {
                    Some(1)
                } else {
                    Some(unit.moves_left)
                }
            }
            // Boarding and settlement visits end the unit's turn.
            _ => Some(unit.moves_left),
        }
    }
}
