//! Game state and the bookkeeping that keeps cross references consistent.
//!
//! Every relocation, ownership change or removal goes through a helper here so that
//! tile, carrier, settlement and player lists always agree with the unit's own record.
//! The client mirror replays events through the same helpers.

use freecol_protocol::wire::{hash_bytes_fnv1a64, WireError};
use freecol_protocol::{
    BuildingId, EquipmentId, PlayerId, Position, SettlementId, SettlementTypeId, Stance, UnitId,
    UnitLocation, UnitTypeId,
};
use serde::{Deserialize, Serialize};

use crate::entities::EntityStore;
use crate::map::{Map, Tile};
use crate::options::GameOptions;
use crate::player::{Player, PlayerKind};
use crate::rules::CompiledRules;
use crate::settlement::{IndianSettlement, Settlement, SettlementKind};
use crate::unit::{cargo_slots, Unit};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub turn: u32,
    pub current_player: PlayerId,
    pub options: GameOptions,
    pub map: Map,
    pub players: Vec<Player>,
    pub units: EntityStore<Unit>,
    pub settlements: EntityStore<Settlement>,
}

/// The parts of the state both sides must agree on, with entities keyed by id.
#[derive(Serialize)]
struct ChecksumView<'a> {
    turn: u32,
    current_player: PlayerId,
    options: &'a GameOptions,
    map: &'a Map,
    players: &'a [Player],
    units: Vec<(UnitId, &'a Unit)>,
    settlements: Vec<(SettlementId, &'a Settlement)>,
}

pub(crate) fn insert_sorted(list: &mut Vec<UnitId>, id: UnitId) {
    if let Err(pos) = list.binary_search(&id) {
        list.insert(pos, id);
    }
}

pub(crate) fn remove_id(list: &mut Vec<UnitId>, id: UnitId) {
    list.retain(|x| *x != id);
}

impl GameState {
    pub fn new(map: Map, options: GameOptions) -> Self {
        Self {
            turn: 1,
            current_player: PlayerId(0),
            options,
            map,
            players: Vec::new(),
            units: EntityStore::default(),
            settlements: EntityStore::default(),
        }
    }

    pub fn add_player(&mut self, name: impl Into<String>, kind: PlayerKind) -> PlayerId {
        let id = PlayerId(self.players.len() as u8);
        self.players.push(Player::new(id, name, kind));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(id)
    }

    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.settlements.get_mut(id)
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.map.tile(pos)
    }

    pub fn settlement_at(&self, pos: Position) -> Option<(SettlementId, &Settlement)> {
        let id = self.tile(pos)?.settlement?;
        Some((id, self.settlement(id)?))
    }

    /// Relation between two players. A player is always allied with itself.
    pub fn stance(&self, a: PlayerId, b: PlayerId) -> Stance {
        if a == b {
            return Stance::Alliance;
        }
        self.player(a).map(|p| p.stance(b)).unwrap_or_default()
    }

    pub fn set_stance(&mut self, a: PlayerId, b: PlayerId, stance: Stance) {
        if a == b {
            return;
        }
        if let Some(p) = self.player_mut(a) {
            p.stances.insert(b, stance);
        }
        if let Some(p) = self.player_mut(b) {
            p.stances.insert(a, stance);
        }
    }

    /// Map position of a unit: its own tile, its carrier's tile or its settlement's tile.
    pub fn unit_position(&self, id: UnitId) -> Option<Position> {
        let mut current = id;
        // Carriers do not nest more than once in practice; the bound guards bad data.
        for _ in 0..4 {
            match self.unit(current)?.location {
                UnitLocation::Tile { position } => return Some(position),
                UnitLocation::Settlement { settlement } => {
                    return self.settlement(settlement).map(|s| s.position)
                }
                UnitLocation::Carrier { carrier } => current = carrier,
                UnitLocation::Europe | UnitLocation::HighSeas => return None,
            }
        }
        None
    }

    /// Cargo holds still free on a carrier.
    pub fn space_left(&self, rules: &CompiledRules, carrier: UnitId) -> u32 {
        let Some(unit) = self.unit(carrier) else {
            return 0;
        };
        let passengers: u32 = unit
            .units
            .iter()
            .filter_map(|p| self.unit(*p))
            .map(|p| p.kind(rules).space_taken)
            .sum();
        unit.kind(rules)
            .space
            .saturating_sub(cargo_slots(&unit.goods) + passengers)
    }

    pub fn spawn_unit(
        &mut self,
        rules: &CompiledRules,
        unit_type: UnitTypeId,
        owner: PlayerId,
        location: UnitLocation,
        equipment: Vec<EquipmentId>,
    ) -> UnitId {
        let unit = Unit::new(rules, unit_type, owner, location, equipment);
        let id = self.units.insert(unit);
        self.attach(id, location);
        if let Some(p) = self.player_mut(owner) {
            p.units.insert(id);
        }
        id
    }

    pub fn found_colony(
        &mut self,
        name: impl Into<String>,
        owner: PlayerId,
        position: Position,
        buildings: Vec<BuildingId>,
    ) -> SettlementId {
        self.place_settlement(Settlement {
            name: name.into(),
            owner,
            position,
            units: Vec::new(),
            goods: Vec::new(),
            kind: SettlementKind::Colony { buildings },
        })
    }

    pub fn found_indian_settlement(
        &mut self,
        name: impl Into<String>,
        owner: PlayerId,
        position: Position,
        settlement_type: SettlementTypeId,
        learnable_skill: Option<UnitTypeId>,
    ) -> SettlementId {
        self.place_settlement(Settlement {
            name: name.into(),
            owner,
            position,
            units: Vec::new(),
            goods: Vec::new(),
            kind: SettlementKind::Indian(IndianSettlement {
                settlement_type,
                learnable_skill,
                missionary: None,
                visitors: Vec::new(),
            }),
        })
    }

    fn place_settlement(&mut self, settlement: Settlement) -> SettlementId {
        let owner = settlement.owner;
        let position = settlement.position;
        let id = self.settlements.insert(settlement);
        if let Some(tile) = self.map.tile_mut(position) {
            tile.settlement = Some(id);
            tile.owning_settlement = Some(id);
            tile.owner = Some(owner);
        }
        if let Some(p) = self.player_mut(owner) {
            p.settlements.insert(id);
        }
        id
    }

    /// Moves a unit, updating the containers on both ends.
    pub fn set_unit_location(&mut self, id: UnitId, location: UnitLocation) {
        let Some(old) = self.unit(id).map(|u| u.location) else {
            return;
        };
        self.detach(id, old);
        if let Some(unit) = self.unit_mut(id) {
            unit.location = location;
        }
        self.attach(id, location);
    }

    fn detach(&mut self, id: UnitId, location: UnitLocation) {
        match location {
            UnitLocation::Tile { position } => {
                if let Some(tile) = self.map.tile_mut(position) {
                    remove_id(&mut tile.units, id);
                }
            }
            UnitLocation::Carrier { carrier } => {
                if let Some(c) = self.unit_mut(carrier) {
                    remove_id(&mut c.units, id);
                }
            }
            UnitLocation::Settlement { settlement } => {
                if let Some(s) = self.settlement_mut(settlement) {
                    remove_id(&mut s.units, id);
                    if let Some(indian) = s.as_indian_mut() {
                        if indian.missionary == Some(id) {
                            indian.missionary = None;
                        }
                    }
                }
            }
            UnitLocation::Europe | UnitLocation::HighSeas => {}
        }
    }

    fn attach(&mut self, id: UnitId, location: UnitLocation) {
        let owner = self.unit(id).map(|u| u.owner);
        match location {
            UnitLocation::Tile { position } => {
                if let Some(tile) = self.map.tile_mut(position) {
                    insert_sorted(&mut tile.units, id);
                }
            }
            UnitLocation::Carrier { carrier } => {
                if let Some(c) = self.unit_mut(carrier) {
                    insert_sorted(&mut c.units, id);
                }
            }
            UnitLocation::Settlement { settlement } => {
                if let Some(s) = self.settlement_mut(settlement) {
                    if Some(s.owner) == owner {
                        insert_sorted(&mut s.units, id);
                    } else if let Some(indian) = s.as_indian_mut() {
                        indian.missionary = Some(id);
                    }
                }
            }
            UnitLocation::Europe | UnitLocation::HighSeas => {}
        }
    }

    pub fn change_unit_owner(&mut self, id: UnitId, owner: PlayerId) {
        let Some(old) = self.unit(id).map(|u| u.owner) else {
            return;
        };
        if old == owner {
            return;
        }
        if let Some(p) = self.player_mut(old) {
            p.units.remove(&id);
        }
        if let Some(p) = self.player_mut(owner) {
            p.units.insert(id);
        }
        if let Some(unit) = self.unit_mut(id) {
            unit.owner = owner;
        }
    }

    /// Removes a unit and everything it carries. Unknown ids are ignored.
    pub fn remove_unit(&mut self, id: UnitId) {
        let Some(unit) = self.unit(id) else {
            return;
        };
        let passengers = unit.units.clone();
        let location = unit.location;
        let owner = unit.owner;
        for passenger in passengers {
            self.remove_unit(passenger);
        }
        self.detach(id, location);
        if let Some(p) = self.player_mut(owner) {
            p.units.remove(&id);
        }
        self.units.remove(id);
    }

    /// Hands a settlement, its tile and its residents to a new owner.
    pub fn transfer_settlement(&mut self, id: SettlementId, owner: PlayerId) {
        let Some(settlement) = self.settlement(id) else {
            return;
        };
        let old = settlement.owner;
        let position = settlement.position;
        if old == owner {
            return;
        }
        if let Some(s) = self.settlement_mut(id) {
            s.owner = owner;
        }
        let claimed: Vec<Position> = self
            .map
            .iter()
            .filter(|(pos, t)| *pos == position || t.owning_settlement == Some(id))
            .map(|(pos, _)| pos)
            .collect();
        for pos in claimed {
            if let Some(tile) = self.map.tile_mut(pos) {
                tile.owner = Some(owner);
            }
        }
        if let Some(p) = self.player_mut(old) {
            p.settlements.remove(&id);
        }
        if let Some(p) = self.player_mut(owner) {
            p.settlements.insert(id);
        }
    }

    /// Removes a settlement and clears its tile. Residents must be removed first.
    pub fn remove_settlement(&mut self, id: SettlementId) {
        let Some(settlement) = self.settlements.remove(id) else {
            return;
        };
        let claimed: Vec<Position> = self
            .map
            .iter()
            .filter(|(_, t)| t.owning_settlement == Some(id))
            .map(|(pos, _)| pos)
            .collect();
        for pos in claimed {
            if let Some(tile) = self.map.tile_mut(pos) {
                tile.owning_settlement = None;
                tile.owner = None;
            }
        }
        if let Some(tile) = self.map.tile_mut(settlement.position) {
            tile.settlement = None;
        }
        if let Some(p) = self.player_mut(settlement.owner) {
            p.settlements.remove(&id);
        }
    }

    /// Land units of `owner` standing on the tile, in id order.
    pub fn land_units_at(
        &self,
        rules: &CompiledRules,
        pos: Position,
        owner: PlayerId,
    ) -> Vec<UnitId> {
        self.tile(pos)
            .map(|t| {
                t.units
                    .iter()
                    .copied()
                    .filter(|u| {
                        self.unit(*u)
                            .is_some_and(|u| u.owner == owner && !u.is_naval(rules))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn naval_units_at(&self, rules: &CompiledRules, pos: Position) -> Vec<UnitId> {
        self.tile(pos)
            .map(|t| {
                t.units
                    .iter()
                    .copied()
                    .filter(|u| self.unit(*u).is_some_and(|u| u.is_naval(rules)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// MessagePack image of the whole state, as shipped to a joining client.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// FNV-1a hash of the game-visible state. Entity store free lists are left out, so two
    /// copies that removed the same entities in a different order still agree.
    pub fn checksum(&self) -> Result<u64, WireError> {
        let view = ChecksumView {
            turn: self.turn,
            current_player: self.current_player,
            options: &self.options,
            map: &self.map,
            players: &self.players,
            units: self.units.iter_ordered().collect(),
            settlements: self.settlements.iter_ordered().collect(),
        };
        let bytes = rmp_serde::to_vec_named(&view)?;
        Ok(hash_bytes_fnv1a64(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::World;
    use freecol_protocol::{Position, UnitLocation};

    #[test]
    fn checksum_ignores_removal_order() {
        let mut w = World::new();
        let a = w.unit("free_colonist", w.dutch, Position::new(1, 1), &[]);
        let b = w.unit("free_colonist", w.dutch, Position::new(2, 2), &[]);
        w.unit("free_colonist", w.dutch, Position::new(3, 3), &[]);

        let mut left = w.state.clone();
        left.remove_unit(a);
        left.remove_unit(b);
        let mut right = w.state.clone();
        right.remove_unit(b);
        right.remove_unit(a);

        assert_eq!(
            left.checksum().expect("checksum"),
            right.checksum().expect("checksum")
        );
    }

    #[test]
    fn checksum_sees_a_move() {
        let mut w = World::new();
        let unit = w.unit("free_colonist", w.dutch, Position::new(1, 1), &[]);
        let before = w.state.checksum().expect("checksum");
        w.state.set_unit_location(
            unit,
            UnitLocation::Tile {
                position: Position::new(1, 2),
            },
        );
        assert_ne!(before, w.state.checksum().expect("checksum"));
        assert_eq!(w.state.unit_position(unit), Some(Position::new(1, 2)));
    }
}
