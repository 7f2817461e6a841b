//! Small hand-built worlds for unit tests.

use freecol_protocol::{
    EquipmentId, PlayerId, Position, SettlementId, Stance, UnitId, UnitLocation, UnitTypeId,
};

use crate::game::GameState;
use crate::map::Map;
use crate::options::GameOptions;
use crate::player::PlayerKind;
use crate::rng::RandomSource;
use crate::rules::{load_rules, CompiledRules, RulesSource};

/// Always returns the same draw.
pub(crate) struct FixedDraw(pub f32);

impl RandomSource for FixedDraw {
    fn next_unit(&mut self) -> f32 {
        self.0
    }

    fn below(&mut self, _n: u32) -> u32 {
        0
    }
}

/// A 12x12 plains map with two European players and one native tribe, all at peace.
pub(crate) struct World {
    pub rules: CompiledRules,
    pub state: GameState,
    pub dutch: PlayerId,
    pub english: PlayerId,
    pub arawak: PlayerId,
}

impl World {
    pub fn new() -> Self {
        let rules = load_rules(RulesSource::Embedded).expect("rules load");
        let plains = rules.tile_type_id("plains").expect("plains");
        let mut state = GameState::new(Map::new(12, 12, plains), GameOptions::default());
        let dutch = state.add_player("Dutch", PlayerKind::European);
        let english = state.add_player("English", PlayerKind::European);
        let arawak = state.add_player("Arawak", PlayerKind::Native);
        state.set_stance(dutch, english, Stance::Peace);
        state.set_stance(dutch, arawak, Stance::Peace);
        state.set_stance(english, arawak, Stance::Peace);
        Self {
            rules,
            state,
            dutch,
            english,
            arawak,
        }
    }

    pub fn unit_type(&self, name: &str) -> UnitTypeId {
        self.rules.unit_type_id(name).expect("unit type")
    }

    pub fn equipment(&self, names: &[&str]) -> Vec<EquipmentId> {
        names
            .iter()
            .map(|n| self.rules.equipment_id(n).expect("equipment"))
            .collect()
    }

    pub fn set_tile(&mut self, pos: Position, name: &str) {
        let id = self.rules.tile_type_id(name).expect("tile type");
        self.state.map.set_tile_type(pos, id);
    }

    pub fn unit(&mut self, name: &str, owner: PlayerId, pos: Position, equipment: &[&str]) -> UnitId {
        let unit_type = self.unit_type(name);
        let equipment = self.equipment(equipment);
        self.state.spawn_unit(
            &self.rules,
            unit_type,
            owner,
            UnitLocation::Tile { position: pos },
            equipment,
        )
    }

    pub fn aboard(&mut self, name: &str, owner: PlayerId, carrier: UnitId, equipment: &[&str]) -> UnitId {
        let unit_type = self.unit_type(name);
        let equipment = self.equipment(equipment);
        self.state.spawn_unit(
            &self.rules,
            unit_type,
            owner,
            UnitLocation::Carrier { carrier },
            equipment,
        )
    }

    pub fn colony(&mut self, owner: PlayerId, pos: Position, buildings: &[&str]) -> SettlementId {
        let buildings = buildings
            .iter()
            .map(|b| self.rules.building_id(b).expect("building"))
            .collect();
        self.state.found_colony("Colony", owner, pos, buildings)
    }

    pub fn village(&mut self, owner: PlayerId, pos: Position, skill: Option<&str>) -> SettlementId {
        let settlement_type = self.rules.settlement_type_id("village").expect("village");
        let skill = skill.map(|s| self.unit_type(s));
        self.state
            .found_indian_settlement("Village", owner, pos, settlement_type, skill)
    }

    /// A colonist working inside the settlement.
    pub fn resident(&mut self, name: &str, settlement: SettlementId) -> UnitId {
        let owner = self.state.settlement(settlement).expect("settlement").owner;
        let unit_type = self.unit_type(name);
        self.state.spawn_unit(
            &self.rules,
            unit_type,
            owner,
            UnitLocation::Settlement { settlement },
            Vec::new(),
        )
    }

    pub fn war(&mut self, a: PlayerId, b: PlayerId) {
        self.state.set_stance(a, b, Stance::War);
    }
}
