//! Starting positions described in YAML and built into a [`GameState`].

use std::collections::BTreeMap;

use freecol_protocol::{
    EquipmentId, GoodsAmount, PlayerId, Position, Stance, UnitLocation, UnitTypeId,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::game::GameState;
use crate::map::Map;
use crate::options::GameOptions;
use crate::player::PlayerKind;
use crate::rules::CompiledRules;
use crate::unit::add_goods;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown {kind} '{name}'")]
    UnknownId { kind: &'static str, name: String },
    #[error("unknown player '{0}'")]
    UnknownPlayer(String),
    #[error("position ({0}, {1}) is off the map")]
    OffMap(i32, i32),
    #[error("tile ({0}, {1}) already holds a settlement")]
    SettlementClash(i32, i32),
}

pub enum ScenarioSource<'a> {
    Embedded,
    Path(String),
    Text(&'a str),
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    name: String,
    width: i32,
    height: i32,
    fill: String,
    #[serde(default)]
    options: GameOptions,
    #[serde(default)]
    terrain: Vec<RawTerrain>,
    #[serde(default)]
    roads: Vec<[i32; 2]>,
    #[serde(default)]
    rivers: Vec<[i32; 2]>,
    #[serde(default)]
    rumours: Vec<[i32; 2]>,
    players: Vec<RawPlayer>,
    #[serde(default)]
    stances: Vec<RawStance>,
    #[serde(default)]
    settlements: Vec<RawSettlement>,
    #[serde(default)]
    units: Vec<RawUnit>,
}

/// Either a single tile (`at`) or an inclusive rectangle (`from`..`to`).
#[derive(Debug, Deserialize)]
struct RawTerrain {
    tile: String,
    at: Option<[i32; 2]>,
    from: Option<[i32; 2]>,
    to: Option<[i32; 2]>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
    kind: PlayerKind,
    #[serde(default)]
    gold: i32,
    #[serde(default)]
    fathers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawStance {
    a: String,
    b: String,
    stance: Stance,
}

#[derive(Debug, Deserialize)]
struct RawSettlement {
    name: String,
    owner: String,
    at: [i32; 2],
    colony: Option<RawColony>,
    native: Option<RawNative>,
    #[serde(default)]
    residents: Vec<String>,
    #[serde(default)]
    goods: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct RawColony {
    #[serde(default)]
    buildings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawNative {
    settlement_type: String,
    skill: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUnit {
    #[serde(rename = "type")]
    unit_type: String,
    owner: String,
    at: [i32; 2],
    #[serde(default)]
    equipment: Vec<String>,
    #[serde(default)]
    goods: BTreeMap<String, u32>,
    #[serde(default)]
    passengers: Vec<RawPassenger>,
}

#[derive(Debug, Deserialize)]
struct RawPassenger {
    #[serde(rename = "type")]
    unit_type: String,
    #[serde(default)]
    equipment: Vec<String>,
}

pub fn load_scenario(
    rules: &CompiledRules,
    source: ScenarioSource<'_>,
) -> Result<GameState, ScenarioError> {
    let raw: RawScenario = match source {
        ScenarioSource::Embedded => {
            serde_yaml::from_str(include_str!("../data/scenarios/new_world.yaml"))?
        }
        ScenarioSource::Path(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        ScenarioSource::Text(text) => serde_yaml::from_str(text)?,
    };
    Builder { rules, players: BTreeMap::new() }.build(raw)
}

fn unknown(kind: &'static str, name: &str) -> ScenarioError {
    ScenarioError::UnknownId {
        kind,
        name: name.to_string(),
    }
}

struct Builder<'r> {
    rules: &'r CompiledRules,
    players: BTreeMap<String, PlayerId>,
}

impl Builder<'_> {
    fn build(mut self, raw: RawScenario) -> Result<GameState, ScenarioError> {
        let rules = self.rules;
        let fill = rules
            .tile_type_id(&raw.fill)
            .ok_or_else(|| unknown("tile type", &raw.fill))?;
        let mut state = GameState::new(Map::new(raw.width, raw.height, fill), raw.options);

        for region in &raw.terrain {
            let tile_type = rules
                .tile_type_id(&region.tile)
                .ok_or_else(|| unknown("tile type", &region.tile))?;
            let (from, to) = match (region.at, region.from, region.to) {
                (Some(at), _, _) => (at, at),
                (None, Some(from), Some(to)) => (from, to),
                _ => return Err(unknown("terrain region for", &region.tile)),
            };
            for y in from[1]..=to[1] {
                for x in from[0]..=to[0] {
                    let pos = self.position(&state, [x, y])?;
                    state.map.set_tile_type(pos, tile_type);
                }
            }
        }
        for at in &raw.roads {
            let pos = self.position(&state, *at)?;
            if let Some(tile) = state.map.tile_mut(pos) {
                tile.road = true;
            }
        }
        for at in &raw.rivers {
            let pos = self.position(&state, *at)?;
            if let Some(tile) = state.map.tile_mut(pos) {
                tile.river = 1;
            }
        }
        for at in &raw.rumours {
            let pos = self.position(&state, *at)?;
            if let Some(tile) = state.map.tile_mut(pos) {
                tile.lost_city_rumour = true;
            }
        }

        for p in &raw.players {
            let id = state.add_player(&p.name, p.kind);
            let fathers = p
                .fathers
                .iter()
                .map(|f| rules.father_id(f).ok_or_else(|| unknown("founding father", f)))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(player) = state.player_mut(id) {
                player.gold = p.gold;
                player.fathers = fathers;
            }
            self.players.insert(p.name.clone(), id);
        }
        for s in &raw.stances {
            let (a, b) = (self.player(&s.a)?, self.player(&s.b)?);
            state.set_stance(a, b, s.stance);
        }

        for s in &raw.settlements {
            self.settlement(&mut state, s)?;
        }
        for u in &raw.units {
            self.unit(&mut state, u)?;
        }
        debug!(
            scenario = %raw.name,
            units = state.units.len(),
            settlements = state.settlements.len(),
            "scenario built"
        );
        Ok(state)
    }

    fn position(&self, state: &GameState, at: [i32; 2]) -> Result<Position, ScenarioError> {
        let pos = Position::new(at[0], at[1]);
        if state.map.contains(pos) {
            Ok(pos)
        } else {
            Err(ScenarioError::OffMap(at[0], at[1]))
        }
    }

    fn player(&self, name: &str) -> Result<PlayerId, ScenarioError> {
        self.players
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownPlayer(name.to_string()))
    }

    fn unit_type(&self, name: &str) -> Result<UnitTypeId, ScenarioError> {
        self.rules
            .unit_type_id(name)
            .ok_or_else(|| unknown("unit type", name))
    }

    fn equipment(&self, names: &[String]) -> Result<Vec<EquipmentId>, ScenarioError> {
        names
            .iter()
            .map(|n| self.rules.equipment_id(n).ok_or_else(|| unknown("equipment", n)))
            .collect()
    }

    fn goods(&self, raw: &BTreeMap<String, u32>) -> Result<Vec<GoodsAmount>, ScenarioError> {
        let mut goods = Vec::new();
        for (name, amount) in raw {
            let id = self.rules.goods_id(name).ok_or_else(|| unknown("goods", name))?;
            add_goods(&mut goods, id, *amount);
        }
        Ok(goods)
    }

    fn settlement(&self, state: &mut GameState, raw: &RawSettlement) -> Result<(), ScenarioError> {
        let rules = self.rules;
        let owner = self.player(&raw.owner)?;
        let pos = self.position(state, raw.at)?;
        if state.settlement_at(pos).is_some() {
            return Err(ScenarioError::SettlementClash(raw.at[0], raw.at[1]));
        }
        let id = match (&raw.colony, &raw.native) {
            (Some(colony), _) => {
                let buildings = colony
                    .buildings
                    .iter()
                    .map(|b| rules.building_id(b).ok_or_else(|| unknown("building", b)))
                    .collect::<Result<Vec<_>, _>>()?;
                state.found_colony(&raw.name, owner, pos, buildings)
            }
            (None, Some(native)) => {
                let settlement_type = rules
                    .settlement_type_id(&native.settlement_type)
                    .ok_or_else(|| unknown("settlement type", &native.settlement_type))?;
                let skill = native
                    .skill
                    .as_deref()
                    .map(|s| self.unit_type(s))
                    .transpose()?;
                state.found_indian_settlement(&raw.name, owner, pos, settlement_type, skill)
            }
            (None, None) => return Err(unknown("settlement kind for", &raw.name)),
        };
        let goods = self.goods(&raw.goods)?;
        if let Some(settlement) = state.settlement_mut(id) {
            settlement.goods = goods;
        }
        for resident in &raw.residents {
            let unit_type = self.unit_type(resident)?;
            state.spawn_unit(
                rules,
                unit_type,
                owner,
                UnitLocation::Settlement { settlement: id },
                Vec::new(),
            );
        }
        Ok(())
    }

    fn unit(&self, state: &mut GameState, raw: &RawUnit) -> Result<(), ScenarioError> {
        let rules = self.rules;
        let owner = self.player(&raw.owner)?;
        let position = self.position(state, raw.at)?;
        let unit_type = self.unit_type(&raw.unit_type)?;
        let equipment = self.equipment(&raw.equipment)?;
        let goods = self.goods(&raw.goods)?;
        let id = state.spawn_unit(
            rules,
            unit_type,
            owner,
            UnitLocation::Tile { position },
            equipment,
        );
        if let Some(unit) = state.unit_mut(id) {
            unit.goods = goods;
        }
        for passenger in &raw.passengers {
            let unit_type = self.unit_type(&passenger.unit_type)?;
            let equipment = self.equipment(&passenger.equipment)?;
            state.spawn_unit(
                rules,
                unit_type,
                owner,
                UnitLocation::Carrier { carrier: id },
                equipment,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_rules, RulesSource};

    #[test]
    fn embedded_scenario_builds() {
        let rules = load_rules(RulesSource::Embedded).expect("rules load");
        let state = load_scenario(&rules, ScenarioSource::Embedded).expect("scenario");

        assert_eq!(state.players.len(), 3);
        let dutch = PlayerId(0);
        let (_, oranje) = state.settlement_at(Position::new(5, 4)).expect("colony");
        assert_eq!(oranje.owner, dutch);
        assert_eq!(oranje.population(), 2);
        assert_eq!(state.tile(Position::new(5, 4)).expect("tile").owner, Some(dutch));

        let caravel = state
            .tile(Position::new(4, 4))
            .and_then(|t| t.units.first().copied())
            .expect("caravel");
        assert_eq!(state.unit(caravel).expect("caravel").units.len(), 1);
        assert_eq!(state.stance(dutch, PlayerId(1)), Stance::Peace);
        assert_eq!(state.stance(PlayerId(1), PlayerId(2)), Stance::Uncontacted);
    }

    #[test]
    fn unknown_names_are_reported() {
        let rules = load_rules(RulesSource::Embedded).expect("rules load");
        let text = "
name: Broken
width: 4
height: 4
fill: plains
players:
  - { name: Dutch, kind: european }
units:
  - { type: dragon, owner: Dutch, at: [1, 1] }
";
        let err = load_scenario(&rules, ScenarioSource::Text(text)).expect_err("unknown unit");
        assert!(matches!(err, ScenarioError::UnknownId { kind: "unit type", .. }));

        let off_map = text.replace("dragon", "free_colonist").replace("[1, 1]", "[9, 9]");
        let err = load_scenario(&rules, ScenarioSource::Text(&off_map)).expect_err("off map");
        assert!(matches!(err, ScenarioError::OffMap(9, 9)));
    }
}
