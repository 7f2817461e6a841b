use std::collections::HashMap;

use freecol_protocol::{
    BuildingId, DataId, EquipmentId, FatherId, GoodsTypeId, SettlementTypeId, TileTypeId,
    UnitTypeId,
};
use serde::Deserialize;

use crate::ability::{Ability, AbilitySet};
use crate::modifier::{Modifier, ModifierKind, ModifierSource, ModifierTarget, Scope, ScopeKind};
use crate::rules::RulesError;

#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub tile_types: Vec<TileType>,
    pub unit_types: Vec<UnitType>,
    pub equipment: Vec<EquipmentType>,
    pub goods: Vec<GoodsType>,
    pub buildings: Vec<BuildingType>,
    pub settlement_types: Vec<SettlementType>,
    pub fathers: Vec<FoundingFather>,
    pub combat: CombatConstants,

    pub tile_type_ids: HashMap<DataId, TileTypeId>,
    pub unit_type_ids: HashMap<DataId, UnitTypeId>,
    pub equipment_ids: HashMap<DataId, EquipmentId>,
    pub goods_ids: HashMap<DataId, GoodsTypeId>,
    pub building_ids: HashMap<DataId, BuildingId>,
    pub settlement_type_ids: HashMap<DataId, SettlementTypeId>,
    pub father_ids: HashMap<DataId, FatherId>,
}

impl CompiledRules {
    pub fn tile_type(&self, id: TileTypeId) -> &TileType {
        &self.tile_types[id.raw as usize]
    }

    pub fn unit_type(&self, id: UnitTypeId) -> &UnitType {
        &self.unit_types[id.raw as usize]
    }

    pub fn equipment(&self, id: EquipmentId) -> &EquipmentType {
        &self.equipment[id.raw as usize]
    }

    pub fn goods(&self, id: GoodsTypeId) -> &GoodsType {
        &self.goods[id.raw as usize]
    }

    pub fn building(&self, id: BuildingId) -> &BuildingType {
        &self.buildings[id.raw as usize]
    }

    pub fn settlement_type(&self, id: SettlementTypeId) -> &SettlementType {
        &self.settlement_types[id.raw as usize]
    }

    pub fn father(&self, id: FatherId) -> &FoundingFather {
        &self.fathers[id.raw as usize]
    }

    pub fn tile_type_id(&self, data_id: &str) -> Option<TileTypeId> {
        self.tile_type_ids.get(data_id).copied()
    }

    pub fn unit_type_id(&self, data_id: &str) -> Option<UnitTypeId> {
        self.unit_type_ids.get(data_id).copied()
    }

    pub fn equipment_id(&self, data_id: &str) -> Option<EquipmentId> {
        self.equipment_ids.get(data_id).copied()
    }

    pub fn goods_id(&self, data_id: &str) -> Option<GoodsTypeId> {
        self.goods_ids.get(data_id).copied()
    }

    pub fn building_id(&self, data_id: &str) -> Option<BuildingId> {
        self.building_ids.get(data_id).copied()
    }

    pub fn settlement_type_id(&self, data_id: &str) -> Option<SettlementTypeId> {
        self.settlement_type_ids.get(data_id).copied()
    }

    pub fn father_id(&self, data_id: &str) -> Option<FatherId> {
        self.father_ids.get(data_id).copied()
    }
}

/// Ids resolved in the first compile pass, used to link cross references.
pub(crate) struct IdTables {
    pub unit_types: HashMap<DataId, UnitTypeId>,
    pub equipment: HashMap<DataId, EquipmentId>,
}

impl IdTables {
    fn unit_type(&self, data_id: &str) -> Result<UnitTypeId, RulesError> {
        self.unit_types
            .get(data_id)
            .copied()
            .ok_or_else(|| RulesError::MissingId(format!("unit type `{data_id}`")))
    }

    fn equipment(&self, data_id: &str) -> Result<EquipmentId, RulesError> {
        self.equipment
            .get(data_id)
            .copied()
            .ok_or_else(|| RulesError::MissingId(format!("equipment `{data_id}`")))
    }
}

fn default_move_cost() -> u32 {
    1
}

fn default_space_taken() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScope {
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub ability: Option<Ability>,
    #[serde(default)]
    pub naval: Option<bool>,
    #[serde(default)]
    pub negated: bool,
}

impl RawScope {
    fn compile(&self, ids: &IdTables) -> Result<Scope, RulesError> {
        let kind = match (&self.unit_type, self.ability, self.naval) {
            (Some(unit_type), None, None) => ScopeKind::UnitType(ids.unit_type(unit_type)?),
            (None, Some(ability), None) => ScopeKind::Ability(ability),
            (None, None, Some(naval)) => ScopeKind::Naval(naval),
            _ => {
                return Err(RulesError::InvalidScope(
                    "scope must name exactly one of unit_type, ability, naval".to_string(),
                ))
            }
        };
        Ok(Scope {
            kind,
            negated: self.negated,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawModifier {
    pub target: ModifierTarget,
    pub kind: ModifierKind,
    pub value: f32,
    #[serde(default)]
    pub scopes: Vec<RawScope>,
    #[serde(default)]
    pub first_turn: Option<u32>,
    #[serde(default)]
    pub last_turn: Option<u32>,
}

impl RawModifier {
    fn compile(&self, source: ModifierSource, ids: &IdTables) -> Result<Modifier, RulesError> {
        let scopes = self
            .scopes
            .iter()
            .map(|s| s.compile(ids))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Modifier {
            target: self.target,
            source,
            kind: self.kind,
            value: self.value,
            scopes,
            first_turn: self.first_turn,
            last_turn: self.last_turn,
        })
    }
}

fn compile_modifiers(
    raw: &[RawModifier],
    source: ModifierSource,
    ids: &IdTables,
) -> Result<Vec<Modifier>, RulesError> {
    raw.iter().map(|m| m.compile(source, ids)).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTileType {
    pub name: String,
    pub land: bool,
    #[serde(default)]
    pub high_seas: bool,
    #[serde(default = "default_move_cost")]
    pub move_cost: u32,
    /// Percentage defence bonus granted to units standing here.
    #[serde(default)]
    pub defence_bonus: i32,
    #[serde(default)]
    pub ambush_terrain: bool,
}

#[derive(Debug, Clone)]
pub struct TileType {
    pub id: TileTypeId,
    pub name: String,
    pub land: bool,
    pub high_seas: bool,
    pub move_cost: u32,
    pub defence_bonus: i32,
    pub ambush_terrain: bool,
}

impl RawTileType {
    pub fn compile(self, id: TileTypeId) -> TileType {
        TileType {
            id,
            name: self.name,
            land: self.land,
            high_seas: self.high_seas,
            move_cost: self.move_cost.max(1),
            defence_bonus: self.defence_bonus,
            ambush_terrain: self.ambush_terrain,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUnitType {
    pub name: String,
    pub offence: u32,
    pub defence: u32,
    pub movement: u32,
    #[serde(default)]
    pub space: u32,
    #[serde(default = "default_space_taken")]
    pub space_taken: u32,
    #[serde(default)]
    pub naval: bool,
    #[serde(default)]
    pub person: bool,
    #[serde(default)]
    pub can_learn_from_natives: bool,
    #[serde(default)]
    pub repair_turns: u32,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub modifiers: Vec<RawModifier>,
    #[serde(default)]
    pub promotion: Option<String>,
    #[serde(default)]
    pub demotion: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub name: String,
    pub offence: u32,
    pub defence: u32,
    pub movement: u32,
    pub space: u32,
    pub space_taken: u32,
    pub naval: bool,
    pub person: bool,
    pub can_learn_from_natives: bool,
    pub repair_turns: u32,
    pub abilities: AbilitySet,
    pub modifiers: Vec<Modifier>,
    pub promotion: Option<UnitTypeId>,
    pub demotion: Option<UnitTypeId>,
}

impl UnitType {
    pub fn can_carry_goods(&self) -> bool {
        self.space > 0 && self.abilities.has(Ability::CarryGoods)
    }

    pub fn can_carry_units(&self) -> bool {
        self.space > 0 && self.abilities.has(Ability::CarryUnits)
    }
}

impl RawUnitType {
    pub(crate) fn compile(self, id: UnitTypeId, ids: &IdTables) -> Result<UnitType, RulesError> {
        let modifiers = compile_modifiers(&self.modifiers, ModifierSource::UnitType(id), ids)?;
        let promotion = self.promotion.as_deref().map(|p| ids.unit_type(p)).transpose()?;
        let demotion = self.demotion.as_deref().map(|d| ids.unit_type(d)).transpose()?;
        Ok(UnitType {
            id,
            name: self.name,
            offence: self.offence,
            defence: self.defence,
            movement: self.movement,
            space: self.space,
            space_taken: self.space_taken,
            naval: self.naval,
            person: self.person,
            can_learn_from_natives: self.can_learn_from_natives,
            repair_turns: self.repair_turns,
            abilities: self.abilities.into_iter().collect(),
            modifiers,
            promotion,
            demotion,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEquipmentType {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<RawModifier>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub movement_bonus: u32,
    /// Higher priority is lost first; absent means combat never strips it.
    #[serde(default)]
    pub combat_loss_priority: Option<u32>,
    /// What a capturing unit turns this equipment into.
    #[serde(default)]
    pub capture_as: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EquipmentType {
    pub id: EquipmentId,
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub abilities: AbilitySet,
    pub movement_bonus: u32,
    pub combat_loss_priority: Option<u32>,
    pub capture_as: Option<EquipmentId>,
}

impl RawEquipmentType {
    pub(crate) fn compile(
        self,
        id: EquipmentId,
        ids: &IdTables,
    ) -> Result<EquipmentType, RulesError> {
        let modifiers = compile_modifiers(&self.modifiers, ModifierSource::Equipment(id), ids)?;
        let capture_as = self.capture_as.as_deref().map(|e| ids.equipment(e)).transpose()?;
        Ok(EquipmentType {
            id,
            name: self.name,
            modifiers,
            abilities: self.abilities.into_iter().collect(),
            movement_bonus: self.movement_bonus,
            combat_loss_priority: self.combat_loss_priority,
            capture_as,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGoodsType {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GoodsType {
    pub id: GoodsTypeId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBuildingType {
    pub name: String,
    #[serde(default)]
    pub defence_bonus: i32,
    /// Stockade-class buildings replace the fortification bonus.
    #[serde(default)]
    pub blocks_fortify: bool,
    #[serde(default)]
    pub repairs_ships: bool,
    #[serde(default = "default_true")]
    pub pillageable: bool,
}

#[derive(Debug, Clone)]
pub struct BuildingType {
    pub id: BuildingId,
    pub name: String,
    pub defence_bonus: i32,
    pub blocks_fortify: bool,
    pub repairs_ships: bool,
    pub pillageable: bool,
}

impl RawBuildingType {
    pub fn compile(self, id: BuildingId) -> BuildingType {
        BuildingType {
            id,
            name: self.name,
            defence_bonus: self.defence_bonus,
            blocks_fortify: self.blocks_fortify,
            repairs_ships: self.repairs_ships,
            pillageable: self.pillageable,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSettlementType {
    pub name: String,
    #[serde(default)]
    pub defence_bonus: i32,
    #[serde(default)]
    pub plunder_min: u32,
    #[serde(default)]
    pub plunder_range: u32,
}

#[derive(Debug, Clone)]
pub struct SettlementType {
    pub id: SettlementTypeId,
    pub name: String,
    pub defence_bonus: i32,
    pub plunder_min: u32,
    pub plunder_range: u32,
}

impl RawSettlementType {
    pub fn compile(self, id: SettlementTypeId) -> SettlementType {
        SettlementType {
            id,
            name: self.name,
            defence_bonus: self.defence_bonus,
            plunder_min: self.plunder_min,
            plunder_range: self.plunder_range,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFoundingFather {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<RawModifier>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

#[derive(Debug, Clone)]
pub struct FoundingFather {
    pub id: FatherId,
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub abilities: AbilitySet,
}

impl RawFoundingFather {
    pub(crate) fn compile(self, id: FatherId, ids: &IdTables) -> Result<FoundingFather, RulesError> {
        let modifiers = compile_modifiers(&self.modifiers, ModifierSource::Father(id), ids)?;
        Ok(FoundingFather {
            id,
            name: self.name,
            modifiers,
            abilities: self.abilities.into_iter().collect(),
        })
    }
}

/// Fixed combat and diplomacy numbers. Percentages are whole percent.
#[derive(Debug, Clone, Deserialize)]
pub struct CombatConstants {
    pub attack_bonus: f32,
    pub big_movement_penalty: f32,
    pub small_movement_penalty: f32,
    pub cargo_penalty: f32,
    /// Goods units per cargo penalty step.
    pub cargo_penalty_step: u32,
    pub fortified_bonus: f32,
    pub artillery_in_the_open: f32,
    pub artillery_against_raid: f32,
    pub amphibious_attack: f32,
    /// Fraction of either side of the odds treated as a great result.
    pub great_result_fraction: f32,
    pub tension_unit_attacked: i32,
    pub tension_unit_destroyed: i32,
    pub tension_settlement_attacked: i32,
    pub tension_settlement_destroyed: i32,
    pub mission_ban_tension: i32,
    pub chief_gift_min: u32,
    pub chief_gift_range: u32,
}
