use std::collections::{BTreeMap, HashMap};

use freecol_protocol::{
    BuildingId, DataId, EquipmentId, FatherId, GoodsTypeId, RuntimeId, SettlementTypeId,
    TileTypeId, UnitTypeId,
};
use serde::Deserialize;
use thiserror::Error;

use crate::rules::types::IdTables;
use crate::rules::{
    CombatConstants, CompiledRules, GoodsType, RawBuildingType, RawEquipmentType,
    RawFoundingFather, RawGoodsType, RawSettlementType, RawTileType, RawUnitType,
};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("invalid modifier scope: {0}")]
    InvalidScope(String),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    Path(String),
    Bytes {
        tiles: &'a [u8],
        units: &'a [u8],
        equipment: &'a [u8],
        goods: &'a [u8],
        buildings: &'a [u8],
        settlements: &'a [u8],
        fathers: &'a [u8],
        combat: &'a [u8],
    },
}

#[derive(Debug, Deserialize)]
struct RawRules {
    tiles: BTreeMap<String, RawTileType>,
    units: BTreeMap<String, RawUnitType>,
    equipment: BTreeMap<String, RawEquipmentType>,
    goods: BTreeMap<String, RawGoodsType>,
    buildings: BTreeMap<String, RawBuildingType>,
    settlements: BTreeMap<String, RawSettlementType>,
    fathers: BTreeMap<String, RawFoundingFather>,
    combat: CombatConstants,
}

struct RulesText<'a> {
    tiles: &'a str,
    units: &'a str,
    equipment: &'a str,
    goods: &'a str,
    buildings: &'a str,
    settlements: &'a str,
    fathers: &'a str,
    combat: &'a str,
}

pub fn load_rules(source: RulesSource<'_>) -> Result<CompiledRules, RulesError> {
    let raw: RawRules = match source {
        RulesSource::Embedded => parse_raw_rules(RulesText {
            tiles: include_str!("../../data/classic/tiles.yaml"),
            units: include_str!("../../data/classic/units.yaml"),
            equipment: include_str!("../../data/classic/equipment.yaml"),
            goods: include_str!("../../data/classic/goods.yaml"),
            buildings: include_str!("../../data/classic/buildings.yaml"),
            settlements: include_str!("../../data/classic/settlements.yaml"),
            fathers: include_str!("../../data/classic/fathers.yaml"),
            combat: include_str!("../../data/classic/combat.yaml"),
        })?,
        RulesSource::Path(path) => {
            let tiles = std::fs::read_to_string(format!("{path}/tiles.yaml"))?;
            let units = std::fs::read_to_string(format!("{path}/units.yaml"))?;
            let equipment = std::fs::read_to_string(format!("{path}/equipment.yaml"))?;
            let goods = std::fs::read_to_string(format!("{path}/goods.yaml"))?;
            let buildings = std::fs::read_to_string(format!("{path}/buildings.yaml"))?;
            let settlements = std::fs::read_to_string(format!("{path}/settlements.yaml"))?;
            let fathers = std::fs::read_to_string(format!("{path}/fathers.yaml"))?;
            let combat = std::fs::read_to_string(format!("{path}/combat.yaml"))?;
            parse_raw_rules(RulesText {
                tiles: &tiles,
                units: &units,
                equipment: &equipment,
                goods: &goods,
                buildings: &buildings,
                settlements: &settlements,
                fathers: &fathers,
                combat: &combat,
            })?
        }
        RulesSource::Bytes {
            tiles,
            units,
            equipment,
            goods,
            buildings,
            settlements,
            fathers,
            combat,
        } => parse_raw_rules(RulesText {
            tiles: std::str::from_utf8(tiles)?,
            units: std::str::from_utf8(units)?,
            equipment: std::str::from_utf8(equipment)?,
            goods: std::str::from_utf8(goods)?,
            buildings: std::str::from_utf8(buildings)?,
            settlements: std::str::from_utf8(settlements)?,
            fathers: std::str::from_utf8(fathers)?,
            combat: std::str::from_utf8(combat)?,
        })?,
    };

    compile_rules(raw)
}

fn parse_raw_rules(text: RulesText<'_>) -> Result<RawRules, RulesError> {
    Ok(RawRules {
        tiles: serde_yaml::from_str(text.tiles)?,
        units: serde_yaml::from_str(text.units)?,
        equipment: serde_yaml::from_str(text.equipment)?,
        goods: serde_yaml::from_str(text.goods)?,
        buildings: serde_yaml::from_str(text.buildings)?,
        settlements: serde_yaml::from_str(text.settlements)?,
        fathers: serde_yaml::from_str(text.fathers)?,
        combat: serde_yaml::from_str(text.combat)?,
    })
}

/// Dense ids in key order. BTreeMap iteration keeps the assignment stable across loads.
fn assign_ids<V, Tag>(raw: &BTreeMap<String, V>) -> HashMap<DataId, RuntimeId<Tag>> {
    raw.keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), RuntimeId::new(i as u16)))
        .collect()
}

fn compile_rules(raw: RawRules) -> Result<CompiledRules, RulesError> {
    let tile_type_ids = assign_ids(&raw.tiles);
    let unit_type_ids = assign_ids(&raw.units);
    let equipment_ids = assign_ids(&raw.equipment);
    let goods_ids = assign_ids(&raw.goods);
    let building_ids = assign_ids(&raw.buildings);
    let settlement_type_ids = assign_ids(&raw.settlements);
    let father_ids = assign_ids(&raw.fathers);

    let ids = IdTables {
        unit_types: unit_type_ids.clone(),
        equipment: equipment_ids.clone(),
    };

    let tile_types = raw
        .tiles
        .into_values()
        .enumerate()
        .map(|(i, t)| t.compile(TileTypeId::new(i as u16)))
        .collect();
    let unit_types = raw
        .units
        .into_values()
        .enumerate()
        .map(|(i, u)| u.compile(UnitTypeId::new(i as u16), &ids))
        .collect::<Result<Vec<_>, _>>()?;
    let equipment = raw
        .equipment
        .into_values()
        .enumerate()
        .map(|(i, e)| e.compile(EquipmentId::new(i as u16), &ids))
        .collect::<Result<Vec<_>, _>>()?;
    let goods = raw
        .goods
        .into_values()
        .enumerate()
        .map(|(i, g)| GoodsType {
            id: GoodsTypeId::new(i as u16),
            name: g.name,
        })
        .collect();
    let buildings = raw
        .buildings
        .into_values()
        .enumerate()
        .map(|(i, b)| b.compile(BuildingId::new(i as u16)))
        .collect();
    let settlement_types = raw
        .settlements
        .into_values()
        .enumerate()
        .map(|(i, s)| s.compile(SettlementTypeId::new(i as u16)))
        .collect();
    let fathers = raw
        .fathers
        .into_values()
        .enumerate()
        .map(|(i, f)| f.compile(FatherId::new(i as u16), &ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledRules {
        tile_types,
        unit_types,
        equipment,
        goods,
        buildings,
        settlement_types,
        fathers,
        combat: raw.combat,
        tile_type_ids,
        unit_type_ids,
        equipment_ids,
        goods_ids,
        building_ids,
        settlement_type_ids,
        father_ids,
    })
}
