use freecol_protocol::{
    BuildingId, GoodsAmount, PlayerId, Position, SettlementTypeId, UnitId, UnitTypeId,
};
use serde::{Deserialize, Serialize};

use crate::rules::CompiledRules;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub name: String,
    pub owner: PlayerId,
    pub position: Position,
    /// Residents working inside, sorted by id.
    pub units: Vec<UnitId>,
    pub goods: Vec<GoodsAmount>,
    pub kind: SettlementKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementKind {
    Colony { buildings: Vec<BuildingId> },
    Indian(IndianSettlement),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndianSettlement {
    pub settlement_type: SettlementTypeId,
    pub learnable_skill: Option<UnitTypeId>,
    pub missionary: Option<UnitId>,
    /// Players whose scouts have already spoken to the chief.
    pub visitors: Vec<PlayerId>,
}

impl Settlement {
    pub fn is_colony(&self) -> bool {
        matches!(self.kind, SettlementKind::Colony { .. })
    }

    pub fn as_indian(&self) -> Option<&IndianSettlement> {
        match &self.kind {
            SettlementKind::Indian(indian) => Some(indian),
            SettlementKind::Colony { .. } => None,
        }
    }

    pub fn as_indian_mut(&mut self) -> Option<&mut IndianSettlement> {
        match &mut self.kind {
            SettlementKind::Indian(indian) => Some(indian),
            SettlementKind::Colony { .. } => None,
        }
    }

    pub fn buildings(&self) -> &[BuildingId] {
        match &self.kind {
            SettlementKind::Colony { buildings } => buildings,
            SettlementKind::Indian(_) => &[],
        }
    }

    pub fn population(&self) -> u32 {
        self.units.len() as u32
    }

    /// Strongest building defence bonus, in percent.
    pub fn building_defence(&self, rules: &CompiledRules) -> Option<(BuildingId, i32)> {
        self.buildings()
            .iter()
            .map(|b| (*b, rules.building(*b).defence_bonus))
            .filter(|(_, bonus)| *bonus > 0)
            .max_by_key(|(_, bonus)| *bonus)
    }

    /// Stockade-class buildings replace the fortification bonus.
    pub fn blocks_fortify(&self, rules: &CompiledRules) -> bool {
        self.buildings()
            .iter()
            .any(|b| rules.building(*b).blocks_fortify)
    }

    pub fn repairs_ships(&self, rules: &CompiledRules) -> bool {
        self.buildings()
            .iter()
            .any(|b| rules.building(*b).repairs_ships)
    }
}
