use serde::{Deserialize, Serialize};

use crate::{BuildingId, EquipmentId, GoodsTypeId, PlayerId, Position, SettlementId, UnitId, UnitTypeId};

/// Diplomatic relation between two players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    #[default]
    Uncontacted,
    Peace,
    CeaseFire,
    War,
    Alliance,
}

impl Stance {
    pub fn is_contacted(self) -> bool {
        self != Stance::Uncontacted
    }

    /// Friendly enough to share carriers and trade.
    pub fn is_friendly(self) -> bool {
        matches!(self, Stance::Peace | Stance::Alliance)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    #[default]
    Active,
    Fortifying,
    Fortified,
    Sentry,
    Skipped,
    Improving,
}

/// Where a unit currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitLocation {
    Tile { position: Position },
    Carrier { carrier: UnitId },
    /// Working inside a settlement (colony population, native residents, missionaries).
    Settlement { settlement: SettlementId },
    Europe,
    HighSeas,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoodsAmount {
    pub goods: GoodsTypeId,
    pub amount: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Win,
    GreatWin,
    Lose,
    GreatLose,
    /// Naval defender slipped away; nobody is hurt.
    Evade,
}

impl CombatOutcome {
    pub fn attacker_won(self) -> bool {
        matches!(self, CombatOutcome::Win | CombatOutcome::GreatWin)
    }

    pub fn is_great(self) -> bool {
        matches!(self, CombatOutcome::GreatWin | CombatOutcome::GreatLose)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PillageLoot {
    Building { building: BuildingId },
    Goods { goods: GoodsAmount },
    Gold { amount: u32 },
}

/// One consequence of a combat round. A resolution produces an ordered list of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CombatEffect {
    CaptureUnit {
        unit: UnitId,
        new_owner: PlayerId,
    },
    SlaughterUnit {
        unit: UnitId,
    },
    LoseEquipment {
        unit: UnitId,
        equipment: EquipmentId,
    },
    CaptureEquipment {
        unit: UnitId,
        equipment: EquipmentId,
    },
    DemoteUnit {
        unit: UnitId,
        to: UnitTypeId,
    },
    PromoteUnit {
        unit: UnitId,
        to: UnitTypeId,
    },
    DamageShip {
        unit: UnitId,
        repair_turns: u32,
        repair_at: Option<SettlementId>,
    },
    SinkShip {
        unit: UnitId,
    },
    LootShip {
        winner: UnitId,
        loser: UnitId,
        goods: Vec<GoodsAmount>,
    },
    EvadeAttack {
        unit: UnitId,
    },
    AttackerRepelled {
        unit: UnitId,
    },
    CaptureColony {
        settlement: SettlementId,
        new_owner: PlayerId,
    },
    DestroyColony {
        settlement: SettlementId,
    },
    PillageColony {
        settlement: SettlementId,
        loot: PillageLoot,
    },
    DestroySettlement {
        settlement: SettlementId,
        plunder: u32,
    },
}

/// What a scout learns from speaking to a native chief.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChiefResult {
    /// This player has already been received here.
    Nothing,
    Tales,
    Beads { gold: u32 },
}
