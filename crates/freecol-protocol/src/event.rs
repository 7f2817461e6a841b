use serde::{Deserialize, Serialize};

use crate::{
    BuildingId, ChiefResult, CombatEffect, CombatOutcome, EquipmentId, GoodsAmount, MoveType,
    PlayerId, Position, SettlementId, Stance, UnitId, UnitLocation, UnitState, UnitTypeId,
};

/// All sim→client events. State-change events carry the new value so a mirror can apply
/// them without re-running the rules; the remaining events only report what happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // Game flow
    TurnStarted {
        turn: u32,
        player: PlayerId,
    },

    // Unit changes
    UnitLocationChanged {
        unit: UnitId,
        location: UnitLocation,
    },
    UnitMovesChanged {
        unit: UnitId,
        moves_left: u32,
    },
    UnitTypeChanged {
        unit: UnitId,
        unit_type: UnitTypeId,
    },
    UnitEquipmentChanged {
        unit: UnitId,
        equipment: Vec<EquipmentId>,
    },
    UnitOwnerChanged {
        unit: UnitId,
        owner: PlayerId,
    },
    UnitStateChanged {
        unit: UnitId,
        state: UnitState,
    },
    UnitCargoChanged {
        unit: UnitId,
        goods: Vec<GoodsAmount>,
    },
    UnitRepairChanged {
        unit: UnitId,
        repair_turns: u32,
    },
    UnitExperienceChanged {
        unit: UnitId,
        experience: u32,
    },
    UnitRemoved {
        unit: UnitId,
    },

    // Settlement changes
    SettlementOwnerChanged {
        settlement: SettlementId,
        owner: PlayerId,
    },
    SettlementPopulationChanged {
        settlement: SettlementId,
        population: u32,
    },
    SettlementGoodsChanged {
        settlement: SettlementId,
        goods: Vec<GoodsAmount>,
    },
    SettlementBuildingsChanged {
        settlement: SettlementId,
        buildings: Vec<BuildingId>,
    },
    SettlementMissionaryChanged {
        settlement: SettlementId,
        missionary: Option<UnitId>,
    },
    SettlementSkillChanged {
        settlement: SettlementId,
        skill: Option<UnitTypeId>,
    },
    SettlementVisited {
        settlement: SettlementId,
        visitors: Vec<PlayerId>,
    },
    SettlementRemoved {
        settlement: SettlementId,
    },

    // Player changes
    StanceChanged {
        player: PlayerId,
        other: PlayerId,
        stance: Stance,
    },
    TensionChanged {
        player: PlayerId,
        toward: PlayerId,
        tension: i32,
    },
    GoldChanged {
        player: PlayerId,
        gold: i32,
    },

    // Map
    LostCityRumourExplored {
        unit: UnitId,
        position: Position,
    },

    // Facts without a state payload
    MoveRejected {
        unit: UnitId,
        move_type: MoveType,
    },
    CombatResolved {
        attacker: UnitId,
        defender: UnitId,
        outcome: CombatOutcome,
        offence: f32,
        defence: f32,
        effects: Vec<CombatEffect>,
    },
    SkillLearned {
        unit: UnitId,
        settlement: SettlementId,
        skill: UnitTypeId,
    },
    ScoutSpokeToChief {
        unit: UnitId,
        settlement: SettlementId,
        result: ChiefResult,
    },
    MissionEstablished {
        unit: UnitId,
        settlement: SettlementId,
    },
    ColonyScouted {
        unit: UnitId,
        settlement: SettlementId,
    },
    TradeSessionOpened {
        unit: UnitId,
        settlement: SettlementId,
    },
}
