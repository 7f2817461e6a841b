use serde::{Deserialize, Serialize};

/// Outcome of attempting to move a unit towards an adjacent tile.
///
/// The derived queries (`is_progress`, `is_attack`, `is_legal`) are answered from
/// [`MoveTypeInfo`] rows rather than by matching on the variant at every call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    Move,
    MoveHighSeas,
    ExploreLostCityRumour,
    AttackUnit,
    AttackSettlement,
    Embark,
    EnterIndianSettlementWithFreeColonist,
    EnterIndianSettlementWithScout,
    EnterIndianSettlementWithMissionary,
    EnterForeignColonyWithScout,
    EnterSettlementWithCarrierAndGoods,
    MoveNoMoves,
    MoveNoAccessLand,
    MoveNoAccessBeached,
    MoveNoAccessEmbark,
    MoveNoAccessFull,
    MoveNoAccessGoods,
    MoveNoAccessContact,
    MoveNoAccessMissionBan,
    MoveNoAccessOccupied,
    MoveNoAccessSettlement,
    MoveNoAccessSkill,
    MoveNoAccessTrade,
    MoveNoAccessWar,
    MoveNoAccessWater,
    MoveNoAttackCivilian,
    MoveNoAttackMarine,
    MoveNoEurope,
    MoveNoRepair,
    MoveNoTile,
    MoveIllegal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveTypeInfo {
    pub progress: bool,
    pub attack: bool,
    /// Present only for illegal outcomes.
    pub reason: Option<&'static str>,
}

const fn legal(progress: bool, attack: bool) -> MoveTypeInfo {
    MoveTypeInfo {
        progress,
        attack,
        reason: None,
    }
}

const fn illegal(reason: &'static str) -> MoveTypeInfo {
    MoveTypeInfo {
        progress: false,
        attack: false,
        reason: Some(reason),
    }
}

impl MoveType {
    pub const ALL: [MoveType; 31] = [
        MoveType::Move,
        MoveType::MoveHighSeas,
        MoveType::ExploreLostCityRumour,
        MoveType::AttackUnit,
        MoveType::AttackSettlement,
        MoveType::Embark,
        MoveType::EnterIndianSettlementWithFreeColonist,
        MoveType::EnterIndianSettlementWithScout,
        MoveType::EnterIndianSettlementWithMissionary,
        MoveType::EnterForeignColonyWithScout,
        MoveType::EnterSettlementWithCarrierAndGoods,
        MoveType::MoveNoMoves,
        MoveType::MoveNoAccessLand,
        MoveType::MoveNoAccessBeached,
        MoveType::MoveNoAccessEmbark,
        MoveType::MoveNoAccessFull,
        MoveType::MoveNoAccessGoods,
        MoveType::MoveNoAccessContact,
        MoveType::MoveNoAccessMissionBan,
        MoveType::MoveNoAccessOccupied,
        MoveType::MoveNoAccessSettlement,
        MoveType::MoveNoAccessSkill,
        MoveType::MoveNoAccessTrade,
        MoveType::MoveNoAccessWar,
        MoveType::MoveNoAccessWater,
        MoveType::MoveNoAttackCivilian,
        MoveType::MoveNoAttackMarine,
        MoveType::MoveNoEurope,
        MoveType::MoveNoRepair,
        MoveType::MoveNoTile,
        MoveType::MoveIllegal,
    ];

    pub const fn info(self) -> MoveTypeInfo {
        match self {
            MoveType::Move => legal(true, false),
            MoveType::MoveHighSeas => legal(true, false),
            MoveType::ExploreLostCityRumour => legal(true, false),
            MoveType::AttackUnit => legal(false, true),
            MoveType::AttackSettlement => legal(false, true),
            MoveType::Embark => legal(false, false),
            MoveType::EnterIndianSettlementWithFreeColonist => legal(false, false),
            MoveType::EnterIndianSettlementWithScout => legal(false, false),
            MoveType::EnterIndianSettlementWithMissionary => legal(false, false),
            MoveType::EnterForeignColonyWithScout => legal(false, false),
            MoveType::EnterSettlementWithCarrierAndGoods => legal(false, false),
            MoveType::MoveNoMoves => illegal("no moves left"),
            MoveType::MoveNoAccessLand => illegal("land unit cannot enter water"),
            MoveType::MoveNoAccessBeached => illegal("tile holds a beached foreign ship"),
            MoveType::MoveNoAccessEmbark => illegal("cannot board a foreign carrier"),
            MoveType::MoveNoAccessFull => illegal("carrier is full"),
            MoveType::MoveNoAccessGoods => illegal("no goods to trade"),
            MoveType::MoveNoAccessContact => illegal("no contact with the owner"),
            MoveType::MoveNoAccessMissionBan => illegal("missions are banned here"),
            MoveType::MoveNoAccessOccupied => illegal("tile is occupied by a foreign unit"),
            MoveType::MoveNoAccessSettlement => illegal("cannot enter this settlement"),
            MoveType::MoveNoAccessSkill => illegal("no skill can be learned here"),
            MoveType::MoveNoAccessTrade => illegal("trade with foreign colonies not allowed"),
            MoveType::MoveNoAccessWar => illegal("cannot trade while at war"),
            MoveType::MoveNoAccessWater => illegal("naval unit cannot enter land"),
            MoveType::MoveNoAttackCivilian => illegal("civilian units cannot attack"),
            MoveType::MoveNoAttackMarine => illegal("cannot attack across land and water"),
            MoveType::MoveNoEurope => illegal("cannot sail to Europe"),
            MoveType::MoveNoRepair => illegal("unit is under repair"),
            MoveType::MoveNoTile => illegal("unit is not on the map"),
            MoveType::MoveIllegal => illegal("illegal move"),
        }
    }

    /// The move consumes movement points and relocates the unit.
    pub const fn is_progress(self) -> bool {
        self.info().progress
    }

    pub const fn is_attack(self) -> bool {
        self.info().attack
    }

    pub const fn is_legal(self) -> bool {
        self.info().reason.is_none()
    }

    pub const fn reason(self) -> Option<&'static str> {
        self.info().reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_moves_are_exactly_the_relocating_ones() {
        let progress: Vec<MoveType> = MoveType::ALL
            .into_iter()
            .filter(|mt| mt.is_progress())
            .collect();
        assert_eq!(
            progress,
            vec![
                MoveType::Move,
                MoveType::MoveHighSeas,
                MoveType::ExploreLostCityRumour
            ]
        );
    }

    #[test]
    fn attacks_are_legal_and_not_progress() {
        for mt in MoveType::ALL {
            if mt.is_attack() {
                assert!(mt.is_legal());
                assert!(!mt.is_progress());
            }
        }
    }

    #[test]
    fn illegal_moves_carry_a_reason() {
        let illegal = MoveType::ALL.iter().filter(|mt| !mt.is_legal()).count();
        assert_eq!(illegal, 20);
        assert!(MoveType::MoveNoMoves.reason().is_some());
        assert!(MoveType::Embark.reason().is_none());
    }
}
