use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Boolean capabilities granted by unit types, equipment and founding fathers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Armed,
    Mounted,
    CanBeCaptured,
    CaptureEquipment,
    CaptureGoods,
    Piracy,
    AmbushBonus,
    AmbushPenalty,
    AmphibiousAssault,
    Bombard,
    EstablishMission,
    TradeWithForeignColonies,
    AutomaticPromotion,
    PillageUnprotectedColony,
    PlunderNatives,
    MultipleAttacks,
    CarryGoods,
    CarryUnits,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbilitySet(BTreeSet<Ability>);

impl AbilitySet {
    pub fn has(&self, ability: Ability) -> bool {
        self.0.contains(&ability)
    }

    pub fn insert(&mut self, ability: Ability) {
        self.0.insert(ability);
    }

    pub fn extend_from(&mut self, other: &AbilitySet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Ability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Ability> for AbilitySet {
    fn from_iter<I: IntoIterator<Item = Ability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
