use std::collections::{BTreeMap, BTreeSet};

use freecol_protocol::{FatherId, PlayerId, SettlementId, Stance, UnitId};
use serde::{Deserialize, Serialize};

use crate::ability::AbilitySet;
use crate::modifier::Modifier;
use crate::rules::CompiledRules;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    European,
    Native,
    /// The crown's expeditionary force.
    Royal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub gold: i32,
    /// Missing entries mean no contact yet.
    pub stances: BTreeMap<PlayerId, Stance>,
    /// Native hostility toward other players.
    pub tension: BTreeMap<PlayerId, i32>,
    pub fathers: Vec<FatherId>,
    pub units: BTreeSet<UnitId>,
    pub settlements: BTreeSet<SettlementId>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, kind: PlayerKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            gold: 0,
            stances: BTreeMap::new(),
            tension: BTreeMap::new(),
            fathers: Vec::new(),
            units: BTreeSet::new(),
            settlements: BTreeSet::new(),
        }
    }

    pub fn is_european(&self) -> bool {
        self.kind == PlayerKind::European
    }

    pub fn is_native(&self) -> bool {
        self.kind == PlayerKind::Native
    }

    pub fn can_move_to_europe(&self) -> bool {
        self.kind == PlayerKind::European
    }

    pub fn stance(&self, other: PlayerId) -> Stance {
        self.stances.get(&other).copied().unwrap_or_default()
    }

    pub fn tension_toward(&self, other: PlayerId) -> i32 {
        self.tension.get(&other).copied().unwrap_or(0)
    }

    /// Abilities granted by founding fathers.
    pub fn abilities(&self, rules: &CompiledRules) -> AbilitySet {
        let mut set = AbilitySet::default();
        for father in &self.fathers {
            set.extend_from(&rules.father(*father).abilities);
        }
        set
    }

    pub fn father_modifiers<'r>(
        &'r self,
        rules: &'r CompiledRules,
    ) -> impl Iterator<Item = &'r Modifier> + 'r {
        self.fathers
            .iter()
            .flat_map(move |f| rules.father(*f).modifiers.iter())
    }
}
