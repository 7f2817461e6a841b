//! Numeric combat effects and the order they are applied in.

use freecol_protocol::{
    BuildingId, EquipmentId, FatherId, SettlementTypeId, TileTypeId, UnitTypeId,
};
use serde::Deserialize;

use crate::ability::{Ability, AbilitySet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTarget {
    Offence,
    Defence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Additive,
    /// Whole percent; all percentages in a set are summed and applied once.
    Percentage,
    Multiplicative,
}

/// Where a modifier came from. Used for display and for asserting assembly order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierSource {
    BaseOffence,
    BaseDefence,
    UnitType(UnitTypeId),
    Equipment(EquipmentId),
    Father(FatherId),
    BigMovementPenalty,
    SmallMovementPenalty,
    AttackBonus,
    AmphibiousAttack,
    ArtilleryInTheOpen,
    ArtilleryAgainstRaid,
    CargoPenalty,
    Terrain(TileTypeId),
    Fortified,
    AmbushBonus,
    AmbushPenalty,
    Building(BuildingId),
    NativeSettlement(SettlementTypeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    UnitType(UnitTypeId),
    Ability(Ability),
    Naval(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub negated: bool,
}

/// The unit a scoped modifier is tested against.
#[derive(Clone, Copy, Debug)]
pub struct ScopeSubject<'a> {
    pub unit_type: UnitTypeId,
    pub naval: bool,
    pub abilities: &'a AbilitySet,
}

impl Scope {
    pub fn matches(&self, subject: &ScopeSubject<'_>) -> bool {
        let hit = match self.kind {
            ScopeKind::UnitType(id) => subject.unit_type == id,
            ScopeKind::Ability(ability) => subject.abilities.has(ability),
            ScopeKind::Naval(naval) => subject.naval == naval,
        };
        hit != self.negated
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    pub target: ModifierTarget,
    pub source: ModifierSource,
    pub kind: ModifierKind,
    pub value: f32,
    pub scopes: Vec<Scope>,
    pub first_turn: Option<u32>,
    pub last_turn: Option<u32>,
}

impl Modifier {
    pub fn new(target: ModifierTarget, source: ModifierSource, kind: ModifierKind, value: f32) -> Self {
        Self {
            target,
            source,
            kind,
            value,
            scopes: Vec::new(),
            first_turn: None,
            last_turn: None,
        }
    }

    pub fn additive(target: ModifierTarget, source: ModifierSource, value: f32) -> Self {
        Self::new(target, source, ModifierKind::Additive, value)
    }

    pub fn percentage(target: ModifierTarget, source: ModifierSource, value: f32) -> Self {
        Self::new(target, source, ModifierKind::Percentage, value)
    }

    pub fn multiplicative(target: ModifierTarget, source: ModifierSource, value: f32) -> Self {
        Self::new(target, source, ModifierKind::Multiplicative, value)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn with_turns(mut self, first_turn: Option<u32>, last_turn: Option<u32>) -> Self {
        self.first_turn = first_turn;
        self.last_turn = last_turn;
        self
    }

    pub fn is_active(&self, turn: u32) -> bool {
        self.first_turn.map_or(true, |first| turn >= first)
            && self.last_turn.map_or(true, |last| turn <= last)
    }

    /// Unscoped modifiers apply to everything; otherwise any matching scope suffices.
    pub fn applies_to(&self, subject: &ScopeSubject<'_>) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| s.matches(subject))
    }
}

/// Applies a modifier set to `base`.
///
/// Additive values are summed onto the base first, then every percentage is summed and
/// applied once, then multiplicative values are applied by product.
pub fn apply_modifiers(base: f32, modifiers: &[Modifier]) -> f32 {
    let mut additive = 0.0_f32;
    let mut percentage = 0.0_f32;
    let mut product = 1.0_f32;
    for modifier in modifiers {
        match modifier.kind {
            ModifierKind::Additive => additive += modifier.value,
            ModifierKind::Percentage => percentage += modifier.value,
            ModifierKind::Multiplicative => product *= modifier.value,
        }
    }

    let mut result = base + additive;
    if percentage != 0.0 {
        result += result * percentage / 100.0;
    }
    result * product
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pct(value: f32) -> Modifier {
        Modifier::percentage(ModifierTarget::Offence, ModifierSource::AttackBonus, value)
    }

    fn add(value: f32) -> Modifier {
        Modifier::additive(ModifierTarget::Offence, ModifierSource::BaseOffence, value)
    }

    #[test]
    fn percentages_are_grouped_before_applying() {
        let result = apply_modifiers(4.0, &[pct(25.0), pct(25.0)]);
        assert_eq!(result, 6.0);
    }

    #[test]
    fn additive_runs_before_percentage_and_product_last() {
        let mods = vec![
            Modifier::multiplicative(ModifierTarget::Offence, ModifierSource::AttackBonus, 2.0),
            pct(50.0),
            add(2.0),
        ];
        // (0 + 2) * 1.5 * 2
        assert_eq!(apply_modifiers(0.0, &mods), 6.0);
    }

    #[test]
    fn turn_window_is_inclusive() {
        let m = add(1.0).with_turns(Some(3), Some(5));
        assert!(!m.is_active(2));
        assert!(m.is_active(3));
        assert!(m.is_active(5));
        assert!(!m.is_active(6));
    }

    #[test]
    fn negated_scope_excludes_matching_units() {
        let abilities: AbilitySet = [Ability::Armed].into_iter().collect();
        let subject = ScopeSubject {
            unit_type: UnitTypeId::new(1),
            naval: false,
            abilities: &abilities,
        };
        let armed_only = add(1.0).with_scope(Scope {
            kind: ScopeKind::Ability(Ability::Armed),
            negated: false,
        });
        let unarmed_only = add(1.0).with_scope(Scope {
            kind: ScopeKind::Ability(Ability::Armed),
            negated: true,
        });
        assert!(armed_only.applies_to(&subject));
        assert!(!unarmed_only.applies_to(&subject));
    }

    proptest! {
        #[test]
        fn reordering_within_groups_does_not_change_result(
            adds in proptest::collection::vec(-5i32..5, 0..4),
            pcts in proptest::collection::vec(-50i32..100, 0..4),
        ) {
            let mut forward: Vec<Modifier> = adds.iter().map(|v| add(*v as f32)).collect();
            forward.extend(pcts.iter().map(|v| pct(*v as f32)));
            let mut backward = forward.clone();
            backward.reverse();
            prop_assert_eq!(apply_modifiers(3.0, &forward), apply_modifiers(3.0, &backward));
        }
    }
}
