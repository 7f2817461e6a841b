use freecol_protocol::{
    EquipmentId, GoodsAmount, GoodsTypeId, PlayerId, Position, UnitId, UnitLocation, UnitState,
    UnitTypeId,
};
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilitySet};
use crate::modifier::{ModifierKind, ModifierTarget, ScopeSubject};
use crate::player::Player;
use crate::rules::{CompiledRules, UnitType};

/// Unit types at or below this defence only fight when equipped.
pub const DEFAULT_DEFENCE: u32 = 1;

/// One hold of cargo carries up to this many goods.
pub const GOODS_PER_SLOT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_type: UnitTypeId,
    pub owner: PlayerId,
    pub location: UnitLocation,
    pub moves_left: u32,
    /// Ordered; combat strips items by loss priority, not by position.
    pub equipment: Vec<EquipmentId>,
    pub goods: Vec<GoodsAmount>,
    /// Passengers, sorted by id.
    pub units: Vec<UnitId>,
    pub state: UnitState,
    pub experience: u32,
    /// Non-zero while a damaged ship is being repaired.
    pub repair_turns: u32,
    pub destination: Option<Position>,
    pub trade_route: Option<u32>,
}

impl Unit {
    pub fn new(
        rules: &CompiledRules,
        unit_type: UnitTypeId,
        owner: PlayerId,
        location: UnitLocation,
        equipment: Vec<EquipmentId>,
    ) -> Self {
        let mut unit = Self {
            unit_type,
            owner,
            location,
            moves_left: 0,
            equipment,
            goods: Vec::new(),
            units: Vec::new(),
            state: UnitState::Active,
            experience: 0,
            repair_turns: 0,
            destination: None,
            trade_route: None,
        };
        unit.moves_left = unit.initial_moves(rules);
        unit
    }

    pub fn kind<'r>(&self, rules: &'r CompiledRules) -> &'r UnitType {
        rules.unit_type(self.unit_type)
    }

    /// Full movement allowance at the start of a turn.
    pub fn initial_moves(&self, rules: &CompiledRules) -> u32 {
        let bonus: u32 = self
            .equipment
            .iter()
            .map(|e| rules.equipment(*e).movement_bonus)
            .sum();
        self.kind(rules).movement + bonus
    }

    pub fn is_naval(&self, rules: &CompiledRules) -> bool {
        self.kind(rules).naval
    }

    pub fn is_person(&self, rules: &CompiledRules) -> bool {
        self.kind(rules).person
    }

    pub fn is_damaged(&self) -> bool {
        self.repair_turns > 0
    }

    pub fn has_equipment_ability(&self, rules: &CompiledRules, ability: Ability) -> bool {
        self.equipment
            .iter()
            .any(|e| rules.equipment(*e).abilities.has(ability))
    }

    pub fn is_armed(&self, rules: &CompiledRules) -> bool {
        self.has_equipment_ability(rules, Ability::Armed)
    }

    pub fn is_mounted(&self, rules: &CompiledRules) -> bool {
        self.has_equipment_ability(rules, Ability::Mounted)
    }

    /// Mounted, unarmed person.
    pub fn is_scout(&self, rules: &CompiledRules) -> bool {
        self.is_person(rules) && self.is_mounted(rules) && !self.is_armed(rules)
    }

    pub fn is_missionary(&self, rules: &CompiledRules) -> bool {
        self.is_person(rules)
            && (self.kind(rules).abilities.has(Ability::EstablishMission)
                || self.has_equipment_ability(rules, Ability::EstablishMission))
            && !self.is_armed(rules)
    }

    /// Unequipped person whose type may be taught by natives.
    pub fn can_learn_from_natives(&self, rules: &CompiledRules) -> bool {
        self.is_person(rules) && self.equipment.is_empty() && self.kind(rules).can_learn_from_natives
    }

    pub fn is_offensive(&self, rules: &CompiledRules) -> bool {
        self.kind(rules).offence > 0
            || self.equipment.iter().any(|e| {
                rules.equipment(*e).modifiers.iter().any(|m| {
                    m.target == ModifierTarget::Offence
                        && m.kind == ModifierKind::Additive
                        && m.value > 0.0
                })
            })
    }

    /// Able to put up a real fight when defending.
    pub fn is_defensive(&self, rules: &CompiledRules) -> bool {
        !self.is_naval(rules)
            && (self.kind(rules).defence > DEFAULT_DEFENCE
                || self.is_armed(rules)
                || self.is_mounted(rules))
    }

    /// Type, equipment and owner abilities combined.
    pub fn abilities(&self, rules: &CompiledRules, owner: &Player) -> AbilitySet {
        let mut set = self.kind(rules).abilities.clone();
        for e in &self.equipment {
            set.extend_from(&rules.equipment(*e).abilities);
        }
        set.extend_from(&owner.abilities(rules));
        set
    }

    pub fn scope_subject<'a>(&self, rules: &CompiledRules, abilities: &'a AbilitySet) -> ScopeSubject<'a> {
        ScopeSubject {
            unit_type: self.unit_type,
            naval: self.is_naval(rules),
            abilities,
        }
    }

    pub fn goods_count(&self) -> u32 {
        self.goods.iter().map(|g| g.amount).sum()
    }

    pub fn has_goods(&self) -> bool {
        self.goods_count() > 0
    }
}

/// Holds occupied by a goods list.
pub fn cargo_slots(goods: &[GoodsAmount]) -> u32 {
    goods
        .iter()
        .map(|g| g.amount.div_ceil(GOODS_PER_SLOT))
        .sum()
}

pub fn goods_amount(goods: &[GoodsAmount], goods_type: GoodsTypeId) -> u32 {
    goods
        .iter()
        .find(|g| g.goods == goods_type)
        .map_or(0, |g| g.amount)
}

pub fn add_goods(goods: &mut Vec<GoodsAmount>, goods_type: GoodsTypeId, amount: u32) {
    if amount == 0 {
        return;
    }
    match goods.iter_mut().find(|g| g.goods == goods_type) {
        Some(entry) => entry.amount += amount,
        None => {
            goods.push(GoodsAmount {
                goods: goods_type,
                amount,
            });
            goods.sort_by_key(|g| g.goods);
        }
    }
}

/// Removes up to `amount`; returns how much was actually removed.
pub fn remove_goods(goods: &mut Vec<GoodsAmount>, goods_type: GoodsTypeId, amount: u32) -> u32 {
    let Some(entry) = goods.iter_mut().find(|g| g.goods == goods_type) else {
        return 0;
    };
    let removed = entry.amount.min(amount);
    entry.amount -= removed;
    goods.retain(|g| g.amount > 0);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_rules, RulesSource};

    #[test]
    fn horses_extend_movement_and_make_a_scout() {
        let rules = load_rules(RulesSource::Embedded).expect("rules load");
        let colonist = rules.unit_type_id("free_colonist").expect("colonist");
        let horses = rules.equipment_id("horses").expect("horses");
        let muskets = rules.equipment_id("muskets").expect("muskets");
        let at = UnitLocation::Tile {
            position: Position::new(0, 0),
        };

        let scout = Unit::new(&rules, colonist, PlayerId(0), at, vec![horses]);
        assert_eq!(scout.moves_left, 4);
        assert!(scout.is_scout(&rules));
        assert!(scout.is_offensive(&rules));

        let dragoon = Unit::new(&rules, colonist, PlayerId(0), at, vec![muskets, horses]);
        assert!(!dragoon.is_scout(&rules));
        assert!(dragoon.is_defensive(&rules));

        let plain = Unit::new(&rules, colonist, PlayerId(0), at, Vec::new());
        assert!(!plain.is_offensive(&rules));
        assert!(!plain.is_defensive(&rules));
        assert!(plain.can_learn_from_natives(&rules));
    }

    #[test]
    fn goods_lists_merge_and_count_slots() {
        let mut goods = Vec::new();
        let furs = GoodsTypeId::new(4);
        add_goods(&mut goods, furs, 60);
        add_goods(&mut goods, furs, 60);
        assert_eq!(goods_amount(&goods, furs), 120);
        assert_eq!(cargo_slots(&goods), 2);
        assert_eq!(remove_goods(&mut goods, furs, 500), 120);
        assert!(goods.is_empty());
    }
}
