//! Offence and defence modifier assembly.
//!
//! Both functions return the modifiers in the order they were collected; the order is
//! observable by callers that display a combat breakdown.

use freecol_protocol::{UnitId, UnitLocation, UnitState};

use super::{expect_unit, CombatTarget};
use crate::ability::Ability;
use crate::game::GameState;
use crate::modifier::{apply_modifiers, Modifier, ModifierSource, ModifierTarget};
use crate::rules::CompiledRules;
use crate::settlement::SettlementKind;
use crate::unit::Unit;

/// Innate, equipment and founding father modifiers for one side, in that order.
fn unit_modifiers(
    rules: &CompiledRules,
    state: &GameState,
    unit: &Unit,
    target: ModifierTarget,
    out: &mut Vec<Modifier>,
) {
    let owner = state.player(unit.owner);
    let abilities = match owner {
        Some(owner) => unit.abilities(rules, owner),
        None => unit.kind(rules).abilities.clone(),
    };
    let subject = unit.scope_subject(rules, &abilities);
    let wanted =
        |m: &&Modifier| m.target == target && m.is_active(state.turn) && m.applies_to(&subject);

    out.extend(unit.kind(rules).modifiers.iter().filter(wanted).cloned());
    for equipment in &unit.equipment {
        out.extend(rules.equipment(*equipment).modifiers.iter().filter(wanted).cloned());
    }
    if let Some(owner) = owner {
        out.extend(owner.father_modifiers(rules).filter(wanted).cloned());
    }
}

fn cargo_penalty(rules: &CompiledRules, unit: &Unit, target: ModifierTarget) -> Option<Modifier> {
    let step = rules.combat.cargo_penalty_step.max(1);
    let steps = unit.goods_count().div_ceil(step);
    (steps > 0).then(|| {
        Modifier::percentage(
            target,
            ModifierSource::CargoPenalty,
            rules.combat.cargo_penalty * steps as f32,
        )
    })
}

fn standing_in_settlement(state: &GameState, unit: &Unit, id: UnitId) -> bool {
    matches!(unit.location, UnitLocation::Settlement { .. })
        || state
            .unit_position(id)
            .and_then(|pos| state.tile(pos))
            .is_some_and(|t| t.settlement.is_some())
}

pub fn offensive_modifiers(
    rules: &CompiledRules,
    state: &GameState,
    attacker_id: UnitId,
    target: CombatTarget,
) -> Vec<Modifier> {
    let attacker = expect_unit(state, attacker_id);
    let kind = attacker.kind(rules);
    let constants = &rules.combat;
    let naval = kind.naval;
    let percentage = |source, value| Modifier::percentage(ModifierTarget::Offence, source, value);

    let mut mods = vec![Modifier::additive(
        ModifierTarget::Offence,
        ModifierSource::BaseOffence,
        kind.offence as f32,
    )];

    let mut own = Vec::new();
    unit_modifiers(rules, state, attacker, ModifierTarget::Offence, &mut own);
    let (fathers, innate): (Vec<_>, Vec<_>) = own
        .into_iter()
        .partition(|m| matches!(m.source, ModifierSource::Father(_)));
    mods.extend(innate);

    if !naval {
        let allowance = attacker.initial_moves(rules);
        let remaining_thirds = attacker.moves_left * 3;
        if remaining_thirds <= allowance {
            mods.push(percentage(
                ModifierSource::BigMovementPenalty,
                constants.big_movement_penalty,
            ));
        } else if remaining_thirds <= allowance * 2 {
            mods.push(percentage(
                ModifierSource::SmallMovementPenalty,
                constants.small_movement_penalty,
            ));
        }
        mods.push(percentage(ModifierSource::AttackBonus, constants.attack_bonus));
        if matches!(attacker.location, UnitLocation::Carrier { .. }) {
            mods.push(percentage(
                ModifierSource::AmphibiousAttack,
                constants.amphibious_attack,
            ));
        }
        let bombard = kind.abilities.has(Ability::Bombard);
        let field_battle = matches!(target, CombatTarget::Unit(_));
        if bombard && field_battle && !standing_in_settlement(state, attacker, attacker_id) {
            mods.push(percentage(
                ModifierSource::ArtilleryInTheOpen,
                constants.artillery_in_the_open,
            ));
        }
    } else if let Some(penalty) = cargo_penalty(rules, attacker, ModifierTarget::Offence) {
        mods.push(penalty);
    }

    mods.extend(fathers);
    mods
}

pub fn defensive_modifiers(
    rules: &CompiledRules,
    state: &GameState,
    attacker_id: UnitId,
    defender_id: UnitId,
) -> Vec<Modifier> {
    let attacker = expect_unit(state, attacker_id);
    let defender = expect_unit(state, defender_id);
    let kind = defender.kind(rules);
    let constants = &rules.combat;
    let percentage = |source, value| Modifier::percentage(ModifierTarget::Defence, source, value);

    let mut mods = vec![Modifier::additive(
        ModifierTarget::Defence,
        ModifierSource::BaseDefence,
        kind.defence as f32,
    )];
    unit_modifiers(rules, state, defender, ModifierTarget::Defence, &mut mods);

    if kind.naval {
        if let Some(penalty) = cargo_penalty(rules, defender, ModifierTarget::Defence) {
            mods.push(penalty);
        }
        return mods;
    }

    let Some(position) = state.unit_position(defender_id) else {
        return mods;
    };
    let Some(tile) = state.tile(position) else {
        return mods;
    };
    let fortified = defender.state == UnitState::Fortified;
    let bombard = kind.abilities.has(Ability::Bombard);

    match tile.settlement.and_then(|id| state.settlement(id)) {
        Some(settlement) => {
            match &settlement.kind {
                SettlementKind::Colony { .. } => {
                    if let Some((building, bonus)) = settlement.building_defence(rules) {
                        mods.push(percentage(ModifierSource::Building(building), bonus as f32));
                    }
                    // Without a stockade everyone inside counts as fortified.
                    if !settlement.blocks_fortify(rules) {
                        mods.push(percentage(ModifierSource::Fortified, constants.fortified_bonus));
                    }
                }
                SettlementKind::Indian(indian) => {
                    let bonus = rules.settlement_type(indian.settlement_type).defence_bonus;
                    if bonus != 0 {
                        mods.push(percentage(
                            ModifierSource::NativeSettlement(indian.settlement_type),
                            bonus as f32,
                        ));
                    }
                    if fortified {
                        mods.push(percentage(ModifierSource::Fortified, constants.fortified_bonus));
                    }
                }
            }
            let raid = state.player(attacker.owner).is_some_and(|p| p.is_native());
            if bombard && raid {
                mods.push(percentage(
                    ModifierSource::ArtilleryAgainstRaid,
                    constants.artillery_against_raid,
                ));
            }
        }
        None => {
            let terrain = tile.kind(rules);
            if terrain.defence_bonus != 0 {
                mods.push(percentage(
                    ModifierSource::Terrain(terrain.id),
                    terrain.defence_bonus as f32,
                ));
            }
            if fortified {
                mods.push(percentage(ModifierSource::Fortified, constants.fortified_bonus));
            }
            if terrain.ambush_terrain && terrain.defence_bonus != 0 {
                let attacker_abilities = state
                    .player(attacker.owner)
                    .map(|p| attacker.abilities(rules, p))
                    .unwrap_or_default();
                let defender_abilities = state
                    .player(defender.owner)
                    .map(|p| defender.abilities(rules, p))
                    .unwrap_or_default();
                let ambush = attacker_abilities.has(Ability::AmbushBonus)
                    || defender_abilities.has(Ability::AmbushPenalty);
                if ambush {
                    let bonus = terrain.defence_bonus as f32;
                    if defender_abilities.has(Ability::AmbushBonus) {
                        mods.push(percentage(ModifierSource::AmbushPenalty, bonus));
                    } else {
                        mods.push(percentage(ModifierSource::AmbushBonus, -bonus));
                    }
                }
            }
            if bombard {
                mods.push(percentage(
                    ModifierSource::ArtilleryInTheOpen,
                    constants.artillery_in_the_open,
                ));
            }
        }
    }
    mods
}

pub fn offence_power(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    target: CombatTarget,
) -> f32 {
    apply_modifiers(0.0, &offensive_modifiers(rules, state, attacker, target)).max(0.0)
}

pub fn defence_power(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    defender: UnitId,
) -> f32 {
    apply_modifiers(0.0, &defensive_modifiers(rules, state, attacker, defender)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::World;
    use freecol_protocol::{GoodsAmount, Position};

    fn sources(mods: &[Modifier]) -> Vec<ModifierSource> {
        mods.iter().map(|m| m.source).collect()
    }

    #[test]
    fn dragoon_offence_is_assembled_in_order() {
        let mut w = World::new();
        let dragoon = w.unit("free_colonist", w.dutch, Position::new(5, 5), &["muskets", "horses"]);
        let defender = w.unit("free_colonist", w.english, Position::new(6, 5), &[]);
        let muskets = w.rules.equipment_id("muskets").expect("muskets");
        let horses = w.rules.equipment_id("horses").expect("horses");

        let mods = offensive_modifiers(&w.rules, &w.state, dragoon, CombatTarget::Unit(defender));
        assert_eq!(
            sources(&mods),
            vec![
                ModifierSource::BaseOffence,
                ModifierSource::Equipment(muskets),
                ModifierSource::Equipment(horses),
                ModifierSource::AttackBonus,
            ]
        );
        assert!((apply_modifiers(0.0, &mods) - 4.5).abs() < 1e-4);
    }

    #[test]
    fn tired_attackers_take_movement_penalties() {
        let mut w = World::new();
        let dragoon = w.unit("free_colonist", w.dutch, Position::new(5, 5), &["muskets", "horses"]);
        let defender = w.unit("free_colonist", w.english, Position::new(6, 5), &[]);
        let target = CombatTarget::Unit(defender);

        w.state.unit_mut(dragoon).expect("dragoon").moves_left = 2;
        let mods = offensive_modifiers(&w.rules, &w.state, dragoon, target);
        assert!(sources(&mods).contains(&ModifierSource::SmallMovementPenalty));

        w.state.unit_mut(dragoon).expect("dragoon").moves_left = 1;
        let mods = offensive_modifiers(&w.rules, &w.state, dragoon, target);
        assert!(sources(&mods).contains(&ModifierSource::BigMovementPenalty));
        assert!(!sources(&mods).contains(&ModifierSource::SmallMovementPenalty));
    }

    #[test]
    fn ships_attack_without_movement_penalties() {
        let mut w = World::new();
        w.set_tile(Position::new(5, 5), "ocean");
        w.set_tile(Position::new(6, 5), "ocean");
        let privateer = w.unit("privateer", w.dutch, Position::new(5, 5), &[]);
        let prize = w.unit("merchantman", w.english, Position::new(6, 5), &[]);
        w.state.unit_mut(privateer).expect("privateer").moves_left = 1;

        let mods = offensive_modifiers(&w.rules, &w.state, privateer, CombatTarget::Unit(prize));
        assert!(!sources(&mods).contains(&ModifierSource::BigMovementPenalty));
        assert!(!sources(&mods).contains(&ModifierSource::SmallMovementPenalty));
    }

    #[test]
    fn fortified_colonist_on_hills() {
        let mut w = World::new();
        w.set_tile(Position::new(6, 5), "hills");
        let dragoon = w.unit("free_colonist", w.dutch, Position::new(5, 5), &["muskets", "horses"]);
        let colonist = w.unit("free_colonist", w.english, Position::new(6, 5), &[]);
        w.state.unit_mut(colonist).expect("colonist").state = UnitState::Fortified;
        let hills = w.rules.tile_type_id("hills").expect("hills");

        let mods = defensive_modifiers(&w.rules, &w.state, dragoon, colonist);
        assert_eq!(
            sources(&mods),
            vec![
                ModifierSource::BaseDefence,
                ModifierSource::Terrain(hills),
                ModifierSource::Fortified,
            ]
        );
        assert!((defence_power(&w.rules, &w.state, dragoon, colonist) - 2.5).abs() < 1e-4);
    }

    #[test]
    fn braves_ambush_in_the_woods() {
        let mut w = World::new();
        w.set_tile(Position::new(6, 5), "mixed_forest");
        let brave = w.unit("brave", w.arawak, Position::new(5, 5), &[]);
        let soldier = w.unit("free_colonist", w.dutch, Position::new(6, 5), &["muskets"]);
        let ranger = w.unit("continental_army", w.dutch, Position::new(6, 5), &["muskets"]);

        let mods = defensive_modifiers(&w.rules, &w.state, brave, soldier);
        assert!(sources(&mods).contains(&ModifierSource::AmbushBonus));
        // Terrain and ambush cancel out.
        assert!((apply_modifiers(0.0, &mods) - 2.0).abs() < 1e-4);

        let mods = defensive_modifiers(&w.rules, &w.state, brave, ranger);
        assert!(sources(&mods).contains(&ModifierSource::AmbushPenalty));
    }

    #[test]
    fn stockade_replaces_the_free_fortification() {
        let mut w = World::new();
        let soldier = w.unit("free_colonist", w.english, Position::new(5, 5), &["muskets"]);
        w.colony(w.dutch, Position::new(6, 5), &[]);
        w.colony(w.dutch, Position::new(6, 7), &["stockade"]);
        let a = w.unit("free_colonist", w.dutch, Position::new(6, 5), &["muskets"]);
        let b = w.unit("free_colonist", w.dutch, Position::new(6, 7), &["muskets"]);
        let stockade = w.rules.building_id("stockade").expect("stockade");

        let mods = defensive_modifiers(&w.rules, &w.state, soldier, a);
        assert!(sources(&mods).contains(&ModifierSource::Fortified));

        let mods = defensive_modifiers(&w.rules, &w.state, soldier, b);
        assert!(sources(&mods).contains(&ModifierSource::Building(stockade)));
        assert!(!sources(&mods).contains(&ModifierSource::Fortified));
    }

    #[test]
    fn laden_ships_fight_worse_and_drake_helps_privateers() {
        let mut w = World::new();
        w.set_tile(Position::new(5, 5), "ocean");
        w.set_tile(Position::new(6, 5), "ocean");
        let privateer = w.unit("privateer", w.dutch, Position::new(5, 5), &[]);
        let merchant = w.unit("merchantman", w.english, Position::new(6, 5), &[]);
        let furs = w.rules.goods_id("furs").expect("furs");
        w.state.unit_mut(merchant).expect("ship").goods = vec![GoodsAmount {
            goods: furs,
            amount: 120,
        }];

        let mods = defensive_modifiers(&w.rules, &w.state, privateer, merchant);
        let cargo = mods
            .iter()
            .find(|m| m.source == ModifierSource::CargoPenalty)
            .expect("cargo penalty");
        assert!((cargo.value - -37.5).abs() < 1e-4);

        let drake = w.rules.father_id("francis_drake").expect("drake");
        let target = CombatTarget::Unit(merchant);
        let before = offence_power(&w.rules, &w.state, privateer, target);
        w.state.player_mut(w.dutch).expect("dutch").fathers.push(drake);
        let mods = offensive_modifiers(&w.rules, &w.state, privateer, target);
        assert_eq!(mods.last().map(|m| m.source), Some(ModifierSource::Father(drake)));
        assert!(offence_power(&w.rules, &w.state, privateer, target) > before);
    }

    #[test]
    fn artillery_suffers_in_the_open() {
        let mut w = World::new();
        let brave = w.unit("brave", w.arawak, Position::new(5, 5), &[]);
        let artillery = w.unit("artillery", w.dutch, Position::new(6, 5), &[]);
        let mods = defensive_modifiers(&w.rules, &w.state, brave, artillery);
        assert!(sources(&mods).contains(&ModifierSource::ArtilleryInTheOpen));

        w.colony(w.dutch, Position::new(6, 6), &["stockade"]);
        let guard = w.unit("artillery", w.dutch, Position::new(6, 6), &[]);
        let mods = defensive_modifiers(&w.rules, &w.state, brave, guard);
        assert!(sources(&mods).contains(&ModifierSource::ArtilleryAgainstRaid));
        assert!(!sources(&mods).contains(&ModifierSource::ArtilleryInTheOpen));
    }
}
