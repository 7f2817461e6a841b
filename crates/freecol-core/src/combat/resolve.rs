use freecol_protocol::{
    CombatEffect, CombatOutcome, EquipmentId, GoodsAmount, PillageLoot, SettlementId, UnitId,
};
use tracing::debug;

use super::{defence_power, expect_unit, offence_power, settlement_defender, CombatTarget};
use crate::ability::{Ability, AbilitySet};
use crate::game::GameState;
use crate::rng::RandomSource;
use crate::rules::CompiledRules;
use crate::settlement::{Settlement, SettlementKind};
use crate::unit::Unit;

/// Everything decided about one attack. Applying `effects` is the caller's job.
#[derive(Clone, Debug, PartialEq)]
pub struct CombatResolution {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub target: CombatTarget,
    pub outcome: CombatOutcome,
    pub offence: f32,
    pub defence: f32,
    /// Probability of an attacker win.
    pub ratio: f32,
    pub draw: f32,
    pub effects: Vec<CombatEffect>,
}

/// Chance that the attacker wins.
pub fn combat_odds(offence: f32, defence: f32) -> f32 {
    let total = offence + defence;
    if total <= 0.0 {
        0.5
    } else {
        offence / total
    }
}

fn abilities_of(rules: &CompiledRules, state: &GameState, unit: &Unit) -> AbilitySet {
    state
        .player(unit.owner)
        .map(|p| unit.abilities(rules, p))
        .unwrap_or_else(|| unit.kind(rules).abilities.clone())
}

/// Draws once from `rng` for the result, and again only for plunder and pillage choices.
pub fn resolve_combat<R: RandomSource + ?Sized>(
    rules: &CompiledRules,
    state: &GameState,
    attacker: UnitId,
    target: CombatTarget,
    rng: &mut R,
) -> CombatResolution {
    let defender = match target {
        CombatTarget::Unit(id) => id,
        CombatTarget::Settlement(id) => settlement_defender(rules, state, attacker, id)
            .unwrap_or_else(|| panic!("settlement {id:?} has no defender")),
    };
    let a = expect_unit(state, attacker);
    let d = expect_unit(state, defender);
    assert_ne!(a.owner, d.owner, "a player cannot attack its own units");

    let offence = offence_power(rules, state, attacker, target);
    let defence = defence_power(rules, state, attacker, defender);
    let ratio = combat_odds(offence, defence);
    let draw = rng.next_unit();
    let great = rules.combat.great_result_fraction;
    let both_naval = a.is_naval(rules) && d.is_naval(rules);

    let outcome = if draw < ratio {
        if draw < great * ratio {
            CombatOutcome::GreatWin
        } else {
            CombatOutcome::Win
        }
    } else if draw >= ratio + (1.0 - ratio) * (1.0 - great) {
        CombatOutcome::GreatLose
    } else if both_naval {
        CombatOutcome::Evade
    } else {
        CombatOutcome::Lose
    };

    let mut judge = Adjudication {
        rules,
        state,
        rng,
        effects: Vec::new(),
    };
    let attacker_side = Side {
        id: attacker,
        unit: a,
    };
    let defender_side = Side {
        id: defender,
        unit: d,
    };
    match outcome {
        CombatOutcome::Win | CombatOutcome::GreatWin => {
            judge.attacker_wins(attacker_side, defender_side, target, outcome.is_great())
        }
        CombatOutcome::Lose | CombatOutcome::GreatLose => {
            judge.attacker_loses(attacker_side, defender_side, target, outcome.is_great())
        }
        CombatOutcome::Evade => judge
            .effects
            .push(CombatEffect::EvadeAttack { unit: defender }),
    }

    debug!(
        ?attacker,
        ?defender,
        offence,
        defence,
        ratio,
        draw,
        ?outcome,
        effects = judge.effects.len(),
        "combat resolved"
    );

    CombatResolution {
        attacker,
        defender,
        target,
        outcome,
        offence,
        defence,
        ratio,
        draw,
        effects: judge.effects,
    }
}

#[derive(Clone, Copy)]
struct Side<'a> {
    id: UnitId,
    unit: &'a Unit,
}

struct Adjudication<'a, R: ?Sized> {
    rules: &'a CompiledRules,
    state: &'a GameState,
    rng: &'a mut R,
    effects: Vec<CombatEffect>,
}

impl<R: RandomSource + ?Sized> Adjudication<'_, R> {
    fn attacker_wins(&mut self, winner: Side<'_>, loser: Side<'_>, target: CombatTarget, great: bool) {
        let rules = self.rules;
        match target {
            CombatTarget::Settlement(id) => {
                let Some(settlement) = self.state.settlement(id) else {
                    return;
                };
                match &settlement.kind {
                    SettlementKind::Colony { .. } => {
                        if loser.unit.is_defensive(rules) {
                            self.land_unit_loses(loser, winner);
                            self.promote(winner, great);
                        } else {
                            self.colony_falls(winner, loser, id, settlement);
                        }
                    }
                    SettlementKind::Indian(_) => {
                        if loser.unit.is_defensive(rules) && self.keeps_unit(loser.unit) {
                            self.land_unit_loses(loser, winner);
                        } else {
                            self.effects
                                .push(CombatEffect::SlaughterUnit { unit: loser.id });
                            if self.last_defender(settlement, loser.id) {
                                let plunder = self.plunder(winner.unit, settlement);
                                self.effects.push(CombatEffect::DestroySettlement {
                                    settlement: id,
                                    plunder,
                                });
                            }
                        }
                        self.promote(winner, great);
                    }
                }
            }
            CombatTarget::Unit(_) => {
                if loser.unit.is_naval(rules) {
                    self.loot(winner, loser);
                    self.ship_loses(loser, great, None);
                } else if !loser.unit.is_defensive(rules) {
                    self.unarmed_unit_loses(winner, loser);
                } else {
                    self.land_unit_loses(loser, winner);
                    self.promote(winner, great);
                }
            }
        }
    }

    fn attacker_loses(&mut self, loser: Side<'_>, winner: Side<'_>, target: CombatTarget, great: bool) {
        let rules = self.rules;
        if loser.unit.is_naval(rules) {
            self.loot(winner, loser);
            self.ship_loses(loser, false, None);
            return;
        }
        let automatic_defence = matches!(target, CombatTarget::Settlement(id)
            if self.state.settlement(id).is_some_and(Settlement::is_colony))
            && !winner.unit.is_defensive(rules);
        if automatic_defence {
            self.effects
                .push(CombatEffect::AttackerRepelled { unit: loser.id });
            return;
        }
        self.land_unit_loses(loser, winner);
        self.promote(winner, great);
    }

    /// Whether losing one equipment tier leaves the unit alive.
    fn keeps_unit(&self, unit: &Unit) -> bool {
        self.lost_equipment(unit).is_some() || unit.kind(self.rules).demotion.is_some()
    }

    /// Equipment with the highest loss priority goes first.
    fn lost_equipment(&self, unit: &Unit) -> Option<EquipmentId> {
        unit.equipment
            .iter()
            .copied()
            .filter_map(|e| self.rules.equipment(e).combat_loss_priority.map(|p| (e, p)))
            .max_by_key(|(_, priority)| *priority)
            .map(|(e, _)| e)
    }

    fn land_unit_loses(&mut self, loser: Side<'_>, winner: Side<'_>) {
        let rules = self.rules;
        if let Some(equipment) = self.lost_equipment(loser.unit) {
            self.effects.push(CombatEffect::LoseEquipment {
                unit: loser.id,
                equipment,
            });
            let can_capture = self.state.options.equipment_capture
                && !winner.unit.is_naval(rules)
                && abilities_of(rules, self.state, winner.unit).has(Ability::CaptureEquipment);
            if can_capture {
                if let Some(captured) = rules.equipment(equipment).capture_as {
                    if !winner.unit.equipment.contains(&captured) {
                        self.effects.push(CombatEffect::CaptureEquipment {
                            unit: winner.id,
                            equipment: captured,
                        });
                    }
                }
            }
        } else if let Some(to) = loser.unit.kind(rules).demotion {
            self.effects
                .push(CombatEffect::DemoteUnit { unit: loser.id, to });
        } else {
            self.effects
                .push(CombatEffect::SlaughterUnit { unit: loser.id });
        }
    }

    fn unarmed_unit_loses(&mut self, winner: Side<'_>, loser: Side<'_>) {
        let rules = self.rules;
        let european = self
            .state
            .player(winner.unit.owner)
            .is_some_and(|p| p.is_european());
        let capturable = abilities_of(rules, self.state, loser.unit).has(Ability::CanBeCaptured);
        if european && capturable && !winner.unit.is_naval(rules) {
            self.effects.push(CombatEffect::CaptureUnit {
                unit: loser.id,
                new_owner: winner.unit.owner,
            });
        } else {
            self.effects
                .push(CombatEffect::SlaughterUnit { unit: loser.id });
        }
    }

    fn promote(&mut self, winner: Side<'_>, great: bool) {
        let rules = self.rules;
        let automatic =
            abilities_of(rules, self.state, winner.unit).has(Ability::AutomaticPromotion);
        if !(great || automatic) || !winner.unit.is_armed(rules) {
            return;
        }
        if let Some(to) = winner.unit.kind(rules).promotion {
            self.effects
                .push(CombatEffect::PromoteUnit { unit: winner.id, to });
        }
    }

    fn loot(&mut self, winner: Side<'_>, loser: Side<'_>) {
        let rules = self.rules;
        let looter = winner.unit.is_naval(rules)
            && winner.unit.kind(rules).can_carry_goods()
            && abilities_of(rules, self.state, winner.unit).has(Ability::CaptureGoods);
        if looter && loser.unit.has_goods() {
            self.effects.push(CombatEffect::LootShip {
                winner: winner.id,
                loser: loser.id,
                goods: loser.unit.goods.clone(),
            });
        }
    }

    /// A great defeat, a second hit or nowhere to repair sinks the ship.
    fn ship_loses(&mut self, loser: Side<'_>, great: bool, lost_port: Option<SettlementId>) {
        let repair = if great || loser.unit.is_damaged() {
            None
        } else {
            self.repair_location(loser.unit, lost_port)
        };
        match repair {
            Some(repair_at) => self.effects.push(CombatEffect::DamageShip {
                unit: loser.id,
                repair_turns: loser.unit.kind(self.rules).repair_turns.max(1),
                repair_at,
            }),
            None => self.effects.push(CombatEffect::SinkShip { unit: loser.id }),
        }
    }

    /// `Some(None)` means Europe.
    fn repair_location(&self, ship: &Unit, excluded: Option<SettlementId>) -> Option<Option<SettlementId>> {
        let owner = self.state.player(ship.owner)?;
        let drydock = owner.settlements.iter().copied().find(|id| {
            Some(*id) != excluded
                && self
                    .state
                    .settlement(*id)
                    .is_some_and(|s| s.repairs_ships(self.rules))
        });
        match drydock {
            Some(id) => Some(Some(id)),
            None if owner.can_move_to_europe() => Some(None),
            None => None,
        }
    }

    fn colony_falls(&mut self, winner: Side<'_>, defender: Side<'_>, id: SettlementId, colony: &Settlement) {
        let rules = self.rules;
        let state = self.state;
        let european = state
            .player(winner.unit.owner)
            .is_some_and(|p| p.is_european());
        if european {
            self.ships_in_port_lost(colony, id);
            self.effects.push(CombatEffect::CaptureColony {
                settlement: id,
                new_owner: winner.unit.owner,
            });
            return;
        }
        let pillager =
            abilities_of(rules, state, winner.unit).has(Ability::PillageUnprotectedColony);
        let loot = if pillager {
            self.pillage_choice(colony)
        } else {
            None
        };
        match loot {
            Some(loot) => self.effects.push(CombatEffect::PillageColony {
                settlement: id,
                loot,
            }),
            None if colony.population() <= 1 => {
                self.ships_in_port_lost(colony, id);
                self.effects
                    .push(CombatEffect::DestroyColony { settlement: id });
            }
            None => self
                .effects
                .push(CombatEffect::SlaughterUnit { unit: defender.id }),
        }
    }

    fn ships_in_port_lost(&mut self, colony: &Settlement, id: SettlementId) {
        let state = self.state;
        for ship_id in state.naval_units_at(self.rules, colony.position) {
            let Some(ship) = state.unit(ship_id) else {
                continue;
            };
            if ship.owner == colony.owner {
                self.ship_loses(
                    Side {
                        id: ship_id,
                        unit: ship,
                    },
                    false,
                    Some(id),
                );
            }
        }
    }

    fn pillage_choice(&mut self, colony: &Settlement) -> Option<PillageLoot> {
        let mut options: Vec<PillageLoot> = colony
            .buildings()
            .iter()
            .filter(|b| self.rules.building(**b).pillageable)
            .map(|b| PillageLoot::Building { building: *b })
            .collect();
        options.extend(colony.goods.iter().filter(|g| g.amount > 0).map(|g| {
            PillageLoot::Goods {
                goods: GoodsAmount {
                    goods: g.goods,
                    amount: g.amount.min(100),
                },
            }
        }));
        let gold = self
            .state
            .player(colony.owner)
            .map_or(0, |p| p.gold.max(0) as u32);
        if gold > 0 {
            options.push(PillageLoot::Gold {
                amount: (gold / 10).max(1).min(gold),
            });
        }
        if options.is_empty() {
            return None;
        }
        let pick = self.rng.below(options.len() as u32) as usize;
        options.get(pick).copied()
    }

    /// True when nobody else could defend the settlement after `falling` dies.
    fn last_defender(&self, settlement: &Settlement, falling: UnitId) -> bool {
        let outside = self
            .state
            .land_units_at(self.rules, settlement.position, settlement.owner);
        outside
            .iter()
            .chain(settlement.units.iter())
            .all(|id| *id == falling)
    }

    fn plunder(&mut self, winner: &Unit, settlement: &Settlement) -> u32 {
        let Some(european) = self.state.player(winner.owner).filter(|p| p.is_european()) else {
            return 0;
        };
        let Some(indian) = settlement.as_indian() else {
            return 0;
        };
        let kind = self.rules.settlement_type(indian.settlement_type);
        if european.abilities(self.rules).has(Ability::PlunderNatives) {
            return kind.plunder_min + kind.plunder_range.saturating_sub(1);
        }
        kind.plunder_min + self.rng.below(kind.plunder_range)
    }
}
