//! The controller: validates commands, carries out classified moves and reports the
//! resulting changes as events.

use std::collections::BTreeSet;
use std::sync::Arc;

use freecol_protocol::{
    ChiefResult, CombatEffect, Command, Direction, Event, MoveType, PillageLoot, PlayerId,
    Position, SettlementId, Stance, UnitId, UnitLocation, UnitState,
};
use thiserror::Error;
use tracing::debug;

use crate::combat::{resolve_combat, tile_defender, CombatResolution, CombatTarget};
use crate::cost::{BasicCostDecider, CostDecider};
use crate::game::GameState;
use crate::movement::{classify_move, origin};
use crate::rng::RandomSource;
use crate::rules::CompiledRules;
use crate::settlement::SettlementKind;
use crate::unit::{add_goods, remove_goods, Unit, GOODS_PER_SLOT};
use crate::was::WasSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("unknown unit")]
    UnknownUnit,
    #[error("unit does not belong to current player")]
    NotYourUnit,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("a player has no stance toward itself")]
    SelfDiplomacy,
    #[error("no contact with player {0:?}")]
    NotContacted(PlayerId),
    #[error("already at war with player {0:?}")]
    AlreadyAtWar(PlayerId),
    #[error("not at war with player {0:?}")]
    NotAtWar(PlayerId),
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    rules: Arc<CompiledRules>,
    state: GameState,
}

impl GameEngine {
    pub fn new(rules: Arc<CompiledRules>, state: GameState) -> Self {
        Self { rules, state }
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn shared_rules(&self) -> Arc<CompiledRules> {
        Arc::clone(&self.rules)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn classify(&self, unit: UnitId, direction: Direction) -> MoveType {
        classify_move(&self.rules, &self.state, unit, direction)
    }

    /// Applies one command for the current player.
    ///
    /// Fact events (rejections, combat reports, visits) come first, followed by the
    /// state changes in the fixed order produced by [`WasSet`]. A command that fails
    /// validation leaves the state untouched.
    pub fn apply_command<R: RandomSource + ?Sized>(
        &mut self,
        command: Command,
        rng: &mut R,
    ) -> Result<Vec<Event>, GameError> {
        let was = WasSet::capture(&self.state);
        let mut events = Vec::new();
        match command {
            Command::MoveUnit { unit, direction } => {
                self.move_unit(unit, direction, rng, &mut events)?
            }
            Command::Fortify { unit } => self.set_unit_state(unit, UnitState::Fortifying)?,
            Command::Sentry { unit } => self.set_unit_state(unit, UnitState::Sentry)?,
            Command::Activate { unit } => self.set_unit_state(unit, UnitState::Active)?,
            Command::DeclareWar { target } => self.declare_war(target)?,
            Command::MakePeace { target } => self.make_peace(target)?,
            Command::EndTurn => self.end_turn(&mut events),
        }
        events.extend(was.fire_changes(&self.state));
        Ok(events)
    }

    fn owned_unit(&self, id: UnitId) -> Result<&Unit, GameError> {
        let unit = self.state.unit(id).ok_or(GameError::UnknownUnit)?;
        if unit.owner != self.state.current_player {
            return Err(GameError::NotYourUnit);
        }
        Ok(unit)
    }

    fn set_unit_state(&mut self, id: UnitId, state: UnitState) -> Result<(), GameError> {
        let current = self.owned_unit(id)?.state;
        let state = match (state, current) {
            (UnitState::Fortifying, UnitState::Fortified) => UnitState::Fortified,
            (state, _) => state,
        };
        if let Some(unit) = self.state.unit_mut(id) {
            unit.state = state;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Movement
    // ---------------------------------------------------------------------

    fn move_unit<R: RandomSource + ?Sized>(
        &mut self,
        id: UnitId,
        direction: Direction,
        rng: &mut R,
        events: &mut Vec<Event>,
    ) -> Result<(), GameError> {
        let unit = self.owned_unit(id)?;
        let move_type = classify_move(&self.rules, &self.state, id, direction);
        let from = origin(&self.state, unit);
        let moves_left = unit.moves_left;
        let Some(from) = from.filter(|_| move_type.is_legal()) else {
            reject(events, id, move_type);
            return Ok(());
        };
        let target = from.step(direction);
        let cost = BasicCostDecider
            .cost_of(&self.rules, &self.state, id, move_type, from, target)
            .unwrap_or(moves_left);

        match move_type {
            MoveType::Move => self.step(id, target, cost),
            MoveType::ExploreLostCityRumour => {
                self.step(id, target, cost);
                self.explore_rumour(id, target, events);
            }
            MoveType::MoveHighSeas if self.state.map.contains(target) => {
                self.step(id, target, cost)
            }
            MoveType::MoveHighSeas => self.sail_to_high_seas(id),
            MoveType::Embark => match self.boarding_carrier(id, target) {
                Some(carrier) => self.embark(id, carrier),
                None => reject(events, id, move_type),
            },
            MoveType::AttackUnit => match tile_defender(&self.rules, &self.state, id, target) {
                Some(defender) => {
                    self.attack(id, CombatTarget::Unit(defender), cost, rng, events)
                }
                None => reject(events, id, move_type),
            },
            MoveType::AttackSettlement => match self.state.settlement_at(target) {
                Some((settlement, _)) => {
                    self.attack(id, CombatTarget::Settlement(settlement), cost, rng, events)
                }
                None => reject(events, id, move_type),
            },
            MoveType::EnterIndianSettlementWithFreeColonist => {
                self.learn_skill(id, target, events)
            }
            MoveType::EnterIndianSettlementWithScout => {
                self.speak_to_chief(id, target, rng, events)
            }
            MoveType::EnterIndianSettlementWithMissionary => {
                self.establish_mission(id, target, events)
            }
            MoveType::EnterForeignColonyWithScout => {
                self.visit(id, target, events, |unit, settlement| Event::ColonyScouted {
                    unit,
                    settlement,
                })
            }
            MoveType::EnterSettlementWithCarrierAndGoods => {
                self.visit(id, target, events, |unit, settlement| {
                    Event::TradeSessionOpened { unit, settlement }
                })
            }
            other => reject(events, id, other),
        }
        Ok(())
    }

    fn step(&mut self, id: UnitId, target: Position, cost: u32) {
        self.state
            .set_unit_location(id, UnitLocation::Tile { position: target });
        let Some(unit) = self.state.unit_mut(id) else {
            return;
        };
        unit.moves_left = unit.moves_left.saturating_sub(cost);
        unit.state = UnitState::Active;
        let owner = unit.owner;
        self.make_contact(owner, target);
    }

    fn sail_to_high_seas(&mut self, id: UnitId) {
        self.state.set_unit_location(id, UnitLocation::HighSeas);
        end_unit_turn(&mut self.state, id, UnitState::Active);
    }

    fn explore_rumour(&mut self, id: UnitId, position: Position, events: &mut Vec<Event>) {
        if let Some(tile) = self.state.map.tile_mut(position) {
            tile.lost_city_rumour = false;
        }
        events.push(Event::LostCityRumourExplored { unit: id, position });
    }

    /// Own carriers first, then a friendly foreign one.
    fn boarding_carrier(&self, id: UnitId, target: Position) -> Option<UnitId> {
        let unit = self.state.unit(id)?;
        let needed = unit.kind(&self.rules).space_taken;
        let tile = self.state.tile(target)?;
        let with_room = |accept: &dyn Fn(PlayerId) -> bool| {
            tile.units.iter().copied().find(|c| {
                self.state.unit(*c).is_some_and(|carrier| {
                    accept(carrier.owner)
                        && carrier.kind(&self.rules).can_carry_units()
                        && self.state.space_left(&self.rules, *c) >= needed
                })
            })
        };
        with_room(&|owner| owner == unit.owner).or_else(|| {
            with_room(&|owner| {
                owner != unit.owner && self.state.stance(unit.owner, owner).is_friendly()
            })
        })
    }

    fn embark(&mut self, id: UnitId, carrier: UnitId) {
        self.state
            .set_unit_location(id, UnitLocation::Carrier { carrier });
        end_unit_turn(&mut self.state, id, UnitState::Sentry);
    }

    /// First sight of a foreign unit or settlement next to `position` opens relations.
    fn make_contact(&mut self, owner: PlayerId, position: Position) {
        let mut met = BTreeSet::new();
        for pos in std::iter::once(position).chain(position.neighbors()) {
            let Some(tile) = self.state.tile(pos) else {
                continue;
            };
            met.extend(
                tile.units
                    .iter()
                    .filter_map(|u| self.state.unit(*u))
                    .map(|u| u.owner)
                    .filter(|o| *o != owner),
            );
            if let Some((_, settlement)) = self.state.settlement_at(pos) {
                if settlement.owner != owner {
                    met.insert(settlement.owner);
                }
            }
        }
        for other in met {
            if self.state.stance(owner, other) == Stance::Uncontacted {
                debug!(?owner, ?other, "first contact");
                self.state.set_stance(owner, other, Stance::Peace);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Settlement visits
    // ---------------------------------------------------------------------

    fn learn_skill(&mut self, id: UnitId, target: Position, events: &mut Vec<Event>) {
        let Some((settlement, skill)) = self.state.settlement_at(target).and_then(|(sid, s)| {
            s.as_indian()
                .and_then(|indian| indian.learnable_skill)
                .map(|skill| (sid, skill))
        }) else {
            reject(events, id, MoveType::EnterIndianSettlementWithFreeColonist);
            return;
        };
        if let Some(unit) = self.state.unit_mut(id) {
            unit.unit_type = skill;
        }
        if let Some(indian) = self
            .state
            .settlement_mut(settlement)
            .and_then(|s| s.as_indian_mut())
        {
            indian.learnable_skill = None;
        }
        end_unit_turn(&mut self.state, id, UnitState::Active);
        events.push(Event::SkillLearned {
            unit: id,
            settlement,
            skill,
        });
    }

    fn speak_to_chief<R: RandomSource + ?Sized>(
        &mut self,
        id: UnitId,
        target: Position,
        rng: &mut R,
        events: &mut Vec<Event>,
    ) {
        let Some(owner) = self.state.unit(id).map(|u| u.owner) else {
            return;
        };
        let Some((settlement, visited)) = self.state.settlement_at(target).and_then(|(sid, s)| {
            s.as_indian()
                .map(|indian| (sid, indian.visitors.contains(&owner)))
        }) else {
            reject(events, id, MoveType::EnterIndianSettlementWithScout);
            return;
        };
        let result = if visited {
            ChiefResult::Nothing
        } else if rng.below(2) == 0 {
            ChiefResult::Tales
        } else {
            let combat = &self.rules.combat;
            ChiefResult::Beads {
                gold: combat.chief_gift_min + rng.below(combat.chief_gift_range),
            }
        };
        if let Some(indian) = self
            .state
            .settlement_mut(settlement)
            .and_then(|s| s.as_indian_mut())
        {
            if let Err(pos) = indian.visitors.binary_search(&owner) {
                indian.visitors.insert(pos, owner);
            }
        }
        if let ChiefResult::Beads { gold } = result {
            add_gold(&mut self.state, owner, gold as i32);
        }
        end_unit_turn(&mut self.state, id, UnitState::Active);
        events.push(Event::ScoutSpokeToChief {
            unit: id,
            settlement,
            result,
        });
    }

    fn establish_mission(&mut self, id: UnitId, target: Position, events: &mut Vec<Event>) {
        let Some((settlement, previous)) = self
            .state
            .settlement_at(target)
            .and_then(|(sid, s)| s.as_indian().map(|indian| (sid, indian.missionary)))
        else {
            reject(events, id, MoveType::EnterIndianSettlementWithMissionary);
            return;
        };
        if let Some(previous) = previous.filter(|p| *p != id) {
            debug!(?previous, ?settlement, "missionary replaced");
            self.state.remove_unit(previous);
        }
        self.state
            .set_unit_location(id, UnitLocation::Settlement { settlement });
        end_unit_turn(&mut self.state, id, UnitState::Active);
        events.push(Event::MissionEstablished {
            unit: id,
            settlement,
        });
    }

    fn visit(
        &mut self,
        id: UnitId,
        target: Position,
        events: &mut Vec<Event>,
        report: impl FnOnce(UnitId, SettlementId) -> Event,
    ) {
        let Some((settlement, _)) = self.state.settlement_at(target) else {
            return;
        };
        end_unit_turn(&mut self.state, id, UnitState::Active);
        events.push(report(id, settlement));
    }

    // ---------------------------------------------------------------------
    // Combat
    // ---------------------------------------------------------------------

    fn attack<R: RandomSource + ?Sized>(
        &mut self,
        attacker: UnitId,
        target: CombatTarget,
        cost: u32,
        rng: &mut R,
        events: &mut Vec<Event>,
    ) {
        let resolution = resolve_combat(&self.rules, &self.state, attacker, target, rng);
        let attacker_owner = self.state.unit(attacker).map(|u| u.owner);
        let defender_owner = self.state.unit(resolution.defender).map(|u| u.owner);
        let tension = self.tension_from(&resolution);

        for effect in &resolution.effects {
            self.apply_effect(attacker, effect);
        }
        if let Some(unit) = self.state.unit_mut(attacker) {
            unit.moves_left = unit.moves_left.saturating_sub(cost);
            unit.state = UnitState::Active;
        }
        if let (Some(attacker_owner), Some(defender_owner)) = (attacker_owner, defender_owner) {
            let natives = self
                .state
                .player(defender_owner)
                .is_some_and(|p| p.is_native());
            if natives {
                self.add_tension(defender_owner, attacker_owner, tension);
            }
        }

        events.push(Event::CombatResolved {
            attacker,
            defender: resolution.defender,
            outcome: resolution.outcome,
            offence: resolution.offence,
            defence: resolution.defence,
            effects: resolution.effects,
        });
    }

    fn tension_from(&self, resolution: &CombatResolution) -> i32 {
        let combat = &self.rules.combat;
        let killed = resolution.effects.iter().any(|e| {
            matches!(e, CombatEffect::SlaughterUnit { unit } if *unit == resolution.defender)
        });
        let destroyed = resolution
            .effects
            .iter()
            .any(|e| matches!(e, CombatEffect::DestroySettlement { .. }));
        match resolution.target {
            CombatTarget::Settlement(_) if destroyed => combat.tension_settlement_destroyed,
            CombatTarget::Settlement(_) => combat.tension_settlement_attacked,
            CombatTarget::Unit(_) if killed => combat.tension_unit_destroyed,
            CombatTarget::Unit(_) => combat.tension_unit_attacked,
        }
    }

    /// Raises a native player's tension; past the configured threshold the tribe goes to war.
    fn add_tension(&mut self, native: PlayerId, toward: PlayerId, amount: i32) {
        let threshold = self.state.options.tension_war_threshold;
        let Some(player) = self.state.player_mut(native) else {
            return;
        };
        let level = player.tension.entry(toward).or_insert(0);
        *level = level.saturating_add(amount);
        let level = *level;
        if level >= threshold && self.state.stance(native, toward) != Stance::War {
            debug!(?native, ?toward, level, "tension turned to war");
            self.state.set_stance(native, toward, Stance::War);
        }
    }

    fn apply_effect(&mut self, attacker: UnitId, effect: &CombatEffect) {
        let rules = Arc::clone(&self.rules);
        let state = &mut self.state;
        match effect {
            CombatEffect::CaptureUnit { unit, new_owner } => {
                state.change_unit_owner(*unit, *new_owner);
                let winner_at = state.unit(attacker).map(|u| u.location);
                if let Some(location @ UnitLocation::Tile { .. }) = winner_at {
                    state.set_unit_location(*unit, location);
                }
                end_unit_turn(state, *unit, UnitState::Active);
            }
            CombatEffect::SlaughterUnit { unit } | CombatEffect::SinkShip { unit } => {
                state.remove_unit(*unit)
            }
            CombatEffect::LoseEquipment { unit, equipment } => {
                if let Some(u) = state.unit_mut(*unit) {
                    if let Some(index) = u.equipment.iter().position(|e| e == equipment) {
                        u.equipment.remove(index);
                    }
                    u.moves_left = u.moves_left.min(u.initial_moves(&rules));
                }
            }
            CombatEffect::CaptureEquipment { unit, equipment } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.equipment.push(*equipment);
                }
            }
            CombatEffect::DemoteUnit { unit, to } | CombatEffect::PromoteUnit { unit, to } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.unit_type = *to;
                    u.moves_left = u.moves_left.min(u.initial_moves(&rules));
                }
            }
            CombatEffect::DamageShip {
                unit,
                repair_turns,
                repair_at,
            } => {
                let passengers = state.unit(*unit).map(|u| u.units.clone()).unwrap_or_default();
                for passenger in passengers {
                    state.remove_unit(passenger);
                }
                let location = repair_at
                    .and_then(|s| state.settlement(s))
                    .map_or(UnitLocation::Europe, |s| UnitLocation::Tile {
                        position: s.position,
                    });
                state.set_unit_location(*unit, location);
                if let Some(u) = state.unit_mut(*unit) {
                    u.goods.clear();
                    u.repair_turns = *repair_turns;
                }
                end_unit_turn(state, *unit, UnitState::Active);
            }
            CombatEffect::LootShip {
                winner,
                loser,
                goods,
            } => {
                let mut room = state.space_left(&rules, *winner);
                for g in goods {
                    let taken = g.amount.min(room * GOODS_PER_SLOT);
                    if taken == 0 {
                        break;
                    }
                    room -= taken.div_ceil(GOODS_PER_SLOT);
                    if let Some(w) = state.unit_mut(*winner) {
                        add_goods(&mut w.goods, g.goods, taken);
                    }
                }
                if let Some(l) = state.unit_mut(*loser) {
                    for g in goods {
                        remove_goods(&mut l.goods, g.goods, g.amount);
                    }
                }
            }
            CombatEffect::EvadeAttack { .. } | CombatEffect::AttackerRepelled { .. } => {}
            CombatEffect::CaptureColony {
                settlement,
                new_owner,
            } => {
                let Some(colony) = state.settlement(*settlement) else {
                    return;
                };
                let old_owner = colony.owner;
                let position = colony.position;
                let mut captured = colony.units.clone();
                captured.extend(state.land_units_at(&rules, position, old_owner));
                state.transfer_settlement(*settlement, *new_owner);
                for unit in captured {
                    state.change_unit_owner(unit, *new_owner);
                }
                state.set_unit_location(attacker, UnitLocation::Tile { position });
            }
            CombatEffect::DestroyColony { settlement } => {
                let Some(colony) = state.settlement(*settlement) else {
                    return;
                };
                let mut doomed = colony.units.clone();
                doomed.extend(state.land_units_at(&rules, colony.position, colony.owner));
                for unit in doomed {
                    state.remove_unit(unit);
                }
                state.remove_settlement(*settlement);
            }
            CombatEffect::PillageColony { settlement, loot } => {
                let attacker_owner = state.unit(attacker).map(|u| u.owner);
                let Some(colony) = state.settlement_mut(*settlement) else {
                    return;
                };
                let colony_owner = colony.owner;
                match loot {
                    PillageLoot::Building { building } => {
                        if let SettlementKind::Colony { buildings } = &mut colony.kind {
                            if let Some(index) = buildings.iter().position(|b| b == building) {
                                buildings.remove(index);
                            }
                        }
                    }
                    PillageLoot::Goods { goods } => {
                        remove_goods(&mut colony.goods, goods.goods, goods.amount);
                    }
                    PillageLoot::Gold { amount } => {
                        add_gold(state, colony_owner, -(*amount as i32));
                        if let Some(owner) = attacker_owner {
                            add_gold(state, owner, *amount as i32);
                        }
                    }
                }
            }
            CombatEffect::DestroySettlement {
                settlement,
                plunder,
            } => {
                let attacker_owner = state.unit(attacker).map(|u| u.owner);
                let Some(camp) = state.settlement(*settlement) else {
                    return;
                };
                let mut doomed = camp.units.clone();
                doomed.extend(state.land_units_at(&rules, camp.position, camp.owner));
                doomed.extend(camp.as_indian().and_then(|indian| indian.missionary));
                for unit in doomed {
                    state.remove_unit(unit);
                }
                state.remove_settlement(*settlement);
                if let Some(owner) = attacker_owner {
                    add_gold(state, owner, *plunder as i32);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Diplomacy
    // ---------------------------------------------------------------------

    fn other_player(&self, target: PlayerId) -> Result<PlayerId, GameError> {
        let me = self.state.current_player;
        if target == me {
            return Err(GameError::SelfDiplomacy);
        }
        self.state.player(target).ok_or(GameError::UnknownPlayer)?;
        Ok(me)
    }

    fn declare_war(&mut self, target: PlayerId) -> Result<(), GameError> {
        let me = self.other_player(target)?;
        match self.state.stance(me, target) {
            Stance::Uncontacted => Err(GameError::NotContacted(target)),
            Stance::War => Err(GameError::AlreadyAtWar(target)),
            _ => {
                debug!(player = ?me, ?target, "war declared");
                self.state.set_stance(me, target, Stance::War);
                Ok(())
            }
        }
    }

    fn make_peace(&mut self, target: PlayerId) -> Result<(), GameError> {
        let me = self.other_player(target)?;
        match self.state.stance(me, target) {
            Stance::War | Stance::CeaseFire => {
                self.state.set_stance(me, target, Stance::Peace);
                for (native, toward) in [(target, me), (me, target)] {
                    if let Some(level) = self
                        .state
                        .player_mut(native)
                        .and_then(|p| p.tension.get_mut(&toward))
                    {
                        *level = 0;
                    }
                }
                Ok(())
            }
            _ => Err(GameError::NotAtWar(target)),
        }
    }

    // ---------------------------------------------------------------------
    // Turn flow
    // ---------------------------------------------------------------------

    fn end_turn(&mut self, events: &mut Vec<Event>) {
        let count = self.state.players.len();
        if count == 0 {
            return;
        }
        let next = (self.state.current_player.0 as usize + 1) % count;
        if next == 0 {
            self.state.turn += 1;
        }
        let player = PlayerId(next as u8);
        self.state.current_player = player;
        self.start_turn(player);
        events.push(Event::TurnStarted {
            turn: self.state.turn,
            player,
        });
    }

    /// Refreshes movement, advances repairs and fortification, and lands ships that were
    /// sailing the high seas in Europe.
    fn start_turn(&mut self, player: PlayerId) {
        let units: Vec<UnitId> = self
            .state
            .player(player)
            .map(|p| p.units.iter().copied().collect())
            .unwrap_or_default();
        for id in units {
            if self.state.unit(id).map(|u| u.location) == Some(UnitLocation::HighSeas) {
                self.state.set_unit_location(id, UnitLocation::Europe);
            }
            let Some(unit) = self.state.unit_mut(id) else {
                continue;
            };
            if unit.repair_turns > 0 {
                unit.repair_turns -= 1;
                unit.moves_left = 0;
            } else {
                unit.moves_left = unit.initial_moves(&self.rules);
            }
            if unit.state == UnitState::Fortifying {
                unit.state = UnitState::Fortified;
            }
        }
    }
}

fn reject(events: &mut Vec<Event>, unit: UnitId, move_type: MoveType) {
    debug!(?unit, ?move_type, "move rejected");
    events.push(Event::MoveRejected { unit, move_type });
}

fn end_unit_turn(state: &mut GameState, id: UnitId, unit_state: UnitState) {
    if let Some(unit) = state.unit_mut(id) {
        unit.moves_left = 0;
        unit.state = unit_state;
    }
}

fn add_gold(state: &mut GameState, player: PlayerId, amount: i32) {
    if let Some(p) = state.player_mut(player) {
        p.gold = p.gold.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::GameRng;
    use crate::testing::{FixedDraw, World};

    fn at(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn engine(w: World) -> GameEngine {
        GameEngine::new(Arc::new(w.rules), w.state)
    }

    fn move_unit(engine: &mut GameEngine, unit: UnitId, direction: Direction, draw: f32) -> Vec<Event> {
        engine
            .apply_command(Command::MoveUnit { unit, direction }, &mut FixedDraw(draw))
            .expect("move applies")
    }

    #[test]
    fn colonist_walks_across_plains() {
        let mut w = World::new();
        let colonist = w.unit("free_colonist", w.dutch, at(5, 5), &[]);
        let mut engine = engine(w);

        let events = move_unit(&mut engine, colonist, Direction::E, 0.0);
        assert_eq!(
            events,
            vec![
                Event::UnitLocationChanged {
                    unit: colonist,
                    location: UnitLocation::Tile { position: at(6, 5) },
                },
                Event::UnitMovesChanged {
                    unit: colonist,
                    moves_left: 0,
                },
            ]
        );
        assert_eq!(engine.state().tile(at(6, 5)).expect("tile").units, vec![colonist]);
    }

    #[test]
    fn illegal_moves_are_reported_without_changes() {
        let mut w = World::new();
        w.set_tile(at(6, 5), "ocean");
        let colonist = w.unit("free_colonist", w.dutch, at(5, 5), &[]);
        let mut engine = engine(w);
        let before = engine.state().clone();

        let move_type = engine.classify(colonist, Direction::E);
        assert!(!move_type.is_legal());
        let events = move_unit(&mut engine, colonist, Direction::E, 0.0);
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                unit: colonist,
                move_type,
            }]
        );
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn commands_for_other_players_units_fail() {
        let mut w = World::new();
        let english = w.unit("free_colonist", w.english, at(5, 5), &[]);
        let mut engine = engine(w);
        let mut rng = FixedDraw(0.0);

        assert_eq!(
            engine.apply_command(Command::Fortify { unit: english }, &mut rng),
            Err(GameError::NotYourUnit)
        );
        engine.state_mut().remove_unit(english);
        assert_eq!(
            engine.apply_command(
                Command::MoveUnit {
                    unit: english,
                    direction: Direction::N,
                },
                &mut rng,
            ),
            Err(GameError::UnknownUnit)
        );
    }

    #[test]
    fn beaten_colonist_is_captured_onto_the_winners_tile() {
        let mut w = World::new();
        w.set_tile(at(6, 5), "hills");
        let dragoon = w.unit("free_colonist", w.dutch, at(5, 5), &["muskets", "horses"]);
        let colonist = w.unit("free_colonist", w.english, at(6, 5), &[]);
        w.state.unit_mut(colonist).expect("colonist").state = UnitState::Fortified;
        w.war(w.dutch, w.english);
        let dutch = w.dutch;
        let mut engine = engine(w);

        let events = move_unit(&mut engine, dragoon, Direction::E, 0.0);
        assert!(matches!(
            events.first(),
            Some(Event::CombatResolved { attacker, defender, .. })
                if *attacker == dragoon && *defender == colonist
        ));
        let captured = engine.state().unit(colonist).expect("captured");
        assert_eq!(captured.owner, dutch);
        assert_eq!(captured.location, UnitLocation::Tile { position: at(5, 5) });
        assert!(engine.state().player(dutch).expect("dutch").units.contains(&colonist));
        assert_eq!(engine.state().unit(dragoon).expect("dragoon").moves_left, 0);
        assert!(events.contains(&Event::UnitOwnerChanged {
            unit: colonist,
            owner: dutch,
        }));
    }

    #[test]
    fn undefended_colony_changes_hands() {
        let mut w = World::new();
        let soldier = w.unit("veteran_soldier", w.dutch, at(5, 5), &["muskets"]);
        let colony = w.colony(w.english, at(6, 5), &[]);
        let worker = w.resident("free_colonist", colony);
        w.war(w.dutch, w.english);
        let (dutch, english) = (w.dutch, w.english);
        let mut engine = engine(w);

        move_unit(&mut engine, soldier, Direction::E, 0.0);
        let state = engine.state();
        let colony = state.settlement(colony).expect("colony");
        assert_eq!(colony.owner, dutch);
        assert_eq!(state.unit(worker).expect("worker").owner, dutch);
        assert_eq!(state.tile(at(6, 5)).expect("tile").owner, Some(dutch));
        assert_eq!(
            state.unit(soldier).expect("soldier").location,
            UnitLocation::Tile { position: at(6, 5) }
        );
        assert!(state.player(english).expect("english").settlements.is_empty());
    }

    #[test]
    fn burning_a_village_pays_plunder_and_angers_the_tribe() {
        let mut w = World::new();
        let soldier = w.unit("veteran_soldier", w.dutch, at(5, 5), &["muskets"]);
        let village = w.village(w.arawak, at(6, 5), None);
        w.resident("brave", village);
        w.war(w.dutch, w.arawak);
        let (dutch, arawak) = (w.dutch, w.arawak);
        let combat = w.rules.combat.clone();
        let mut engine = engine(w);

        move_unit(&mut engine, soldier, Direction::E, 0.0);
        let state = engine.state();
        assert!(state.settlement(village).is_none());
        assert_eq!(state.tile(at(6, 5)).expect("tile").settlement, None);
        // The fixed draw picks the bottom of the village plunder range.
        assert_eq!(state.player(dutch).expect("dutch").gold, 100);
        assert_eq!(
            state.player(arawak).expect("arawak").tension_toward(dutch),
            combat.tension_settlement_destroyed
        );
    }

    #[test]
    fn empty_village_turns_an_attacker_away() {
        let mut w = World::new();
        let soldier = w.unit("veteran_soldier", w.dutch, at(5, 5), &["muskets"]);
        let village = w.village(w.arawak, at(6, 5), None);
        w.war(w.dutch, w.arawak);
        let mut engine = engine(w);

        let events = move_unit(&mut engine, soldier, Direction::E, 0.0);
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                unit: soldier,
                move_type: MoveType::MoveNoAccessSettlement,
            }]
        );
        assert!(engine.state().settlement(village).is_some());
        assert_eq!(
            engine.state().unit(soldier).expect("soldier").location,
            UnitLocation::Tile { position: at(5, 5) }
        );
    }

    #[test]
    fn tension_past_the_threshold_means_war() {
        let mut w = World::new();
        w.state.options.tension_war_threshold = 250;
        let (english, arawak) = (w.english, w.arawak);
        let mut engine = engine(w);

        engine.add_tension(arawak, english, 200);
        assert_eq!(engine.state().stance(arawak, english), Stance::Peace);
        engine.add_tension(arawak, english, 100);
        assert_eq!(engine.state().stance(english, arawak), Stance::War);
    }

    #[test]
    fn colonist_learns_the_village_skill_once() {
        let mut w = World::new();
        let colonist = w.unit("free_colonist", w.dutch, at(5, 5), &[]);
        let village = w.village(w.arawak, at(6, 5), Some("expert_farmer"));
        let farmer = w.unit_type("expert_farmer");
        let mut engine = engine(w);

        let events = move_unit(&mut engine, colonist, Direction::E, 0.0);
        assert_eq!(
            events.first(),
            Some(&Event::SkillLearned {
                unit: colonist,
                settlement: village,
                skill: farmer,
            })
        );
        let unit = engine.state().unit(colonist).expect("colonist");
        assert_eq!(unit.unit_type, farmer);
        assert_eq!(unit.location, UnitLocation::Tile { position: at(5, 5) });
        let indian = engine.state().settlement(village).expect("village");
        assert_eq!(indian.as_indian().expect("indian").learnable_skill, None);
    }

    #[test]
    fn chief_receives_each_player_once() {
        let mut w = World::new();
        let scout = w.unit("free_colonist", w.dutch, at(5, 5), &["horses"]);
        let village = w.village(w.arawak, at(6, 5), None);
        let dutch = w.dutch;
        let mut engine = engine(w);
        let mut rng = GameRng::seed_from_u64(11);
        let command = Command::MoveUnit {
            unit: scout,
            direction: Direction::E,
        };

        let first = engine.apply_command(command.clone(), &mut rng).expect("visit");
        assert!(matches!(
            first.first(),
            Some(Event::ScoutSpokeToChief { result, .. }) if *result != ChiefResult::Nothing
        ));
        let settlement = engine.state().settlement(village).expect("village");
        assert_eq!(settlement.as_indian().expect("indian").visitors, vec![dutch]);

        engine.state_mut().unit_mut(scout).expect("scout").moves_left = 4;
        let second = engine.apply_command(command, &mut rng).expect("visit");
        assert!(matches!(
            second.first(),
            Some(Event::ScoutSpokeToChief {
                result: ChiefResult::Nothing,
                ..
            })
        ));
    }

    #[test]
    fn missionary_moves_into_the_village() {
        let mut w = World::new();
        let jesuit = w.unit("jesuit_missionary", w.dutch, at(5, 5), &[]);
        let village = w.village(w.arawak, at(6, 5), None);
        let mut engine = engine(w);

        let events = move_unit(&mut engine, jesuit, Direction::E, 0.0);
        assert_eq!(
            events.first(),
            Some(&Event::MissionEstablished {
                unit: jesuit,
                settlement: village,
            })
        );
        let settlement = engine.state().settlement(village).expect("village");
        assert_eq!(settlement.as_indian().expect("indian").missionary, Some(jesuit));
        assert!(settlement.units.is_empty());
        assert!(events.contains(&Event::SettlementMissionaryChanged {
            settlement: village,
            missionary: Some(jesuit),
        }));
    }

    #[test]
    fn exploring_a_rumour_clears_it() {
        let mut w = World::new();
        let colonist = w.unit("free_colonist", w.dutch, at(5, 5), &[]);
        w.state.map.tile_mut(at(5, 6)).expect("tile").lost_city_rumour = true;
        let mut engine = engine(w);

        let events = move_unit(&mut engine, colonist, Direction::S, 0.0);
        assert_eq!(
            events.first(),
            Some(&Event::LostCityRumourExplored {
                unit: colonist,
                position: at(5, 6),
            })
        );
        assert!(!engine.state().tile(at(5, 6)).expect("tile").lost_city_rumour);
    }

    #[test]
    fn moving_next_to_strangers_makes_contact() {
        let mut w = World::new();
        w.state.set_stance(w.dutch, w.arawak, Stance::Uncontacted);
        let colonist = w.unit("free_colonist", w.dutch, at(5, 5), &[]);
        w.unit("brave", w.arawak, at(7, 5), &[]);
        let (dutch, arawak) = (w.dutch, w.arawak);
        let mut engine = engine(w);

        let events = move_unit(&mut engine, colonist, Direction::E, 0.0);
        assert_eq!(engine.state().stance(dutch, arawak), Stance::Peace);
        assert!(events.contains(&Event::StanceChanged {
            player: dutch,
            other: arawak,
            stance: Stance::Peace,
        }));
    }

    #[test]
    fn war_and_peace_are_validated() {
        let w = World::new();
        let (dutch, english) = (w.dutch, w.english);
        let mut engine = engine(w);
        let mut rng = FixedDraw(0.0);

        assert_eq!(
            engine.apply_command(Command::MakePeace { target: english }, &mut rng),
            Err(GameError::NotAtWar(english))
        );
        assert_eq!(
            engine.apply_command(Command::DeclareWar { target: dutch }, &mut rng),
            Err(GameError::SelfDiplomacy)
        );
        engine
            .apply_command(Command::DeclareWar { target: english }, &mut rng)
            .expect("war");
        assert_eq!(engine.state().stance(english, dutch), Stance::War);
        assert_eq!(
            engine.apply_command(Command::DeclareWar { target: english }, &mut rng),
            Err(GameError::AlreadyAtWar(english))
        );
        engine
            .apply_command(Command::MakePeace { target: english }, &mut rng)
            .expect("peace");
        assert_eq!(engine.state().stance(dutch, english), Stance::Peace);
    }

    #[test]
    fn end_turn_rotates_players_and_refreshes_units() {
        let mut w = World::new();
        let soldier = w.unit("free_colonist", w.dutch, at(5, 5), &["muskets"]);
        let (dutch, english) = (w.dutch, w.english);
        let mut engine = engine(w);
        let mut rng = FixedDraw(0.0);

        engine
            .apply_command(Command::Fortify { unit: soldier }, &mut rng)
            .expect("fortify");
        engine.state_mut().unit_mut(soldier).expect("soldier").moves_left = 0;

        let events = engine.apply_command(Command::EndTurn, &mut rng).expect("end");
        assert_eq!(events, vec![Event::TurnStarted { turn: 1, player: english }]);
        engine.apply_command(Command::EndTurn, &mut rng).expect("end");
        let events = engine.apply_command(Command::EndTurn, &mut rng).expect("end");

        assert_eq!(events.first(), Some(&Event::TurnStarted { turn: 2, player: dutch }));
        let unit = engine.state().unit(soldier).expect("soldier");
        assert_eq!(unit.moves_left, 1);
        assert_eq!(unit.state, UnitState::Fortified);
    }
}
