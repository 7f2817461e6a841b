//! Client-side copy of the game, kept current by replaying server events.
//!
//! The mirror never resolves combat. It classifies moves speculatively so a client can
//! show the outcome of a step before asking the server, and it hashes its state the
//! same way the server does so drift is caught on the next submission.

use std::sync::Arc;

use freecol_protocol::wire::WireError;
use freecol_protocol::{Direction, Event, MoveType, UnitId};
use tracing::warn;

use crate::game::GameState;
use crate::movement::{classify_move, explain_move, MoveDecision};
use crate::rules::CompiledRules;
use crate::settlement::SettlementKind;

#[derive(Clone, Debug)]
pub struct ClientMirror {
    rules: Arc<CompiledRules>,
    state: GameState,
}

impl ClientMirror {
    pub fn new(rules: Arc<CompiledRules>, state: GameState) -> Self {
        Self { rules, state }
    }

    pub fn from_snapshot(rules: Arc<CompiledRules>, bytes: &[u8]) -> Result<Self, WireError> {
        Ok(Self::new(rules, GameState::from_snapshot_bytes(bytes)?))
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn classify(&self, unit: UnitId, direction: Direction) -> MoveType {
        classify_move(&self.rules, &self.state, unit, direction)
    }

    pub fn explain(&self, unit: UnitId, direction: Direction) -> MoveDecision {
        explain_move(&self.rules, &self.state, unit, direction)
    }

    pub fn checksum(&self) -> Result<u64, WireError> {
        self.state.checksum()
    }

    pub fn apply_events(&mut self, events: &[Event]) {
        for event in events {
            self.apply_event(event);
        }
    }

    /// Applies one event. Events naming entities the mirror no longer has are skipped.
    pub fn apply_event(&mut self, event: &Event) {
        let state = &mut self.state;
        match event {
            Event::TurnStarted { turn, player } => {
                state.turn = *turn;
                state.current_player = *player;
            }
            Event::UnitLocationChanged { unit, location } => {
                state.set_unit_location(*unit, *location)
            }
            Event::UnitMovesChanged { unit, moves_left } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.moves_left = *moves_left;
                }
            }
            Event::UnitTypeChanged { unit, unit_type } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.unit_type = *unit_type;
                }
            }
            Event::UnitEquipmentChanged { unit, equipment } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.equipment.clone_from(equipment);
                }
            }
            Event::UnitOwnerChanged { unit, owner } => state.change_unit_owner(*unit, *owner),
            Event::UnitStateChanged { unit, state: s } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.state = *s;
                }
            }
            Event::UnitCargoChanged { unit, goods } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.goods.clone_from(goods);
                }
            }
            Event::UnitRepairChanged { unit, repair_turns } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.repair_turns = *repair_turns;
                }
            }
            Event::UnitExperienceChanged { unit, experience } => {
                if let Some(u) = state.unit_mut(*unit) {
                    u.experience = *experience;
                }
            }
            Event::UnitRemoved { unit } => state.remove_unit(*unit),
            Event::SettlementOwnerChanged { settlement, owner } => {
                state.transfer_settlement(*settlement, *owner)
            }
            // Follows from the resident moves and removals already replayed.
            Event::SettlementPopulationChanged { .. } => {}
            Event::SettlementGoodsChanged { settlement, goods } => {
                if let Some(s) = state.settlement_mut(*settlement) {
                    s.goods.clone_from(goods);
                }
            }
            Event::SettlementBuildingsChanged {
                settlement,
                buildings,
            } => {
                if let Some(SettlementKind::Colony { buildings: b }) =
                    state.settlement_mut(*settlement).map(|s| &mut s.kind)
                {
                    b.clone_from(buildings);
                }
            }
            Event::SettlementMissionaryChanged {
                settlement,
                missionary,
            } => {
                if let Some(indian) = state
                    .settlement_mut(*settlement)
                    .and_then(|s| s.as_indian_mut())
                {
                    indian.missionary = *missionary;
                }
            }
            Event::SettlementSkillChanged { settlement, skill } => {
                if let Some(indian) = state
                    .settlement_mut(*settlement)
                    .and_then(|s| s.as_indian_mut())
                {
                    indian.learnable_skill = *skill;
                }
            }
            Event::SettlementVisited {
                settlement,
                visitors,
            } => {
                if let Some(indian) = state
                    .settlement_mut(*settlement)
                    .and_then(|s| s.as_indian_mut())
                {
                    indian.visitors.clone_from(visitors);
                }
            }
            Event::SettlementRemoved { settlement } => state.remove_settlement(*settlement),
            Event::StanceChanged {
                player,
                other,
                stance,
            } => state.set_stance(*player, *other, *stance),
            Event::TensionChanged {
                player,
                toward,
                tension,
            } => {
                if let Some(p) = state.player_mut(*player) {
                    p.tension.insert(*toward, *tension);
                }
            }
            Event::GoldChanged { player, gold } => {
                if let Some(p) = state.player_mut(*player) {
                    p.gold = *gold;
                }
            }
            Event::LostCityRumourExplored { position, .. } => {
                if let Some(tile) = state.map.tile_mut(*position) {
                    tile.lost_city_rumour = false;
                }
            }
            Event::MoveRejected { unit, move_type } => {
                warn!(?unit, ?move_type, "server rejected move");
            }
            Event::CombatResolved { .. }
            | Event::SkillLearned { .. }
            | Event::ScoutSpokeToChief { .. }
            | Event::MissionEstablished { .. }
            | Event::ColonyScouted { .. }
            | Event::TradeSessionOpened { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameEngine;
    use crate::testing::{FixedDraw, World};
    use freecol_protocol::{Command, Position};

    #[test]
    fn snapshot_round_trip_keeps_the_checksum() {
        let mut w = World::new();
        w.unit("free_colonist", w.dutch, Position::new(3, 3), &["horses"]);
        w.village(w.arawak, Position::new(6, 6), Some("expert_fur_trapper"));
        let bytes = w.state.snapshot_bytes().expect("snapshot");
        let rules = Arc::new(w.rules);
        let mirror = ClientMirror::from_snapshot(rules, &bytes).expect("mirror");
        assert_eq!(mirror.state(), &w.state);
        assert_eq!(
            mirror.checksum().expect("checksum"),
            w.state.checksum().expect("checksum")
        );
    }

    #[test]
    fn replayed_combat_matches_the_server() {
        let mut w = World::new();
        let soldier = w.unit("veteran_soldier", w.dutch, Position::new(5, 5), &["muskets"]);
        let village = w.village(w.arawak, Position::new(6, 5), None);
        w.resident("brave", village);
        w.resident("brave", village);
        w.war(w.dutch, w.arawak);
        let rules = Arc::new(w.rules);
        let mut mirror = ClientMirror::new(Arc::clone(&rules), w.state.clone());
        let mut server = GameEngine::new(rules, w.state);

        let command = Command::MoveUnit {
            unit: soldier,
            direction: Direction::E,
        };
        assert_eq!(
            mirror.classify(soldier, Direction::E),
            MoveType::AttackSettlement
        );
        let events = server
            .apply_command(command, &mut FixedDraw(0.0))
            .expect("attack");
        mirror.apply_events(&events);

        assert_eq!(
            mirror.checksum().expect("checksum"),
            server.state().checksum().expect("checksum")
        );
    }
}
