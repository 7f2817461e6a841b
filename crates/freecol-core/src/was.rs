//! Before-images of units, settlements and players, diffed into change events.
//!
//! The engine captures a [`WasSet`] before applying a command and fires the changes
//! afterwards. Event order is fixed: units by id, then settlements by id, then players.

use std::collections::BTreeMap;

use freecol_protocol::{Event, PlayerId, SettlementId, UnitId};

use crate::game::GameState;
use crate::player::Player;
use crate::settlement::Settlement;
use crate::unit::Unit;

pub struct UnitWas {
    id: UnitId,
    before: Unit,
}

impl UnitWas {
    pub fn new(state: &GameState, id: UnitId) -> Option<Self> {
        Some(Self {
            id,
            before: state.unit(id)?.clone(),
        })
    }

    pub fn fire_changes(&self, state: &GameState, out: &mut Vec<Event>) {
        let unit = self.id;
        let Some(now) = state.unit(unit) else {
            out.push(Event::UnitRemoved { unit });
            return;
        };
        let was = &self.before;
        if now.owner != was.owner {
            out.push(Event::UnitOwnerChanged {
                unit,
                owner: now.owner,
            });
        }
        if now.unit_type != was.unit_type {
            out.push(Event::UnitTypeChanged {
                unit,
                unit_type: now.unit_type,
            });
        }
        if now.equipment != was.equipment {
            out.push(Event::UnitEquipmentChanged {
                unit,
                equipment: now.equipment.clone(),
            });
        }
        if now.location != was.location {
            out.push(Event::UnitLocationChanged {
                unit,
                location: now.location,
            });
        }
        if now.goods != was.goods {
            out.push(Event::UnitCargoChanged {
                unit,
                goods: now.goods.clone(),
            });
        }
        if now.moves_left != was.moves_left {
            out.push(Event::UnitMovesChanged {
                unit,
                moves_left: now.moves_left,
            });
        }
        if now.state != was.state {
            out.push(Event::UnitStateChanged {
                unit,
                state: now.state,
            });
        }
        if now.repair_turns != was.repair_turns {
            out.push(Event::UnitRepairChanged {
                unit,
                repair_turns: now.repair_turns,
            });
        }
        if now.experience != was.experience {
            out.push(Event::UnitExperienceChanged {
                unit,
                experience: now.experience,
            });
        }
    }
}

pub struct SettlementWas {
    id: SettlementId,
    before: Settlement,
}

impl SettlementWas {
    pub fn new(state: &GameState, id: SettlementId) -> Option<Self> {
        Some(Self {
            id,
            before: state.settlement(id)?.clone(),
        })
    }

    pub fn fire_changes(&self, state: &GameState, out: &mut Vec<Event>) {
        let settlement = self.id;
        let Some(now) = state.settlement(settlement) else {
            out.push(Event::SettlementRemoved { settlement });
            return;
        };
        let was = &self.before;
        if now.owner != was.owner {
            out.push(Event::SettlementOwnerChanged {
                settlement,
                owner: now.owner,
            });
        }
        if now.population() != was.population() {
            out.push(Event::SettlementPopulationChanged {
                settlement,
                population: now.population(),
            });
        }
        if now.goods != was.goods {
            out.push(Event::SettlementGoodsChanged {
                settlement,
                goods: now.goods.clone(),
            });
        }
        if now.buildings() != was.buildings() {
            out.push(Event::SettlementBuildingsChanged {
                settlement,
                buildings: now.buildings().to_vec(),
            });
        }
        if let (Some(now), Some(was)) = (now.as_indian(), was.as_indian()) {
            if now.missionary != was.missionary {
                out.push(Event::SettlementMissionaryChanged {
                    settlement,
                    missionary: now.missionary,
                });
            }
            if now.learnable_skill != was.learnable_skill {
                out.push(Event::SettlementSkillChanged {
                    settlement,
                    skill: now.learnable_skill,
                });
            }
            if now.visitors != was.visitors {
                out.push(Event::SettlementVisited {
                    settlement,
                    visitors: now.visitors.clone(),
                });
            }
        }
    }
}

pub struct PlayerWas {
    before: Player,
}

impl PlayerWas {
    pub fn new(state: &GameState, id: PlayerId) -> Option<Self> {
        Some(Self {
            before: state.player(id)?.clone(),
        })
    }

    pub fn fire_changes(&self, state: &GameState, out: &mut Vec<Event>) {
        let was = &self.before;
        let player = was.id;
        let Some(now) = state.player(player) else {
            return;
        };
        if now.gold != was.gold {
            out.push(Event::GoldChanged {
                player,
                gold: now.gold,
            });
        }
        // Stances are symmetric; report each pair once, from the lower id.
        for (other, stance) in &now.stances {
            if *other > player && was.stances.get(other) != Some(stance) {
                out.push(Event::StanceChanged {
                    player,
                    other: *other,
                    stance: *stance,
                });
            }
        }
        for (toward, tension) in &now.tension {
            if was.tension.get(toward) != Some(tension) {
                out.push(Event::TensionChanged {
                    player,
                    toward: *toward,
                    tension: *tension,
                });
            }
        }
    }
}

/// Snapshot of every unit, settlement and player.
pub struct WasSet {
    units: BTreeMap<UnitId, UnitWas>,
    settlements: BTreeMap<SettlementId, SettlementWas>,
    players: Vec<PlayerWas>,
}

impl WasSet {
    pub fn capture(state: &GameState) -> Self {
        Self {
            units: state
                .units
                .ids()
                .into_iter()
                .filter_map(|id| UnitWas::new(state, id).map(|w| (id, w)))
                .collect(),
            settlements: state
                .settlements
                .ids()
                .into_iter()
                .filter_map(|id| SettlementWas::new(state, id).map(|w| (id, w)))
                .collect(),
            players: state
                .players
                .iter()
                .filter_map(|p| PlayerWas::new(state, p.id))
                .collect(),
        }
    }

    pub fn fire_changes(&self, state: &GameState) -> Vec<Event> {
        let mut out = Vec::new();
        for was in self.units.values() {
            was.fire_changes(state, &mut out);
        }
        for was in self.settlements.values() {
            was.fire_changes(state, &mut out);
        }
        for was in &self.players {
            was.fire_changes(state, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::World;
    use freecol_protocol::{Position, Stance, UnitLocation};

    #[test]
    fn moves_and_removals_become_events() {
        let mut w = World::new();
        let walker = w.unit("free_colonist", w.dutch, Position::new(1, 1), &[]);
        let doomed = w.unit("free_colonist", w.dutch, Position::new(2, 2), &[]);
        let was = WasSet::capture(&w.state);

        let to = UnitLocation::Tile {
            position: Position::new(1, 2),
        };
        w.state.set_unit_location(walker, to);
        w.state.unit_mut(walker).expect("walker").moves_left = 0;
        w.state.remove_unit(doomed);
        w.state.set_stance(w.dutch, w.english, Stance::War);

        let events = was.fire_changes(&w.state);
        assert_eq!(
            events,
            vec![
                Event::UnitLocationChanged {
                    unit: walker,
                    location: to,
                },
                Event::UnitMovesChanged {
                    unit: walker,
                    moves_left: 0,
                },
                Event::UnitRemoved { unit: doomed },
                Event::StanceChanged {
                    player: w.dutch,
                    other: w.english,
                    stance: Stance::War,
                },
            ]
        );
    }

    #[test]
    fn nothing_changed_means_no_events() {
        let mut w = World::new();
        w.unit("free_colonist", w.dutch, Position::new(1, 1), &[]);
        w.village(w.arawak, Position::new(4, 4), Some("expert_farmer"));
        let was = WasSet::capture(&w.state);
        assert!(was.fire_changes(&w.state).is_empty());
    }
}
