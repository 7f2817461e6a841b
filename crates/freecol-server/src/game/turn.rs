//! Seat tracking for sequential turns.
//!
//! Only seated players submit commands. Tribes and the crown have no client, so when a
//! seated player ends their turn the session ends the following unseated turns itself.

use std::collections::BTreeSet;

use freecol_core::{GameState, PlayerKind};
use freecol_protocol::PlayerId;

#[derive(Clone, Debug)]
pub struct TurnManager {
    seats: BTreeSet<PlayerId>,
}

impl TurnManager {
    pub fn new(seats: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            seats: seats.into_iter().collect(),
        }
    }

    /// Seats every European player in the state.
    pub fn for_state(state: &GameState) -> Self {
        Self::new(
            state
                .players
                .iter()
                .filter(|p| p.kind == PlayerKind::European)
                .map(|p| p.id),
        )
    }

    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.seats.contains(&player)
    }

    pub fn seats(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.seats.iter().copied()
    }

    /// Check if a player can currently act
    pub fn can_act(&self, player: PlayerId, current: PlayerId) -> bool {
        player == current && self.is_seated(player)
    }

    /// Whether the session should end `current`'s turn on its behalf.
    pub fn should_skip(&self, current: PlayerId) -> bool {
        !self.seats.is_empty() && !self.is_seated(current)
    }
}
