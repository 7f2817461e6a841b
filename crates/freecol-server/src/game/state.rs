//! Server-authoritative game session.
//!
//! Wraps the core `GameEngine` with the session RNG and exposes:
//! - the current state checksum for desync detection
//! - validated, atomic command application
//! - the resulting core `Event`s for clients to replay on their mirrors

use std::sync::Arc;

use freecol_core::{CompiledRules, GameEngine, GameRng, GameState};
use freecol_protocol::wire::WireError;
use freecol_protocol::{Command, Direction, Event, MoveType, PlayerId, UnitId};
use tracing::{debug, info, warn};

use super::TurnManager;
use crate::config::{ConfigError, ServerConfig};
use crate::protocol::{ClientMessage, ServerMessage, TurnRejectReason};

/// Result of validating and applying commands.
#[derive(Debug)]
pub enum ApplyResult {
    /// Commands applied successfully.
    Success {
        /// Every event produced, including turns the session ended for unseated players.
        events: Vec<Event>,
        /// Whether this submission ended the player's turn.
        turn_ended: bool,
    },
    /// Player cannot act right now.
    NotYourTurn,
    /// Command validation failed.
    ValidationError { index: usize, reason: String },
    /// Desync detected.
    DesyncDetected { expected: u64, received: u64 },
}

#[derive(Debug)]
pub struct ServerGame {
    engine: GameEngine,
    rng: GameRng,
    seed: u64,
    checksum: u64,
    turn_manager: TurnManager,
}

impl ServerGame {
    pub fn new(engine: GameEngine, seed: u64) -> Self {
        let checksum = engine.state().checksum().expect("snapshot hash");
        let turn_manager = TurnManager::for_state(engine.state());
        Self {
            engine,
            rng: GameRng::seed_from_u64(seed),
            seed,
            checksum,
            turn_manager,
        }
    }

    pub fn from_config(config: &ServerConfig, seed: u64) -> Result<Self, ConfigError> {
        let rules = config.load_rules()?;
        let state = config.load_state(&rules)?;
        Ok(Self::new(GameEngine::new(rules, state), seed))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the current checksum (for desync detection).
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    pub fn state(&self) -> &GameState {
        self.engine.state()
    }

    pub fn shared_rules(&self) -> Arc<CompiledRules> {
        self.engine.shared_rules()
    }

    pub fn turn_manager(&self) -> &TurnManager {
        &self.turn_manager
    }

    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, WireError> {
        self.engine.state().snapshot_bytes()
    }

    pub fn classify(&self, unit: UnitId, direction: Direction) -> MoveType {
        self.engine.classify(unit, direction)
    }

    /// Apply a list of commands from a player.
    pub fn apply_commands(
        &mut self,
        player: PlayerId,
        mut commands: Vec<Command>,
        end_turn: bool,
        client_checksum: u64,
    ) -> ApplyResult {
        if client_checksum != 0 && client_checksum != self.checksum {
            return ApplyResult::DesyncDetected {
                expected: self.checksum,
                received: client_checksum,
            };
        }

        if !self
            .turn_manager
            .can_act(player, self.engine.state().current_player)
        {
            return ApplyResult::NotYourTurn;
        }

        if end_turn && !matches!(commands.last(), Some(Command::EndTurn)) {
            commands.push(Command::EndTurn);
        }

        // At most one EndTurn, and if present it must be last.
        let mut end_turn_idx: Option<usize> = None;
        for (idx, cmd) in commands.iter().enumerate() {
            if matches!(cmd, Command::EndTurn) {
                if end_turn_idx.is_some() {
                    return ApplyResult::ValidationError {
                        index: idx,
                        reason: "Multiple EndTurn commands".to_string(),
                    };
                }
                end_turn_idx = Some(idx);
            }
        }
        if let Some(idx) = end_turn_idx {
            if idx + 1 != commands.len() {
                return ApplyResult::ValidationError {
                    index: idx,
                    reason: "EndTurn must be the final command in a submission".to_string(),
                };
            }
        }

        let turn_ended = end_turn_idx.is_some();
        let submitted = commands.len();

        // Apply atomically on a scratch clone.
        let mut scratch = self.engine.clone();
        let mut rng = self.rng;
        let mut events: Vec<Event> = Vec::new();

        for (index, command) in commands.into_iter().enumerate() {
            match scratch.apply_command(command, &mut rng) {
                Ok(produced) => events.extend(produced),
                Err(err) => {
                    debug!(?player, index, %err, "command refused");
                    return ApplyResult::ValidationError {
                        index,
                        reason: err.to_string(),
                    };
                }
            }
        }

        if turn_ended {
            self.end_unseated_turns(&mut scratch, &mut rng, &mut events);
        }

        // Commit.
        self.engine = scratch;
        self.rng = rng;
        self.checksum = self.engine.state().checksum().expect("snapshot hash");
        info!(
            ?player,
            commands = submitted,
            events = events.len(),
            checksum = self.checksum,
            "submission applied"
        );

        ApplyResult::Success { events, turn_ended }
    }

    /// Ends turns for players without a seat until a seated player is current.
    fn end_unseated_turns(
        &self,
        engine: &mut GameEngine,
        rng: &mut GameRng,
        events: &mut Vec<Event>,
    ) {
        for _ in 0..engine.state().players.len() {
            let current = engine.state().current_player;
            if !self.turn_manager.should_skip(current) {
                return;
            }
            debug!(?current, "ending unseated turn");
            match engine.apply_command(Command::EndTurn, rng) {
                Ok(produced) => events.extend(produced),
                Err(err) => {
                    warn!(?current, %err, "could not end unseated turn");
                    return;
                }
            }
        }
    }

    /// Answers one client message.
    pub fn handle(&mut self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::RequestState => match self.snapshot_bytes() {
                Ok(snapshot) => ServerMessage::GameState {
                    turn: self.state().turn,
                    current_player: self.state().current_player,
                    checksum: self.checksum,
                    snapshot,
                },
                Err(err) => ServerMessage::Error {
                    message: err.to_string(),
                },
            },
            ClientMessage::QueryMove { unit, direction } => ServerMessage::MoveClassified {
                unit,
                direction,
                move_type: self.classify(unit, direction),
            },
            ClientMessage::TurnSubmission {
                player,
                turn_number,
                commands,
                end_turn,
                state_checksum,
            } => {
                let expected = self.state().turn;
                if turn_number != expected {
                    return ServerMessage::TurnRejected {
                        reason: TurnRejectReason::WrongTurn {
                            expected,
                            received: turn_number,
                        },
                    };
                }
                match self.apply_commands(player, commands, end_turn, state_checksum) {
                    ApplyResult::Success { events, turn_ended } => ServerMessage::TurnAccepted {
                        events,
                        turn_ended,
                        checksum: self.checksum,
                    },
                    ApplyResult::NotYourTurn => ServerMessage::TurnRejected {
                        reason: TurnRejectReason::NotYourTurn,
                    },
                    ApplyResult::ValidationError { index, reason } => {
                        ServerMessage::TurnRejected {
                            reason: TurnRejectReason::InvalidCommand { index, reason },
                        }
                    }
                    ApplyResult::DesyncDetected { expected, received } => {
                        warn!(?player, expected, received, "client desync");
                        ServerMessage::TurnRejected {
                            reason: TurnRejectReason::Desync { expected, received },
                        }
                    }
                }
            }
            ClientMessage::Ping { timestamp } => ServerMessage::Pong { timestamp },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seed: u64) -> ServerGame {
        ServerGame::from_config(&ServerConfig::default(), seed).expect("session")
    }

    #[test]
    fn the_first_european_opens_the_game() {
        let game = session(1);
        assert_eq!(game.state().current_player, PlayerId(0));
        assert!(game.turn_manager().is_seated(PlayerId(0)));
        assert!(game.turn_manager().is_seated(PlayerId(1)));
        assert!(!game.turn_manager().is_seated(PlayerId(2)));
    }

    #[test]
    fn end_turn_must_come_last() {
        let mut game = session(1);
        let before = game.checksum();
        let result = game.apply_commands(
            PlayerId(0),
            vec![Command::EndTurn, Command::DeclareWar { target: PlayerId(1) }],
            false,
            0,
        );
        assert!(matches!(result, ApplyResult::ValidationError { index: 0, .. }));
        assert_eq!(game.checksum(), before);
    }

    #[test]
    fn wrong_turn_number_is_refused() {
        let mut game = session(1);
        let reply = game.handle(ClientMessage::TurnSubmission {
            player: PlayerId(0),
            turn_number: 9,
            commands: Vec::new(),
            end_turn: true,
            state_checksum: 0,
        });
        assert_eq!(
            reply,
            ServerMessage::TurnRejected {
                reason: TurnRejectReason::WrongTurn {
                    expected: 1,
                    received: 9,
                },
            }
        );
    }

    #[test]
    fn ping_is_answered() {
        let mut game = session(1);
        assert_eq!(
            game.handle(ClientMessage::Ping { timestamp: 3 }),
            ServerMessage::Pong { timestamp: 3 }
        );
    }
}
