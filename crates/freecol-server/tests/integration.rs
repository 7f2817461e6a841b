//! Session tests: submissions through the message surface, replayed on a client mirror.

use freecol_core::{ClientMirror, GameState};
use freecol_protocol::{Command, Direction, Event, MoveType, PlayerId, Position, UnitId};
use freecol_server::{
    protocol::{serialize_server_message_json, ClientMessage, ServerMessage, TurnRejectReason},
    ServerConfig, ServerGame,
};

const DUTCH: PlayerId = PlayerId(0);
const ENGLISH: PlayerId = PlayerId(1);
const ARAWAK: PlayerId = PlayerId(2);

fn session(seed: u64) -> ServerGame {
    ServerGame::from_config(&ServerConfig::default(), seed).expect("session")
}

fn unit_at(state: &GameState, owner: PlayerId, x: i32, y: i32) -> UnitId {
    let pos = Position::new(x, y);
    state
        .units
        .iter_ordered()
        .find(|(id, unit)| unit.owner == owner && state.unit_position(*id) == Some(pos))
        .map(|(id, _)| id)
        .expect("unit on tile")
}

/// Sends a message through the JSON line encoding the binary uses.
fn ask(game: &mut ServerGame, message: ClientMessage) -> ServerMessage {
    let reply = game.handle(message);
    let line = serialize_server_message_json(&reply).expect("encode reply");
    serde_json::from_str(&line).expect("decode reply")
}

fn mirror_of(game: &mut ServerGame) -> ClientMirror {
    let ServerMessage::GameState {
        snapshot, checksum, ..
    } = ask(game, ClientMessage::RequestState)
    else {
        panic!("expected state");
    };
    let mirror = ClientMirror::from_snapshot(game.shared_rules(), &snapshot).expect("mirror");
    assert_eq!(mirror.checksum().expect("checksum"), checksum);
    mirror
}

fn accepted(reply: ServerMessage) -> (Vec<Event>, u64) {
    match reply {
        ServerMessage::TurnAccepted {
            events, checksum, ..
        } => (events, checksum),
        other => panic!("submission refused: {other:?}"),
    }
}

/// War on the tribe, then the dragoon rides out and attacks the mounted brave.
fn raid(dragoon: UnitId) -> Vec<Command> {
    vec![
        Command::DeclareWar { target: ARAWAK },
        Command::MoveUnit {
            unit: dragoon,
            direction: Direction::E,
        },
        Command::MoveUnit {
            unit: dragoon,
            direction: Direction::Se,
        },
        Command::MoveUnit {
            unit: dragoon,
            direction: Direction::E,
        },
    ]
}

#[test]
fn mirror_tracks_the_server_through_combat() {
    let mut game = session(1492);
    let mut mirror = mirror_of(&mut game);
    let dragoon = unit_at(game.state(), DUTCH, 7, 4);

    let reply = ask(
        &mut game,
        ClientMessage::TurnSubmission {
            player: DUTCH,
            turn_number: 1,
            commands: raid(dragoon),
            end_turn: false,
            state_checksum: mirror.checksum().expect("checksum"),
        },
    );
    let (events, checksum) = accepted(reply);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::CombatResolved { attacker, .. } if *attacker == dragoon)));

    mirror.apply_events(&events);
    assert_eq!(mirror.checksum().expect("checksum"), checksum);
    assert_eq!(mirror.state(), game.state());
}

#[test]
fn speculative_classification_agrees_with_the_server() {
    let mut game = session(3);
    let mirror = mirror_of(&mut game);
    let dragoon = unit_at(game.state(), DUTCH, 7, 4);

    let reply = ask(
        &mut game,
        ClientMessage::QueryMove {
            unit: dragoon,
            direction: Direction::E,
        },
    );
    assert_eq!(
        reply,
        ServerMessage::MoveClassified {
            unit: dragoon,
            direction: Direction::E,
            move_type: mirror.classify(dragoon, Direction::E),
        }
    );
    assert_eq!(mirror.classify(dragoon, Direction::E), MoveType::Move);
}

#[test]
fn same_seed_same_outcome() {
    let mut a = session(77);
    let mut b = session(77);
    let dragoon = unit_at(a.state(), DUTCH, 7, 4);

    let submit = |game: &mut ServerGame| {
        accepted(game.handle(ClientMessage::TurnSubmission {
            player: DUTCH,
            turn_number: 1,
            commands: raid(dragoon),
            end_turn: true,
            state_checksum: 0,
        }))
    };
    let (events_a, checksum_a) = submit(&mut a);
    let (events_b, checksum_b) = submit(&mut b);

    assert_eq!(events_a, events_b);
    assert_eq!(checksum_a, checksum_b);
}

#[test]
fn desync_is_reported_and_nothing_applies() {
    let mut game = session(5);
    let before = game.checksum();
    let dragoon = unit_at(game.state(), DUTCH, 7, 4);

    let reply = ask(
        &mut game,
        ClientMessage::TurnSubmission {
            player: DUTCH,
            turn_number: 1,
            commands: vec![Command::Fortify { unit: dragoon }],
            end_turn: false,
            state_checksum: before ^ 1,
        },
    );
    assert_eq!(
        reply,
        ServerMessage::TurnRejected {
            reason: TurnRejectReason::Desync {
                expected: before,
                received: before ^ 1,
            },
        }
    );
    assert_eq!(game.checksum(), before);
}

#[test]
fn only_the_current_seated_player_may_submit() {
    let mut game = session(5);
    for player in [ENGLISH, ARAWAK] {
        let reply = ask(
            &mut game,
            ClientMessage::TurnSubmission {
                player,
                turn_number: 1,
                commands: Vec::new(),
                end_turn: true,
                state_checksum: 0,
            },
        );
        assert_eq!(
            reply,
            ServerMessage::TurnRejected {
                reason: TurnRejectReason::NotYourTurn,
            }
        );
    }
    assert_eq!(game.state().current_player, DUTCH);
}

#[test]
fn a_failed_command_rolls_back_the_whole_submission() {
    let mut game = session(5);
    let before = game.checksum();
    let dragoon = unit_at(game.state(), DUTCH, 7, 4);

    let reply = ask(
        &mut game,
        ClientMessage::TurnSubmission {
            player: DUTCH,
            turn_number: 1,
            commands: vec![
                Command::MoveUnit {
                    unit: dragoon,
                    direction: Direction::E,
                },
                Command::MakePeace { target: DUTCH },
            ],
            end_turn: false,
            state_checksum: 0,
        },
    );
    let ServerMessage::TurnRejected {
        reason: TurnRejectReason::InvalidCommand { index, .. },
    } = reply
    else {
        panic!("expected a refused command, got {reply:?}");
    };
    assert_eq!(index, 1);
    assert_eq!(game.checksum(), before);
    assert_eq!(game.state().unit_position(dragoon), Some(Position::new(7, 4)));
}

#[test]
fn closing_the_round_ends_the_tribe_turn() {
    let mut game = session(9);
    let mut mirror = mirror_of(&mut game);

    for player in [DUTCH, ENGLISH] {
        let (events, checksum) = accepted(ask(
            &mut game,
            ClientMessage::TurnSubmission {
                player,
                turn_number: 1,
                commands: Vec::new(),
                end_turn: true,
                state_checksum: mirror.checksum().expect("checksum"),
            },
        ));
        mirror.apply_events(&events);
        assert_eq!(mirror.checksum().expect("checksum"), checksum);
        if player == ENGLISH {
            let starts: Vec<_> = events
                .iter()
                .filter(|e| matches!(e, Event::TurnStarted { .. }))
                .collect();
            assert_eq!(
                starts,
                vec![
                    &Event::TurnStarted {
                        turn: 1,
                        player: ARAWAK,
                    },
                    &Event::TurnStarted {
                        turn: 2,
                        player: DUTCH,
                    },
                ]
            );
        }
    }

    assert_eq!(game.state().turn, 2);
    assert_eq!(game.state().current_player, DUTCH);
}
