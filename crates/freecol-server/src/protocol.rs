//! Session messages.
//!
//! Wraps the shared command and event vocabulary in ask/reply envelopes.

use serde::{Deserialize, Serialize};

use freecol_protocol::wire::WireError;
use freecol_protocol::{Command, Direction, Event, MoveType, PlayerId, UnitId};

/// Client-to-server messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Request the full state (initial sync and resync after a desync)
    RequestState,
    /// Ask how a unit's step would be classified, without moving it
    QueryMove { unit: UnitId, direction: Direction },
    /// Submit turn commands
    TurnSubmission {
        player: PlayerId,
        turn_number: u32,
        commands: Vec<Command>,
        end_turn: bool,
        /// Client's mirror checksum; 0 skips the desync check
        state_checksum: u64,
    },
    /// Ping for latency measurement
    Ping { timestamp: u64 },
}

/// Server-to-client messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full state as MessagePack bytes, loadable into a client mirror
    GameState {
        turn: u32,
        current_player: PlayerId,
        checksum: u64,
        snapshot: Vec<u8>,
    },
    MoveClassified {
        unit: UnitId,
        direction: Direction,
        move_type: MoveType,
    },
    /// Submission applied; events are in application order
    TurnAccepted {
        events: Vec<Event>,
        turn_ended: bool,
        checksum: u64,
    },
    /// Submission refused; nothing was applied
    TurnRejected { reason: TurnRejectReason },
    /// Pong response
    Pong { timestamp: u64 },
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TurnRejectReason {
    NotYourTurn,
    WrongTurn { expected: u32, received: u32 },
    InvalidCommand { index: usize, reason: String },
    Desync { expected: u64, received: u64 },
}

pub fn serialize_client_message(msg: &ClientMessage) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

pub fn deserialize_client_message(data: &[u8]) -> Result<ClientMessage, WireError> {
    Ok(rmp_serde::from_slice(data)?)
}

pub fn serialize_server_message(msg: &ServerMessage) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

pub fn deserialize_server_message(data: &[u8]) -> Result<ServerMessage, WireError> {
    Ok(rmp_serde::from_slice(data)?)
}

pub fn serialize_server_message_json(msg: &ServerMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn deserialize_client_message_json(line: &str) -> Result<ClientMessage, WireError> {
    Ok(serde_json::from_str(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freecol_protocol::EntityId;

    #[test]
    fn roundtrip_client_message() {
        let msg = ClientMessage::TurnSubmission {
            player: PlayerId(1),
            turn_number: 4,
            commands: vec![Command::MoveUnit {
                unit: EntityId::new(2, 0),
                direction: Direction::Sw,
            }],
            end_turn: true,
            state_checksum: 0xfeed,
        };
        let bytes = serialize_client_message(&msg).expect("encode");
        assert_eq!(deserialize_client_message(&bytes).expect("decode"), msg);
    }

    #[test]
    fn roundtrip_server_message() {
        let msg = ServerMessage::TurnRejected {
            reason: TurnRejectReason::InvalidCommand {
                index: 2,
                reason: "unknown unit".to_string(),
            },
        };
        let bytes = serialize_server_message(&msg).expect("encode");
        assert_eq!(deserialize_server_message(&bytes).expect("decode"), msg);
    }

    #[test]
    fn json_lines_are_tagged() {
        let msg = deserialize_client_message_json(r#"{"type":"Ping","timestamp":7}"#)
            .expect("ping");
        assert_eq!(msg, ClientMessage::Ping { timestamp: 7 });
        let reply = serialize_server_message_json(&ServerMessage::Pong { timestamp: 7 })
            .expect("pong");
        assert_eq!(reply, r#"{"type":"Pong","timestamp":7}"#);
    }
}
