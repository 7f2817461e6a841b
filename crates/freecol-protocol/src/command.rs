use serde::{Deserialize, Serialize};

use crate::{Direction, PlayerId, UnitId};

/// All possible client→sim commands. Fully serializable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    // Unit commands
    MoveUnit { unit: UnitId, direction: Direction },
    Fortify { unit: UnitId },
    Sentry { unit: UnitId },
    Activate { unit: UnitId },

    // Diplomacy
    DeclareWar { target: PlayerId },
    MakePeace { target: PlayerId },

    EndTurn,
}
