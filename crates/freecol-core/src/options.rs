use serde::{Deserialize, Serialize};

/// Per-game rule switches. Shipped to clients with the snapshot so speculative
/// classification uses the same policy as the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Land units may attack straight off a carrier.
    pub amphibious_moves: bool,
    /// Carriers may open a trade session at native settlements without cargo.
    pub empty_traders: bool,
    /// Native tension at which the tribe declares war on the offending player.
    pub tension_war_threshold: i32,
    /// Natives pick up muskets and horses from units they defeat.
    pub equipment_capture: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            amphibious_moves: false,
            empty_traders: false,
            tension_war_threshold: 1000,
            equipment_capture: true,
        }
    }
}
