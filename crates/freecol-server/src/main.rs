//! Rules session over JSON lines.
//!
//! Reads one `ClientMessage` per line from stdin and writes one `ServerMessage` per line
//! to stdout. Logs go to stderr. An optional first argument names a YAML config file.

use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use freecol_server::{
    protocol::{deserialize_client_message_json, serialize_server_message_json, ServerMessage},
    ServerConfig, ServerGame,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, "session seed");

    let mut game = ServerGame::from_config(&config, seed)?;
    info!(
        turn = game.state().turn,
        players = game.state().players.len(),
        checksum = game.checksum(),
        "session ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match deserialize_client_message_json(&line) {
            Ok(message) => game.handle(message),
            Err(err) => {
                warn!(%err, "malformed message");
                ServerMessage::Error {
                    message: err.to_string(),
                }
            }
        };
        writeln!(stdout, "{}", serialize_server_message_json(&reply)?)?;
        stdout.flush()?;
    }

    info!(turn = game.state().turn, "input closed");
    Ok(())
}
