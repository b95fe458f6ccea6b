use std::io::BufRead;

use hintline_engine::Engine;
use snafu::ResultExt;
use tokio::runtime::Runtime;

use crate::error::{AppResult, ReadInputSnafu};
use crate::wake::{self, WakeGate};

/// Background-service mode: consumes already-transcribed speech, one line per
/// utterance, and only engages after a wake phrase. The line after activation
/// is taken as the puzzle query.
pub fn run(runtime: &Runtime, engine: &Engine, gate: &WakeGate) -> AppResult<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(%session_id, "listener started; waiting for a wake phrase");
    println!("Say 'escape room' or 'puzzle help' to activate, then describe your puzzle.");

    let stdin = std::io::stdin();
    let mut awaiting_query = false;

    for line in stdin.lock().lines() {
        let line = line.context(ReadInputSnafu {
            stage: "read-transcript-line",
        })?;
        let transcript = line.trim();
        if transcript.is_empty() {
            continue;
        }

        if wake::is_shutdown_command(transcript) {
            tracing::info!("shutdown command received");
            break;
        }

        if awaiting_query {
            awaiting_query = false;
            tracing::info!(query = transcript, "query received");
            let response = runtime.block_on(engine.process_turn(&session_id, transcript));
            println!("{}", response.text);
            continue;
        }

        if gate.matches(transcript) {
            tracing::info!(transcript, "wake phrase detected");
            println!("Assistant activated! Describe your puzzle problem...");
            awaiting_query = true;
        } else {
            tracing::debug!(transcript, "no wake phrase; ignoring");
        }
    }

    tracing::info!("listener stopped");
    Ok(())
}
