use std::io::{BufRead, Write};

use hintline_engine::Engine;
use snafu::ResultExt;
use tokio::runtime::Runtime;

use crate::error::{AppResult, ReadInputSnafu, WriteOutputSnafu};

const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "stop"];

/// Interactive chat loop: one stdin line per turn, one generated session for
/// the whole run.
pub fn run(runtime: &Runtime, engine: &Engine) -> AppResult<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        %session_id,
        puzzle_count = engine.catalog().len(),
        "chat session started"
    );

    println!("EscapeRoom assistant ready!");
    println!("Try something like: \"I'm stuck on the mushroom puzzle in room 2\"");
    println!("Say 'quit' or 'exit' to stop.");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("> ");
        stdout.flush().context(WriteOutputSnafu {
            stage: "flush-chat-prompt",
        })?;

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line).context(ReadInputSnafu {
            stage: "read-chat-line",
        })?;
        if bytes_read == 0 {
            break;
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&text.to_lowercase().as_str()) {
            println!("Goodbye! Good luck with your escape room!");
            break;
        }

        let response = runtime.block_on(engine.process_turn(&session_id, text));
        println!("{}", response.text);
    }

    Ok(())
}
