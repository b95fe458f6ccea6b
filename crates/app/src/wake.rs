/// Wake phrases that activate the listener.
pub const DEFAULT_WAKE_PHRASES: [&str; 4] =
    ["escape room", "puzzle help", "ai assistant", "help me"];

const SHUTDOWN_COMMANDS: [&str; 2] = ["shutdown assistant", "stop service"];

/// Case-insensitive containment gate over transcribed lines. Speech capture
/// itself happens upstream; this only decides whether a transcript wakes the
/// assistant.
pub struct WakeGate {
    phrases: Vec<String>,
}

impl WakeGate {
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        let phrases = phrases
            .into_iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn with_default_phrases() -> Self {
        Self::new(DEFAULT_WAKE_PHRASES.iter().map(|phrase| phrase.to_string()))
    }

    pub fn matches(&self, transcript: &str) -> bool {
        let lowered = transcript.to_lowercase();
        self.phrases.iter().any(|phrase| lowered.contains(phrase))
    }
}

pub fn is_shutdown_command(transcript: &str) -> bool {
    let lowered = transcript.to_lowercase();
    SHUTDOWN_COMMANDS
        .iter()
        .any(|command| lowered.contains(command))
}
