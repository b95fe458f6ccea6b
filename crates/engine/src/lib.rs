mod classifier;
mod engine;
mod matcher;
mod session;
mod state;
mod tracker;

pub use classifier::{DEFAULT_HELP_KEYWORDS, HelpClassifier, KeywordClassifier};
pub use engine::{Engine, GENERAL_CHAT_RESPONSE, REPHRASE_RESPONSE, TurnResponse};
pub use matcher::{MatchReply, match_puzzle};
pub use session::SessionMap;
pub use state::{ConversationState, Exchange, HISTORY_CAPACITY, PROMPT_HISTORY_EXCHANGES};
pub use tracker::{HintTracker, TurnOutcome};
