use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::state::ConversationState;

/// In-memory session store keyed by an opaque session identifier. States are
/// cloned out and written back whole; the engine assumes at most one
/// in-flight turn per session, while independent sessions run in parallel
/// freely.
#[derive(Default)]
pub struct SessionMap {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creation-on-first-use: unknown ids read as a default state.
    pub async fn load(&self, session_id: &str) -> ConversationState {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    pub async fn store(&self, session_id: &str, state: ConversationState) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), state);
    }

    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }
}
