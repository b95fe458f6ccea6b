use std::sync::Arc;

use hintline_catalog::{Catalog, PuzzleKey};
use hintline_llm::CompletionProvider;

use crate::classifier::HelpClassifier;
use crate::matcher;
use crate::session::SessionMap;
use crate::state::{ConversationState, PROMPT_HISTORY_EXCHANGES};
use crate::tracker::TurnOutcome;

pub const REPHRASE_RESPONSE: &str =
    "Sorry, I couldn't match your query to a puzzle. Please try rephrasing.";
pub const GENERAL_CHAT_RESPONSE: &str = "I'm here to help with your escape room puzzles!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResponse {
    pub text: String,
    /// 0-based index of the hint revealed this turn, if any.
    pub hint_index: Option<usize>,
}

/// Composes the query matcher and the hint tracker behind the single call
/// every front-end adapter makes. All collaborators are injected once at
/// startup; there are no ambient globals.
pub struct Engine {
    catalog: Arc<Catalog>,
    provider: Arc<dyn CompletionProvider>,
    classifier: Arc<dyn HelpClassifier>,
    persona: Option<String>,
    sessions: SessionMap,
}

impl Engine {
    pub fn new(
        catalog: Arc<Catalog>,
        provider: Arc<dyn CompletionProvider>,
        classifier: Arc<dyn HelpClassifier>,
    ) -> Self {
        Self {
            catalog,
            provider,
            classifier,
            persona: None,
            sessions: SessionMap::new(),
        }
    }

    /// Optional persona preamble sent with every model call.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        let persona = persona.into();
        if !persona.trim().is_empty() {
            self.persona = Some(persona);
        }
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// One user turn: classify, match, drive the tracker, render, log the
    /// exchange. Per-turn failures never escape as errors — the worst case
    /// is an apology string.
    pub async fn process_turn(&self, session_id: &str, user_text: &str) -> TurnResponse {
        let mut state = self.sessions.load(session_id).await;

        let is_help_request = self.classifier.is_help_request(user_text);
        let reply = matcher::match_puzzle(
            self.provider.as_ref(),
            &self.catalog,
            user_text,
            state.recent_history(PROMPT_HISTORY_EXCHANGES),
            self.persona.as_deref(),
        )
        .await;

        let matched_key = self.validate_match(reply.puzzle);
        let outcome = state
            .tracker
            .advance(&self.catalog, matched_key.as_ref(), is_help_request);

        let hint_index = match &outcome {
            TurnOutcome::Revealed { index, .. } => Some(*index),
            _ => None,
        };
        let text = render_outcome(&self.catalog, outcome, is_help_request, reply.chat_response);

        state.push_exchange(user_text, text.clone());
        self.sessions.store(session_id, state).await;

        tracing::debug!(
            session_id,
            is_help_request,
            hint_index = ?hint_index,
            "processed turn"
        );

        TurnResponse { text, hint_index }
    }

    /// Drops one session's state entirely; the next turn starts fresh.
    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id).await;
    }

    /// Snapshot of one session's state, default when the session is unknown.
    pub async fn session_state(&self, session_id: &str) -> ConversationState {
        self.sessions.load(session_id).await
    }

    /// A model-returned pair the catalog cannot resolve is indistinguishable
    /// from no match by the time the tracker runs.
    fn validate_match(&self, matched: Option<PuzzleKey>) -> Option<PuzzleKey> {
        let key = matched?;
        if self.catalog.lookup(&key).is_none() {
            tracing::warn!(puzzle = %key, "model returned a pair the catalog cannot resolve");
            return None;
        }
        Some(key)
    }
}

fn render_outcome(
    catalog: &Catalog,
    outcome: TurnOutcome,
    is_help_request: bool,
    chat_response: Option<String>,
) -> String {
    match outcome {
        TurnOutcome::Revealed {
            key,
            index,
            hint,
            remaining,
        } => {
            let mut text = format!("Here's hint {} for {}: {}", index + 1, key.puzzle_name, hint);
            if remaining > 0 {
                text.push_str(" Need another hint? Just ask!");
            } else {
                text.push_str(" That's all the hints I have for this puzzle!");
            }
            text
        }
        TurnOutcome::Exhausted { key, total } => format!(
            "I've already given you all {total} hints for {}. Try working through them step by step!",
            key.puzzle_name
        ),
        TurnOutcome::Matched { key } => chat_response.unwrap_or_else(|| {
            match catalog.lookup(&key).and_then(|record| record.description()) {
                Some(description) => format!(
                    "You're working on the {} in {}. {}",
                    key.puzzle_name, key.room, description
                ),
                None => format!("You're working on the {} in {}.", key.puzzle_name, key.room),
            }
        }),
        TurnOutcome::Quiet => chat_response.unwrap_or_else(|| {
            if is_help_request {
                REPHRASE_RESPONSE.to_string()
            } else {
                GENERAL_CHAT_RESPONSE.to_string()
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use hintline_catalog::PuzzleRecord;
    use hintline_llm::{BoxFuture, CompletionRequest, ProviderError, ProviderResult};

    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::tracker::HintTracker;

    enum ScriptedReply {
        Text(&'static str),
        Fail,
    }

    /// Provider stub that plays back a fixed script of replies.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<ScriptedReply>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }

        fn complete<'a>(
            &'a self,
            _request: CompletionRequest,
        ) -> BoxFuture<'a, ProviderResult<String>> {
            let next = self
                .replies
                .lock()
                .expect("script lock")
                .pop_front()
                .expect("script exhausted");
            Box::pin(async move {
                match next {
                    ScriptedReply::Text(text) => Ok(text.to_string()),
                    ScriptedReply::Fail => Err(ProviderError::EmptyCompletion {
                        stage: "scripted-failure",
                        model_id: "scripted-model".to_string(),
                    }),
                }
            })
        }
    }

    const MUSHROOM_MATCH: &str = "{\"puzzle_match\": true, \"room\": \"Room 2\", \
                                  \"puzzle_name\": \"Mushroom Lock\", \"response\": \"Let's see.\"}";
    const CHART_MATCH: &str = "{\"puzzle_match\": true, \"room\": \"Room 1\", \
                               \"puzzle_name\": \"Star Chart\", \"response\": \"Switching over.\"}";

    fn test_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_records(vec![
                PuzzleRecord::new(
                    PuzzleKey::new("Room 2", "Mushroom Lock"),
                    None,
                    vec![
                        "Look under the moss".to_string(),
                        "Count the spots".to_string(),
                        "3-2-4".to_string(),
                    ],
                ),
                PuzzleRecord::new(
                    PuzzleKey::new("Room 1", "Star Chart"),
                    Some("A wall of constellations".to_string()),
                    vec!["Find Orion".to_string()],
                ),
            ])
            .expect("build catalog"),
        )
    }

    fn engine_with_script(replies: Vec<ScriptedReply>) -> Engine {
        Engine::new(
            test_catalog(),
            ScriptedProvider::new(replies),
            Arc::new(KeywordClassifier::with_default_keywords()),
        )
    }

    #[tokio::test]
    async fn hints_progress_in_order_then_exhaust_idempotently() {
        let engine = engine_with_script(vec![
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
        ]);

        let first = engine.process_turn("s1", "help with the mushroom lock").await;
        assert_eq!(first.hint_index, Some(0));
        assert!(first.text.contains("Here's hint 1 for Mushroom Lock: Look under the moss"));
        assert!(first.text.contains("Need another hint?"));

        let second = engine.process_turn("s1", "another hint please").await;
        assert_eq!(second.hint_index, Some(1));
        assert!(second.text.contains("Count the spots"));

        let third = engine.process_turn("s1", "hint").await;
        assert_eq!(third.hint_index, Some(2));
        assert!(third.text.contains("3-2-4"));
        assert!(third.text.contains("That's all the hints I have for this puzzle!"));

        for _ in 0..2 {
            let exhausted = engine.process_turn("s1", "one more hint").await;
            assert_eq!(exhausted.hint_index, None);
            assert!(exhausted.text.contains("all 3 hints for Mushroom Lock"));
        }

        let state = engine.session_state("s1").await;
        assert_eq!(state.tracker.hints_revealed(), 3);
    }

    #[tokio::test]
    async fn switching_puzzles_resets_progress_even_without_help() {
        let engine = engine_with_script(vec![
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(CHART_MATCH),
        ]);

        engine.process_turn("s1", "hint for the mushrooms").await;
        assert_eq!(engine.session_state("s1").await.tracker.hints_revealed(), 1);

        // "moved on to" carries no help keyword; the switch still resets.
        let response = engine.process_turn("s1", "we moved on to the star wall").await;
        assert_eq!(response.hint_index, None);
        assert_eq!(response.text, "Switching over.");

        let state = engine.session_state("s1").await;
        assert_eq!(
            state.tracker.tracked_key(),
            Some(&PuzzleKey::new("Room 1", "Star Chart"))
        );
        assert_eq!(state.tracker.hints_revealed(), 0);
    }

    #[tokio::test]
    async fn unparseable_reply_asks_for_a_rephrase_and_keeps_the_tracker_idle() {
        let engine = engine_with_script(vec![ScriptedReply::Text("no json here, sorry")]);

        let response = engine.process_turn("s1", "help me with the thing").await;
        assert_eq!(response.hint_index, None);
        assert_eq!(response.text, REPHRASE_RESPONSE);

        let state = engine.session_state("s1").await;
        assert_eq!(state.tracker, HintTracker::Idle);
        // The exchange is still logged; history is a conversation log, not
        // tracker state.
        assert_eq!(state.history().len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_recovered_as_a_rephrase() {
        let engine = engine_with_script(vec![ScriptedReply::Fail]);

        let response = engine.process_turn("s1", "hint please").await;
        assert_eq!(response.text, REPHRASE_RESPONSE);
        assert_eq!(engine.session_state("s1").await.tracker, HintTracker::Idle);
    }

    #[tokio::test]
    async fn hallucinated_pair_is_treated_as_no_match() {
        let engine = engine_with_script(vec![ScriptedReply::Text(
            "{\"puzzle_match\": true, \"room\": \"Room 9\", \"puzzle_name\": \"Ghost Puzzle\"}",
        )]);

        let response = engine.process_turn("s1", "help with the ghost puzzle").await;
        assert_eq!(response.hint_index, None);
        assert_eq!(response.text, REPHRASE_RESPONSE);
        assert_eq!(engine.session_state("s1").await.tracker, HintTracker::Idle);
    }

    #[tokio::test]
    async fn general_chat_passes_the_model_response_through() {
        let engine = engine_with_script(vec![ScriptedReply::Text(
            "{\"puzzle_match\": false, \"response\": \"You're doing great, keep going!\"}",
        )]);

        let response = engine.process_turn("s1", "this room is spooky").await;
        assert_eq!(response.hint_index, None);
        assert_eq!(response.text, "You're doing great, keep going!");
        assert_eq!(engine.session_state("s1").await.tracker, HintTracker::Idle);
    }

    #[tokio::test]
    async fn sessions_progress_independently() {
        let engine = engine_with_script(vec![
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
        ]);

        engine.process_turn("alpha", "hint for the mushrooms").await;
        engine.process_turn("alpha", "hint again").await;
        let beta = engine.process_turn("beta", "help with the mushroom lock").await;

        assert_eq!(beta.hint_index, Some(0));
        assert_eq!(engine.session_state("alpha").await.tracker.hints_revealed(), 2);
        assert_eq!(engine.session_state("beta").await.tracker.hints_revealed(), 1);
    }

    #[tokio::test]
    async fn clearing_a_session_starts_it_over() {
        let engine = engine_with_script(vec![
            ScriptedReply::Text(MUSHROOM_MATCH),
            ScriptedReply::Text(MUSHROOM_MATCH),
        ]);

        engine.process_turn("s1", "hint for the mushrooms").await;
        engine.clear_session("s1").await;

        let response = engine.process_turn("s1", "hint for the mushrooms").await;
        assert_eq!(response.hint_index, Some(0));
    }

    #[tokio::test]
    async fn matched_without_help_and_without_model_reply_names_the_puzzle() {
        let engine = engine_with_script(vec![ScriptedReply::Text(
            "{\"puzzle_match\": true, \"room\": \"Room 1\", \"puzzle_name\": \"Star Chart\"}",
        )]);

        let response = engine.process_turn("s1", "we're over by the star thing now").await;
        assert_eq!(
            response.text,
            "You're working on the Star Chart in Room 1. A wall of constellations"
        );
    }
}
