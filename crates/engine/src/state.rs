use crate::tracker::HintTracker;

/// Hard cap on retained exchanges; insertion is append + truncate-from-front.
pub const HISTORY_CAPACITY: usize = 10;

/// How many of the most recent exchanges the matcher folds into its prompt.
pub const PROMPT_HISTORY_EXCHANGES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Everything remembered about one conversation: the hint tracker plus a
/// bounded chronological exchange log. Created on first interaction, gone
/// with the process.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub tracker: HintTracker,
    history: Vec<Exchange>,
}

impl ConversationState {
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.history.push(Exchange::new(user, assistant));
        if self.history.len() > HISTORY_CAPACITY {
            let overflow = self.history.len() - HISTORY_CAPACITY;
            self.history.drain(..overflow);
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    /// The last `limit` exchanges, oldest first.
    pub fn recent_history(&self, limit: usize) -> &[Exchange] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_never_exceeds_capacity_and_evicts_oldest_first() {
        let mut state = ConversationState::default();
        for turn in 0..15 {
            state.push_exchange(format!("user-{turn}"), format!("assistant-{turn}"));
        }

        assert_eq!(state.history().len(), HISTORY_CAPACITY);
        assert_eq!(state.history()[0].user, "user-5");
        assert_eq!(state.history()[HISTORY_CAPACITY - 1].user, "user-14");
    }

    #[test]
    fn recent_history_returns_the_tail_in_order() {
        let mut state = ConversationState::default();
        for turn in 0..8 {
            state.push_exchange(format!("user-{turn}"), format!("assistant-{turn}"));
        }

        let recent = state.recent_history(PROMPT_HISTORY_EXCHANGES);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].user, "user-3");
        assert_eq!(recent[4].user, "user-7");

        let all = state.recent_history(100);
        assert_eq!(all.len(), 8);
    }
}
