use hintline_catalog::{Catalog, PuzzleKey};

/// Per-conversation hint cursor. `Idle` until the first validated match;
/// "exhausted" is a sub-state of `Tracking`, never terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HintTracker {
    #[default]
    Idle,
    Tracking {
        key: PuzzleKey,
        hints_revealed: usize,
    },
}

/// What one turn did to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The first unseen hint was revealed; `index` is 0-based.
    Revealed {
        key: PuzzleKey,
        index: usize,
        hint: String,
        remaining: usize,
    },
    /// Every hint for the tracked puzzle has already been shown.
    Exhausted { key: PuzzleKey, total: usize },
    /// The tracker switched to (or landed on) a puzzle without revealing.
    Matched { key: PuzzleKey },
    /// Nothing changed.
    Quiet,
}

impl HintTracker {
    pub fn tracked_key(&self) -> Option<&PuzzleKey> {
        match self {
            Self::Idle => None,
            Self::Tracking { key, .. } => Some(key),
        }
    }

    pub fn hints_revealed(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Tracking { hints_revealed, .. } => *hints_revealed,
        }
    }

    /// Applies one turn.
    ///
    /// `matched` must already be validated against `catalog` by the caller; a
    /// key the catalog cannot resolve must be collapsed to `None` before it
    /// gets here. Rules, in order:
    ///
    /// 1. A match that differs from the tracked key (or arrives while idle)
    ///    switches tracking and resets the cursor to 0, help flag or not.
    /// 2. With a tracked puzzle and a help request, reveal the hint at the
    ///    cursor and advance it; at the end of the hints, report exhaustion
    ///    and leave the cursor alone.
    /// 3. Anything else leaves the tracker untouched.
    pub fn advance(
        &mut self,
        catalog: &Catalog,
        matched: Option<&PuzzleKey>,
        is_help_request: bool,
    ) -> TurnOutcome {
        let mut switched = false;
        if let Some(key) = matched
            && self.tracked_key() != Some(key)
        {
            *self = Self::Tracking {
                key: key.clone(),
                hints_revealed: 0,
            };
            switched = true;
        }

        let Self::Tracking {
            key,
            hints_revealed,
        } = self
        else {
            return TurnOutcome::Quiet;
        };

        if !is_help_request {
            return if switched {
                TurnOutcome::Matched { key: key.clone() }
            } else {
                TurnOutcome::Quiet
            };
        }

        let Some(record) = catalog.lookup(key) else {
            // Tracked keys come from validated matches, so this only fires if
            // the catalog and tracker ever disagree about what exists.
            tracing::warn!(puzzle = %key, "tracked puzzle is missing from the catalog");
            *self = Self::Idle;
            return TurnOutcome::Quiet;
        };

        let total = record.hints().len();
        if *hints_revealed < total {
            let index = *hints_revealed;
            let hint = record.hints()[index].clone();
            *hints_revealed += 1;
            TurnOutcome::Revealed {
                key: key.clone(),
                index,
                hint,
                remaining: total - index - 1,
            }
        } else {
            TurnOutcome::Exhausted {
                key: key.clone(),
                total,
            }
        }
    }
}
