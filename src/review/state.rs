use std::fmt;

use serde::Serialize;

/// States a single item passes through while being reviewed.
///
/// `CLASSIFY → BYPASS_DONE → DONE` for administrative statements,
/// `CLASSIFY → CALLING → (RETRY_WAIT → CALLING)* → DONE` otherwise. Items
/// skipped before the first call go straight from `CLASSIFY` to `DONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Classify,
    BypassDone,
    Calling,
    RetryWait,
    Done,
}

impl State {
    pub fn can_advance_to(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Classify, State::BypassDone)
                | (State::Classify, State::Calling)
                | (State::Classify, State::Done)
                | (State::BypassDone, State::Done)
                | (State::Calling, State::RetryWait)
                | (State::Calling, State::Done)
                | (State::RetryWait, State::Calling)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == State::Done
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Classify => write!(f, "CLASSIFY"),
            State::BypassDone => write!(f, "BYPASS_DONE"),
            State::Calling => write!(f, "CALLING"),
            State::RetryWait => write!(f, "RETRY_WAIT"),
            State::Done => write!(f, "DONE"),
        }
    }
}

/// The path one item took through [`State`], owned by its worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trail {
    current: State,
    history: Vec<State>,
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

impl Trail {
    pub fn new() -> Self {
        Self {
            current: State::Classify,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> State {
        self.current
    }

    /// States already left, oldest first.
    #[cfg(test)]
    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn advance(&mut self, next: State) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal review transition {} -> {next}",
            self.current
        );
        self.history.push(self.current);
        self.current = next;
    }

    /// Number of times the item entered `CALLING`.
    pub fn round_trips(&self) -> usize {
        self.history
            .iter()
            .chain(std::iter::once(&self.current))
            .filter(|s| **s == State::Calling)
            .count()
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.history {
            write!(f, "{state} -> ")?;
        }
        write!(f, "{}", self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_path() {
        let mut trail = Trail::new();
        trail.advance(State::BypassDone);
        trail.advance(State::Done);

        assert!(trail.current().is_terminal());
        assert_eq!(trail.history(), &[State::Classify, State::BypassDone]);
        assert_eq!(trail.round_trips(), 0);
    }

    #[test]
    fn retried_round_trips_alternate_with_waits() {
        let mut trail = Trail::new();
        for state in [
            State::Calling,
            State::RetryWait,
            State::Calling,
            State::RetryWait,
            State::Calling,
            State::Done,
        ] {
            trail.advance(state);
        }

        assert_eq!(
            trail.to_string(),
            "CLASSIFY -> CALLING -> RETRY_WAIT -> CALLING -> RETRY_WAIT -> CALLING -> DONE"
        );
        assert_eq!(trail.round_trips(), 3);
    }

    #[test]
    fn early_skip_goes_straight_to_done() {
        let mut trail = Trail::new();
        trail.advance(State::Done);
        assert_eq!(trail.to_string(), "CLASSIFY -> DONE");
    }

    #[test]
    fn transition_table() {
        assert!(State::Classify.can_advance_to(State::Calling));
        assert!(State::RetryWait.can_advance_to(State::Calling));
        assert!(!State::BypassDone.can_advance_to(State::Calling));
        assert!(!State::Done.can_advance_to(State::Calling));
        assert!(!State::RetryWait.can_advance_to(State::Done));
    }

    #[test]
    fn state_display() {
        assert_eq!(State::Classify.to_string(), "CLASSIFY");
        assert_eq!(State::BypassDone.to_string(), "BYPASS_DONE");
        assert_eq!(State::RetryWait.to_string(), "RETRY_WAIT");
    }
}
