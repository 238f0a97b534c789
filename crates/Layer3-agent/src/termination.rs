//! Stop conditions checked after every appended message

use crate::message::{ChatMessage, StopReason};
use genie_foundation::config::{DEFAULT_MAX_TURNS, DEFAULT_TERMINATION_PHRASE};

/// Termination phrase plus turn limit
#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    phrase: String,
    max_turns: usize,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATION_PHRASE, DEFAULT_MAX_TURNS)
    }
}

impl TerminationPolicy {
    pub fn new(phrase: impl Into<String>, max_turns: usize) -> Self {
        Self {
            phrase: phrase.into(),
            max_turns,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Decide whether the run stops after `message` was appended
    ///
    /// `turns` counts participant messages so far, including `message`.
    /// Only solver messages can carry the termination phrase; executor
    /// output that happens to print it does not end the run.
    pub fn check(&self, message: &ChatMessage, from_solver: bool, turns: usize) -> Option<StopReason> {
        if from_solver && !self.phrase.is_empty() && message.content.contains(&self.phrase) {
            return Some(StopReason::ExplicitTermination {
                phrase: self.phrase.clone(),
            });
        }

        if turns >= self.max_turns {
            return Some(StopReason::TurnLimit {
                max_turns: self.max_turns,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_is_case_sensitive_substring() {
        let policy = TerminationPolicy::default();
        let msg = ChatMessage::new("solver", "All tests pass.\nTERMINATE");

        assert!(matches!(
            policy.check(&msg, true, 1),
            Some(StopReason::ExplicitTermination { .. })
        ));

        let msg = ChatMessage::new("solver", "terminate when done");
        assert_eq!(policy.check(&msg, true, 1), None);
    }

    #[test]
    fn test_executor_output_does_not_terminate() {
        let policy = TerminationPolicy::default();
        let msg = ChatMessage::new("executor", "TERMINATE\n");
        assert_eq!(policy.check(&msg, false, 2), None);
    }

    #[test]
    fn test_turn_limit() {
        let policy = TerminationPolicy::new("TERMINATE", 3);
        let msg = ChatMessage::new("solver", "thinking");

        assert_eq!(policy.check(&msg, true, 2), None);
        assert_eq!(
            policy.check(&msg, true, 3),
            Some(StopReason::TurnLimit { max_turns: 3 })
        );
    }

    #[test]
    fn test_phrase_wins_over_turn_limit() {
        let policy = TerminationPolicy::new("TERMINATE", 1);
        let msg = ChatMessage::new("solver", "TERMINATE");
        assert!(matches!(
            policy.check(&msg, true, 1),
            Some(StopReason::ExplicitTermination { .. })
        ));
    }
}
