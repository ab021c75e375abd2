//! The question gate: single source of truth for "what are we waiting for".
//!
//! The gate guarantees at most one outstanding question per session,
//! consumes each answer exactly once, and suppresses asking the same
//! question key on two consecutive turns.

use crate::answer::{self, ExpectedKind, ParsedAnswer};
use crate::domain::Domain;
use serde::{Deserialize, Serialize};

/// Descriptor of the single outstanding question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedInput {
    pub kind: ExpectedKind,
    pub domain: Domain,
    /// Stable question identifier, also used for anti-repeat.
    pub key: String,
    /// The prompt as asked, kept so clarifications can restate it.
    pub prompt: String,
}

/// Per-session question state. Embedded in the session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionGate {
    /// The one question we are waiting on, if any.
    pub expected_input: Option<ExpectedInput>,
    /// Key of the most recently asked question.
    pub last_question_key: Option<String>,
    /// Failed parse attempts against the current question.
    #[serde(default)]
    pub clarify_retries: u8,
}

impl QuestionGate {
    /// True while an answer is outstanding.
    pub fn awaiting(&self) -> bool {
        self.expected_input.is_some()
    }

    /// Records a new pending question.
    ///
    /// Any previously pending question is replaced; callers reach this only
    /// through the priority stack, which decides when replacing is allowed.
    pub fn expect(&mut self, kind: ExpectedKind, domain: Domain, key: &str, prompt: &str) {
        if let Some(previous) = &self.expected_input {
            tracing::debug!(
                old = %previous.key,
                new = %key,
                "replacing pending question"
            );
        }
        self.expected_input = Some(ExpectedInput {
            kind,
            domain,
            key: key.to_string(),
            prompt: prompt.to_string(),
        });
        self.clarify_retries = 0;
    }

    /// Attempts to consume `message` as the answer to the pending question.
    ///
    /// On success the pending slot is cleared and the parsed answer is
    /// returned together with the question it answers; the caller locks the
    /// derived fact. On failure the question stays outstanding and the
    /// retry counter advances.
    pub fn consume(&mut self, message: &str) -> Option<(ExpectedInput, ParsedAnswer)> {
        let kind = self.expected_input.as_ref()?.kind;
        match answer::parse_answer(kind, message) {
            Some(parsed) => {
                let expected = self.expected_input.take()?;
                self.clarify_retries = 0;
                Some((expected, parsed))
            }
            None => {
                self.clarify_retries = self.clarify_retries.saturating_add(1);
                None
            }
        }
    }

    /// Anti-repeat check: false when `key` was the question asked on the
    /// immediately preceding turn.
    pub fn should_ask(&self, key: &str) -> bool {
        self.last_question_key.as_deref() != Some(key)
    }

    /// Records that `key` was just asked.
    pub fn mark_asked(&mut self, key: &str) {
        self.last_question_key = Some(key.to_string());
    }

    /// Drops all question state (reset operation).
    pub fn clear(&mut self) {
        self.expected_input = None;
        self.last_question_key = None;
        self.clarify_retries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::LoadCondition;

    fn gate_with_load_question() -> QuestionGate {
        let mut gate = QuestionGate::default();
        gate.expect(
            ExpectedKind::Load,
            Domain::EngineDrivability,
            "misfire.classify_load",
            "Is it worse at idle, under load, or both?",
        );
        gate
    }

    #[test]
    fn test_consume_clears_pending() {
        let mut gate = gate_with_load_question();
        let (expected, parsed) = gate.consume("both").unwrap();

        assert_eq!(expected.key, "misfire.classify_load");
        assert_eq!(parsed, ParsedAnswer::Load(LoadCondition::Both));
        assert!(!gate.awaiting());
        assert_eq!(gate.clarify_retries, 0);
    }

    #[test]
    fn test_failed_parse_leaves_question_outstanding() {
        let mut gate = gate_with_load_question();
        assert!(gate.consume("purple").is_none());

        assert!(gate.awaiting());
        assert_eq!(gate.clarify_retries, 1);

        // Still consumable afterwards, exactly once.
        assert!(gate.consume("at idle").is_some());
        assert!(gate.consume("at idle").is_none());
    }

    #[test]
    fn test_at_most_one_outstanding() {
        let mut gate = gate_with_load_question();
        gate.expect(
            ExpectedKind::YesNo,
            Domain::EngineDrivability,
            "misfire.component_history",
            "Any recent ignition work?",
        );

        let pending = gate.expected_input.as_ref().unwrap();
        assert_eq!(pending.key, "misfire.component_history");
    }

    #[test]
    fn test_anti_repeat() {
        let mut gate = QuestionGate::default();
        assert!(gate.should_ask("evap.check_gas_cap"));
        gate.mark_asked("evap.check_gas_cap");
        assert!(!gate.should_ask("evap.check_gas_cap"));
        assert!(gate.should_ask("evap.smoke_test"));
    }
}
