//! Structured reply directives.
//!
//! A directive is the controller's decision about *what* the next reply
//! should say. Phrasing (how to say it) happens behind the
//! [`crate::phrasing::PhrasingAgent`] boundary; nothing downstream of a
//! directive is allowed to alter control state.

use crate::answer::ExpectedKind;
use crate::code::TroubleCode;
use crate::domain::Domain;
use crate::vehicle::Vehicle;
use serde::{Deserialize, Serialize};

/// One structured instruction for the phrasing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyDirective {
    /// Safety hard stop. Overrides everything; the turn ends here.
    HardStop { message: String },

    /// Vehicle record incomplete while a code is active; ask for
    /// year/make/model/engine and nothing else.
    RequestVehicle { known: Vehicle },

    /// Explain one trouble code, with any advisory safety warnings attached.
    ExplainCode {
        code: TroubleCode,
        vehicle: Vehicle,
        warnings: Vec<String>,
    },

    /// Ask exactly one question identified by `key`.
    AskQuestion {
        key: String,
        kind: ExpectedKind,
        domain: Domain,
        prompt: String,
    },

    /// Re-prompt after an unparseable answer, restating the vocabulary.
    Clarify {
        key: String,
        hint: String,
        original_prompt: String,
    },

    /// A deterministic path or the tier ladder reached a terminal state.
    Conclusion { key: String, summary: String },

    /// No structured next step; delegate a free-form explanation.
    FreeForm {
        topic: String,
        warnings: Vec<String>,
    },
}
