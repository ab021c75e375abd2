//! Safety gate capability seam.
//!
//! The safety lookup runs before every other component each turn. A hard
//! stop short-circuits the whole turn with a fixed refusal; warnings are
//! advisory context attached to explanations and never alter state.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a safety lookup over one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// Fixed refusal text; when present the turn ends here.
    pub hard_stop: Option<String>,
    /// Non-blocking advisories to attach to the next explanation.
    pub warnings: Vec<String>,
}

impl SafetyVerdict {
    pub fn is_hard_stop(&self) -> bool {
        self.hard_stop.is_some()
    }
}

/// Capability: keyword-based safety-warning and hard-stop lookup.
#[async_trait]
pub trait SafetyLookup: Send + Sync {
    /// Checks one message for hard stops and advisory warnings.
    async fn check(&self, text: &str) -> Result<SafetyVerdict>;
}
