//! Phrasing capability seam.
//!
//! The phrasing agent turns a [`ReplyDirective`] into natural-language
//! text. It never decides *what* to ask, only *how* to say it; its output
//! is display-only and must not feed back into control decisions.

use crate::directive::ReplyDirective;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a turn in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

/// One immutable entry of the conversation log, appended by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    /// Timestamp when the turn was recorded (ISO 8601 format).
    pub timestamp: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Capability: renders a structured directive as user-facing text.
#[async_trait]
pub trait PhrasingAgent: Send + Sync {
    /// Phrases one directive given the prior turns (read-only).
    async fn phrase(
        &self,
        directive: &ReplyDirective,
        history: &[ConversationTurn],
    ) -> Result<String>;
}
