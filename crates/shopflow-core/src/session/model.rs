//! Diagnostic session domain model.
//!
//! One session exists per conversation. It is mutated every turn and is
//! the only shared mutable state in the system; the manager guards each
//! record so turns within a conversation are strictly sequential.

use crate::code::TroubleCode;
use crate::domain::Domain;
use crate::facts::Classification;
use crate::gate::QuestionGate;
use crate::path::{MisfirePhase, PathKind};
use crate::tier::AccessTier;
use crate::vehicle::Vehicle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Whether the session has seen any diagnostic signal yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// No trouble code or symptom keyword seen yet.
    #[default]
    Idle,
    /// Diagnostics in progress.
    Active,
}

/// Per-conversation diagnostic session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSession {
    /// Conversation identifier this session is keyed by.
    pub id: String,
    pub mode: SessionMode,
    /// Conversation domain. Set once; only reset clears it.
    pub domain: Option<Domain>,
    /// Trouble codes seen this session, deduplicated, insertion order.
    pub active_codes: Vec<TroubleCode>,
    /// How many of `active_codes` have been explained, in order.
    #[serde(default)]
    pub explained_codes: usize,
    /// Locked per-domain facts.
    #[serde(default)]
    pub classification: Classification,
    /// Pending-question state.
    #[serde(default)]
    pub gate: QuestionGate,
    /// Deterministic sub-flow owning the conversation, if any.
    pub active_path: Option<PathKind>,
    /// Current state within the misfire path.
    #[serde(default)]
    pub misfire_phase: MisfirePhase,
    /// Index into the domain's generic test ladder.
    #[serde(default)]
    pub template_step: usize,
    /// Current physical-access tier.
    #[serde(default)]
    pub access_tier: AccessTier,
    /// Overlay ids that have fired this session.
    #[serde(default)]
    pub fired_overlays: HashSet<String>,
    /// Vehicle context, merged from external collaborators.
    #[serde(default)]
    pub vehicle: Vehicle,
    /// Timestamp when the session was created (ISO 8601 format).
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format).
    pub updated_at: String,
}

impl DiagnosticSession {
    /// Creates a fresh session for a conversation id.
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            mode: SessionMode::default(),
            domain: None,
            active_codes: Vec::new(),
            explained_codes: 0,
            classification: Classification::default(),
            gate: QuestionGate::default(),
            active_path: None,
            misfire_phase: MisfirePhase::default(),
            template_step: 0,
            access_tier: AccessTier::default(),
            fired_overlays: HashSet::new(),
            vehicle: Vehicle::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// First code seen this session, if any.
    pub fn primary_code(&self) -> Option<&TroubleCode> {
        self.active_codes.first()
    }

    /// Appends newly seen codes, deduplicated, preserving first-seen order.
    pub fn add_codes(&mut self, codes: &[TroubleCode]) {
        for code in codes {
            if !self.active_codes.contains(code) {
                self.active_codes.push(code.clone());
            }
        }
        if !self.active_codes.is_empty() {
            self.mode = SessionMode::Active;
        }
    }

    /// Locks the domain on first classification only.
    ///
    /// `Unknown` does not lock, so a later message with a real signal can
    /// still classify the session.
    pub fn set_domain_if_unset(&mut self, domain: Domain) {
        if self.domain.is_none() && domain != Domain::Unknown {
            tracing::debug!(session = %self.id, %domain, "domain locked");
            self.domain = Some(domain);
        }
    }

    /// Next code awaiting its one-time explanation, in insertion order.
    pub fn next_unexplained_code(&self) -> Option<&TroubleCode> {
        self.active_codes.get(self.explained_codes)
    }

    /// Marks the current head of the explanation queue as explained.
    pub fn mark_code_explained(&mut self) {
        if self.explained_codes < self.active_codes.len() {
            self.explained_codes += 1;
        }
    }

    /// Bumps the updated-at timestamp. Call after every mutation batch.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Reset operation: restores all fields to initial defaults, keeping
    /// only the id and creation time.
    pub fn reset(&mut self) {
        let id = std::mem::take(&mut self.id);
        let created_at = std::mem::take(&mut self.created_at);
        *self = Self::new(id);
        self.created_at = created_at;
    }
}
