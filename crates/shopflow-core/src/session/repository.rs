//! Session repository trait.
//!
//! Defines the interface for session persistence operations, decoupling
//! the controller from the specific storage mechanism (in-memory map,
//! database row, remote store).

use super::model::DiagnosticSession;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its conversation id.
    ///
    /// Returns `Ok(None)` when no session exists for the id.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<DiagnosticSession>>;

    /// Saves a session to storage.
    async fn save(&self, session: &DiagnosticSession) -> Result<()>;

    /// Deletes a session from storage. Deleting a missing session is not
    /// an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions.
    async fn list_all(&self) -> Result<Vec<DiagnosticSession>>;
}
