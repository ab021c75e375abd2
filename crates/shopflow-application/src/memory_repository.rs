//! In-memory session repository.
//!
//! The default storage backend: a map behind a `tokio::sync::RwLock`.
//! Durable backends implement the same `SessionRepository` trait.

use async_trait::async_trait;
use shopflow_core::error::Result;
use shopflow_core::session::{DiagnosticSession, SessionRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Map-backed `SessionRepository`.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, DiagnosticSession>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<DiagnosticSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &DiagnosticSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<DiagnosticSession>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }
}
