//! Session lifecycle management.
//!
//! `SessionManager` keys sessions by conversation id, never process-global.
//! Each session is wrapped in its own `tokio::sync::Mutex`; the caller
//! holds that lock for the whole turn, which gives the strict sequential
//! ordering the fact-locking and anti-redundancy invariants assume, while
//! leaving independent conversations fully concurrent.

use super::model::DiagnosticSession;
use super::repository::SessionRepository;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Manages per-conversation sessions and their persistence.
pub struct SessionManager {
    /// In-memory session cache, keyed by conversation id.
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<DiagnosticSession>>>>>,
    /// Persistent storage backend for session data.
    repository: Arc<dyn SessionRepository>,
}

impl SessionManager {
    /// Creates a new `SessionManager` over a repository backend.
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            repository,
        }
    }

    /// Returns the session for a conversation, loading it from storage or
    /// creating a fresh one as needed.
    ///
    /// The returned handle's mutex must be held for the full turn.
    pub async fn get_or_create(&self, conversation_id: &str) -> Result<Arc<Mutex<DiagnosticSession>>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(conversation_id) {
                return Ok(session.clone());
            }
        }

        let session = match self.repository.find_by_id(conversation_id).await? {
            Some(stored) => stored,
            None => {
                tracing::info!(conversation = %conversation_id, "creating new session");
                DiagnosticSession::new(conversation_id)
            }
        };

        let mut sessions = self.sessions.write().await;
        // A concurrent caller may have inserted while we were loading.
        let entry = sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)));
        Ok(entry.clone())
    }

    /// Persists a session snapshot. Call after the turn's mutations are
    /// committed, still under the session lock.
    pub async fn persist(&self, session: &DiagnosticSession) -> Result<()> {
        self.repository.save(session).await
    }

    /// Deletes a session from both memory and storage.
    pub async fn delete(&self, conversation_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(conversation_id);
        drop(sessions);

        self.repository.delete(conversation_id).await
    }

    /// Lists all stored sessions.
    pub async fn list(&self) -> Result<Vec<DiagnosticSession>> {
        self.repository.list_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Mock repository, map-backed.
    struct MockRepository {
        sessions: StdMutex<HashMap<String, DiagnosticSession>>,
    }

    impl MockRepository {
        fn new() -> Self {
            Self {
                sessions: StdMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionRepository for MockRepository {
        async fn find_by_id(&self, session_id: &str) -> Result<Option<DiagnosticSession>> {
            Ok(self.sessions.lock().unwrap().get(session_id).cloned())
        }

        async fn save(&self, session: &DiagnosticSession) -> Result<()> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id.clone(), session.clone());
            Ok(())
        }

        async fn delete(&self, session_id: &str) -> Result<()> {
            self.sessions.lock().unwrap().remove(session_id);
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<DiagnosticSession>> {
            Ok(self.sessions.lock().unwrap().values().cloned().collect())
        }
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_handle() {
        let manager = SessionManager::new(Arc::new(MockRepository::new()));

        let first = manager.get_or_create("conv-1").await.unwrap();
        first.lock().await.gate.mark_asked("evap.check_gas_cap");

        let second = manager.get_or_create("conv-1").await.unwrap();
        assert_eq!(
            second.lock().await.gate.last_question_key.as_deref(),
            Some("evap.check_gas_cap")
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_conversation() {
        let manager = SessionManager::new(Arc::new(MockRepository::new()));

        let a = manager.get_or_create("conv-a").await.unwrap();
        a.lock().await.gate.mark_asked("misfire.classify_misfire");

        let b = manager.get_or_create("conv-b").await.unwrap();
        assert!(b.lock().await.gate.last_question_key.is_none());
    }

    #[tokio::test]
    async fn test_persist_and_reload_from_storage() {
        let repository = Arc::new(MockRepository::new());
        let manager = SessionManager::new(repository.clone());

        {
            let handle = manager.get_or_create("conv-1").await.unwrap();
            let mut session = handle.lock().await;
            session.add_codes(&crate::code::extract_codes("P0302"));
            manager.persist(&session).await.unwrap();
        }

        // New manager with the same storage restores the session.
        let manager2 = SessionManager::new(repository);
        let handle = manager2.get_or_create("conv-1").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.primary_code().unwrap().as_str(), "P0302");
    }

    #[tokio::test]
    async fn test_delete_removes_session() {
        let manager = SessionManager::new(Arc::new(MockRepository::new()));

        {
            let handle = manager.get_or_create("conv-1").await.unwrap();
            let mut session = handle.lock().await;
            session.add_codes(&crate::code::extract_codes("P0302"));
            manager.persist(&session).await.unwrap();
        }
        manager.delete("conv-1").await.unwrap();

        let handle = manager.get_or_create("conv-1").await.unwrap();
        assert!(handle.lock().await.active_codes.is_empty());
    }
}
