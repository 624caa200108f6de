//! In-memory session store for the CLI demo and integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::conversation::ConversationState;
use crate::domain::ports::session_store::{SessionStore, SessionStoreError};

/// Keeps conversation state in a process-local map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, SessionStoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }
}
