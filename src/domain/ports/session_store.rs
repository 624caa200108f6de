//! Port trait for conversation-state persistence between turns.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::conversation::ConversationState;

/// Failure taxonomy for the session persistence collaborator.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session state corrupt for {session_id}: {reason}")]
    Corrupt { session_id: String, reason: String },
}

/// Persistence collaborator keyed on the stable session identifier.
///
/// The transport layer guarantees at most one in-flight turn per session, so
/// implementations do not need cross-turn locking for a single session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the state for a session, if any exists.
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, SessionStoreError>;

    /// Persist the state after a turn.
    async fn save(&self, state: &ConversationState) -> Result<(), SessionStoreError>;
}
