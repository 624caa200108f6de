//! Per-turn session routing: the state machine between raw citizen text and
//! the specialist handlers.
//!
//! Ordering inside a turn is deliberate and load-bearing:
//! short-circuit before auth gate before classification. An in-progress
//! specialist session is never interrupted by a stale auth check, and the
//! auth gate always dominates fresh classification, while the citizen's
//! original request is queued for replay instead of being lost.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::application::specialist_executor::{DispatchContext, SpecialistExecutor};
use crate::domain::models::conversation::{
    ConversationState, Intent, Language, RoutingPhase, TurnRequest,
};
use crate::domain::models::result::SpecialistResult;
use crate::domain::models::specialist::Specialist;
use crate::domain::ports::session_store::SessionStore;
use crate::services::intent::IntentClassifier;
use crate::services::language::LanguageDetector;

/// The session router. One instance serves all sessions; all per-session
/// state lives in `ConversationState` behind the store.
pub struct SessionRouter {
    store: Arc<dyn SessionStore>,
    detector: LanguageDetector,
    classifier: IntentClassifier,
    executor: SpecialistExecutor,
    default_language: Language,
}

impl SessionRouter {
    pub fn new(
        store: Arc<dyn SessionStore>,
        detector: LanguageDetector,
        classifier: IntentClassifier,
        executor: SpecialistExecutor,
        default_language: Language,
    ) -> Self {
        Self {
            store,
            detector,
            classifier,
            executor,
            default_language,
        }
    }

    /// Process one citizen turn. The single entry point the transport layer
    /// calls; never propagates an error. Every code path terminates in a
    /// well-formed result.
    pub async fn route_turn(&self, request: TurnRequest) -> SpecialistResult {
        let mut state = self.load_state(&request.session_id).await;
        state.begin_turn(&request);

        state.language = self.detector.detect(&state.message, state.language);

        let intent = self.resolve_intent(&mut state).await;
        state.intent = Some(intent);

        let specialist = Specialist::from_intent(intent);
        info!(
            session_id = %state.session_id,
            intent = %intent,
            language = %state.language,
            phase = ?state.routing_phase,
            "dispatching turn"
        );

        let result = self
            .executor
            .execute(&DispatchContext {
                specialist,
                language: state.language,
                contact: request.contact.clone(),
                tenant_id: request.tenant_id.clone(),
                user_id: state.user_id.clone(),
                message: state.message.clone(),
                conversation_history: state.conversation_history.clone(),
                user_exists: request.auth.user_exists,
                session_status: state.session_status,
            })
            .await;

        state.complete_turn(next_phase(specialist, &result), result.clone());

        if let Err(err) = self.store.save(&state).await {
            error!(session_id = %state.session_id, error = %err, "failed to persist session state");
        }

        result
    }

    /// Intent resolution: short-circuit, then auth gate, then fresh
    /// classification.
    async fn resolve_intent(&self, state: &mut ConversationState) -> Intent {
        // An owning specialist keeps the conversation; no classifier call,
        // no auth-gate re-evaluation. This is what stops a "yes" mid-flow
        // from being reclassified into the wrong handler.
        if let Some(owned) = state.routing_phase.as_intent() {
            debug!(session_id = %state.session_id, intent = %owned, "short-circuit to owning specialist");
            return owned;
        }

        // Auth gate: classify only to remember what the citizen wanted,
        // then force the auth handler. The captured intent is set-once.
        if state.session_status.requires_auth() {
            let suggested = self.classifier.classify(&state.message).await;
            if state.capture_pending_intent(suggested) {
                debug!(session_id = %state.session_id, pending = %suggested, "deferred intent captured");
            }
            return Intent::Auth;
        }

        // Authenticated fresh turn: any previously deferred intent is being
        // replayed now, so the slot is consumed.
        if let Some(deferred) = state.take_pending_intent() {
            debug!(session_id = %state.session_id, deferred = %deferred, "consuming deferred intent");
        }
        self.classifier.classify(&state.message).await
    }

    async fn load_state(&self, session_id: &str) -> ConversationState {
        match self.store.load(session_id).await {
            Ok(Some(state)) => state,
            Ok(None) => ConversationState::new(session_id, self.default_language),
            Err(err) => {
                error!(session_id, error = %err, "session load failed, starting fresh state");
                ConversationState::new(session_id, self.default_language)
            }
        }
    }
}

/// Phase for the next turn: the specialist keeps ownership while it expects
/// a follow-up, otherwise control returns to fresh classification.
fn next_phase(specialist: Specialist, result: &SpecialistResult) -> RoutingPhase {
    if result.requires_followup {
        specialist.phase()
    } else {
        RoutingPhase::Manager
    }
}
