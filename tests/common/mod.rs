//! Shared test harness: a scriptable generation capability and a fully
//! wired router over in-memory collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gugu::application::SpecialistExecutor;
use gugu::domain::models::conversation::{AuthSnapshot, SessionStatus, TurnRequest};
use gugu::domain::models::specialist::EMERGENCY_SAPS;
use gugu::domain::models::{Config, Language};
use gugu::domain::ports::generation::{
    GenerationCapability, GenerationError, GenerationRequest,
};
use gugu::domain::ports::tools::{ToolBinding, ToolSet};
use gugu::infrastructure::memory::{
    InMemoryDirectory, InMemoryOtpGateway, InMemorySessionStore, InMemoryTicketStore,
    RecordingEmergencyNotifier,
};
use gugu::services::{IntentClassifier, LanguageDetector, OutputGuardrail, SessionRouter};

/// Scriptable generation capability with separate accounting for
/// classification calls and specialist calls.
pub struct MockGeneration {
    label: Mutex<String>,
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    classification_calls: AtomicUsize,
    specialist_calls: AtomicUsize,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self {
            label: Mutex::new("municipal".to_string()),
            replies: Mutex::new(VecDeque::new()),
            classification_calls: AtomicUsize::new(0),
            specialist_calls: AtomicUsize::new(0),
        }
    }

    /// Label the classifier stage will return.
    pub fn set_label(&self, label: &str) {
        *self.label.lock().unwrap() = label.to_string();
    }

    /// Queue a scripted specialist reply.
    pub fn push_reply(&self, reply: Result<String, GenerationError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Queue N generation failures in a row.
    pub fn push_failures(&self, n: usize) {
        for _ in 0..n {
            self.push_reply(Err(GenerationError::Timeout));
        }
    }

    pub fn classification_calls(&self) -> usize {
        self.classification_calls.load(Ordering::SeqCst)
    }

    pub fn specialist_calls(&self) -> usize {
        self.specialist_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationCapability for MockGeneration {
    async fn invoke(
        &self,
        request: GenerationRequest,
        _tools: Option<&ToolBinding>,
    ) -> Result<String, GenerationError> {
        // Classification is the only single-shot, tool-less invocation.
        if request.allowed_tools.is_empty() && request.max_turns == 1 {
            self.classification_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(self.label.lock().unwrap().clone());
        }

        self.specialist_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.replies.lock().unwrap().pop_front() {
            return scripted;
        }

        // Unscripted default: a compliant structured reply. GBV personas
        // carry the emergency numbers, so echo them back like a well-behaved
        // model would.
        let message = if request.persona.contains(EMERGENCY_SAPS) {
            "You are not alone. If you are in danger call 10111 now; the GBV Command \
             Centre (0800 150 150) is free, 24 hours. What kind of incident was this?"
        } else {
            "Thank you, I have captured those details for you."
        };
        Ok(serde_json::json!({
            "message": message,
            "requires_followup": false
        })
        .to_string())
    }
}

/// Fully wired router plus handles to every collaborator double.
pub struct TestHarness {
    pub router: SessionRouter,
    pub generation: Arc<MockGeneration>,
    pub store: Arc<InMemorySessionStore>,
    pub emergency: Arc<RecordingEmergencyNotifier>,
    pub tickets: Arc<InMemoryTicketStore>,
}

pub fn harness() -> TestHarness {
    let config = Config::default();
    let generation = Arc::new(MockGeneration::new());
    let store = Arc::new(InMemorySessionStore::new());
    let emergency = Arc::new(RecordingEmergencyNotifier::new());
    let tickets = Arc::new(InMemoryTicketStore::new());

    let tools = ToolSet {
        otp: Arc::new(InMemoryOtpGateway::with_fixed_code("123456")),
        directory: Arc::new(InMemoryDirectory::new()),
        tickets: tickets.clone(),
        emergency: emergency.clone(),
    };

    let router = SessionRouter::new(
        store.clone(),
        LanguageDetector::new(config.language.clone()),
        IntentClassifier::new(generation.clone()),
        SpecialistExecutor::new(
            generation.clone(),
            tools,
            OutputGuardrail::new(config.guardrail.clone()),
        ),
        Language::En,
    );

    TestHarness {
        router,
        generation,
        store,
        emergency,
        tickets,
    }
}

/// Turn request builder with sensible defaults.
pub fn turn(session_id: &str, message: &str, status: SessionStatus) -> TurnRequest {
    TurnRequest {
        session_id: session_id.to_string(),
        contact: "+27820000001".to_string(),
        tenant_id: "ethekwini".to_string(),
        message: message.to_string(),
        conversation_history: String::new(),
        auth: AuthSnapshot {
            user_exists: status == SessionStatus::Active,
            session_status: status,
            user_id: if status == SessionStatus::Active {
                Some("user-1".to_string())
            } else {
                None
            },
        },
    }
}
