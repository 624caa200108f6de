//! Conversation state owned by the session router.
//!
//! One `ConversationState` exists per chat session and is mutated only by the
//! router while a turn is being processed. Persistence between turns goes
//! through the `SessionStore` port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::result::SpecialistResult;

/// Working language of a conversation.
///
/// The platform serves English, isiZulu, and Afrikaans; everything else is
/// mapped onto the nearest fallback by the language detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// isiZulu
    Zu,
    /// Afrikaans
    Af,
}

impl Language {
    /// Two-letter tag used in prompts and stored state.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zu => "zu",
            Self::Af => "af",
        }
    }

    /// Parse a two-letter tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "en" => Some(Self::En),
            "zu" => Some(Self::Zu),
            "af" => Some(Self::Af),
            _ => None,
        }
    }

    /// Human-readable name, used when instructing the generation capability.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zu => "isiZulu",
            Self::Af => "Afrikaans",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Classified intent for a single citizen turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Registration or re-authentication flow.
    Auth,
    /// Municipal service report (water, electricity, roads, refuse...).
    Municipal,
    /// Follow-up on an existing ticket.
    TicketStatus,
    /// Gender-based violence support.
    Gbv,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Municipal => "municipal",
            Self::TicketStatus => "ticket_status",
            Self::Gbv => "gbv",
        }
    }

    /// Normalize a raw classifier label into an intent.
    ///
    /// Trims and lowercases before matching; anything that is not one of the
    /// four known labels returns `None` so the caller can apply its default.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "auth" => Some(Self::Auth),
            "municipal" => Some(Self::Municipal),
            "ticket_status" => Some(Self::TicketStatus),
            "gbv" => Some(Self::Gbv),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which specialist currently owns the conversation.
///
/// `Manager` means no specialist has committed yet and the next turn is
/// classified fresh. Any other phase short-circuits classification entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPhase {
    #[default]
    Manager,
    Auth,
    Municipal,
    TicketStatus,
    Gbv,
}

impl RoutingPhase {
    /// The intent implied by an owning phase. `Manager` implies none.
    pub fn as_intent(self) -> Option<Intent> {
        match self {
            Self::Manager => None,
            Self::Auth => Some(Intent::Auth),
            Self::Municipal => Some(Intent::Municipal),
            Self::TicketStatus => Some(Intent::TicketStatus),
            Self::Gbv => Some(Intent::Gbv),
        }
    }

    pub fn from_intent(intent: Intent) -> Self {
        match intent {
            Intent::Auth => Self::Auth,
            Intent::Municipal => Self::Municipal,
            Intent::TicketStatus => Self::TicketStatus,
            Intent::Gbv => Self::Gbv,
        }
    }
}

/// Authentication state of the citizen behind a session.
///
/// Supplied by the external auth collaborator before each turn; the router
/// treats everything except `Active` as "not identified yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session exists for this contact.
    #[default]
    None,
    /// Authenticated and current.
    Active,
    /// A previous session lapsed.
    Expired,
    /// An OTP has been sent and not yet verified.
    OtpPending,
}

impl SessionStatus {
    /// True when the auth gate must fire before any specialist other than
    /// auth may see the conversation.
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::None | Self::Expired | Self::OtpPending)
    }
}

/// Snapshot of the auth collaborator's view of the citizen, taken per turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSnapshot {
    /// Whether an account already exists for the contact.
    pub user_exists: bool,
    /// Current session status.
    pub session_status: SessionStatus,
    /// User id once authenticated.
    pub user_id: Option<String>,
}

/// One citizen turn as handed in by the transport layer.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Stable session identifier (transport-owned, e.g. a WhatsApp thread id).
    pub session_id: String,
    /// Contact the citizen is reaching us from (phone or email).
    pub contact: String,
    /// Municipality / tenant the report belongs to.
    pub tenant_id: String,
    /// Latest citizen utterance.
    pub message: String,
    /// Prior turns, formatted by the transport layer and passed through opaquely.
    pub conversation_history: String,
    /// Auth collaborator snapshot for this turn.
    pub auth: AuthSnapshot,
}

/// Per-session conversation state.
///
/// Mutated exclusively by the session router; at most one turn per session is
/// in flight at a time (enforced by the transport layer, relied upon here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Stable session identifier.
    pub session_id: String,

    /// Latest citizen utterance, replaced every turn.
    pub message: String,

    /// Current working language.
    pub language: Language,

    /// Classification result of the current turn.
    pub intent: Option<Intent>,

    /// Specialist owning the conversation.
    pub routing_phase: RoutingPhase,

    /// Auth state as of the latest turn.
    pub session_status: SessionStatus,

    /// User id once authenticated.
    pub user_id: Option<String>,

    /// Intent deferred by the auth gate, kept for replay after authentication.
    /// Set-once: never overwritten while present.
    pub pending_intent: Option<Intent>,

    /// Externally formatted prior turns, passed through opaquely.
    pub conversation_history: String,

    /// Output of the most recently invoked specialist.
    pub last_result: Option<SpecialistResult>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh state for a new session.
    pub fn new(session_id: impl Into<String>, language: Language) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            message: String::new(),
            language,
            intent: None,
            routing_phase: RoutingPhase::Manager,
            session_status: SessionStatus::None,
            user_id: None,
            pending_intent: None,
            conversation_history: String::new(),
            last_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Absorb the incoming turn: utterance, history, and auth snapshot.
    pub fn begin_turn(&mut self, request: &TurnRequest) {
        self.message = request.message.clone();
        self.conversation_history = request.conversation_history.clone();
        self.session_status = request.auth.session_status;
        if request.auth.user_id.is_some() {
            self.user_id = request.auth.user_id.clone();
        }
        self.intent = None;
        self.updated_at = Utc::now();
    }

    /// Record a deferred intent, keeping the first value ever captured.
    ///
    /// Returns true when the value was stored, false when an earlier pending
    /// intent already occupies the slot.
    pub fn capture_pending_intent(&mut self, intent: Intent) -> bool {
        if self.pending_intent.is_some() {
            return false;
        }
        self.pending_intent = Some(intent);
        self.updated_at = Utc::now();
        true
    }

    /// Consume the deferred intent, clearing the slot.
    pub fn take_pending_intent(&mut self) -> Option<Intent> {
        let taken = self.pending_intent.take();
        if taken.is_some() {
            self.updated_at = Utc::now();
        }
        taken
    }

    /// Record the outcome of the turn's dispatch.
    pub fn complete_turn(&mut self, phase: RoutingPhase, result: SpecialistResult) {
        self.routing_phase = phase;
        self.last_result = Some(result);
        self.updated_at = Utc::now();
    }
}
