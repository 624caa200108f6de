//! Gugu - Conversational intake core for municipal service reports and GBV
//! crisis support.
//!
//! Citizens converse with a persona over chat in English, isiZulu, or
//! Afrikaans. This crate is the deterministic layer between raw citizen text
//! and the language-model conversation handlers: it authenticates routing,
//! classifies intent (with a hard-coded adversarial pre-filter), dispatches
//! to one of four specialist handlers, and validates everything the model
//! produces against structural and safety guardrails before it reaches a
//! citizen.
//!
//! # Architecture
//!
//! Clean / Hexagonal layering:
//!
//! - **Domain** (`domain`): conversation state, specialist contracts, port traits
//! - **Services** (`services`): language detection, classification, guardrails,
//!   repair, and the session router
//! - **Application** (`application`): specialist execution over the ports
//! - **Infrastructure** (`infrastructure`): Claude adapter, config, in-memory
//!   collaborators
//! - **CLI** (`cli`): demo transport and config tooling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{DispatchContext, SpecialistExecutor};
pub use domain::models::{
    AuthSnapshot, Config, ConversationState, GuardrailVerdict, Intent, Language, RoutingPhase,
    SessionStatus, Specialist, SpecialistResult, TurnRequest,
};
pub use domain::ports::{
    CitizenDirectory, EmergencyNotifier, GenerationCapability, GenerationError, GenerationRequest,
    OtpGateway, SessionStore, TicketStore, ToolBinding, ToolSet,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    IntentClassifier, LanguageDetector, OutputGuardrail, ResultRepair, SessionRouter,
};
