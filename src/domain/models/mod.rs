//! Core domain models: conversation state, specialist contracts, results,
//! and configuration.

pub mod config;
pub mod conversation;
pub mod prompts;
pub mod result;
pub mod specialist;

pub use config::{
    Config, GenerationConfig, GuardrailConfig, LanguageConfig, LoggingConfig, RetryConfig,
    TenantConfig,
};
pub use conversation::{
    AuthSnapshot, ConversationState, Intent, Language, RoutingPhase, SessionStatus, TurnRequest,
};
pub use result::{GuardrailVerdict, SpecialistResult};
pub use specialist::{
    is_valid_tracking_number, Specialist, TaskContext, EMERGENCY_GBV_COMMAND_CENTRE,
    EMERGENCY_SAPS,
};
