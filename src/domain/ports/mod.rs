//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - `GenerationCapability`: the language-model conversation capability
//! - `OtpGateway`, `CitizenDirectory`, `TicketStore`, `EmergencyNotifier`:
//!   narrow tool collaborators the model may invoke
//! - `SessionStore`: conversation-state persistence between turns
//!
//! These contracts keep the routing core independent of any specific
//! provider, transport, or storage technology.

pub mod generation;
pub mod session_store;
pub mod tools;

pub use generation::{GenerationCapability, GenerationError, GenerationRequest};
pub use session_store::{SessionStore, SessionStoreError};
pub use tools::{
    CitizenDirectory, CitizenRecord, CreateTicketRequest, EmergencyNotification,
    EmergencyNotifier, NewCitizen, OtpChannel, OtpGateway, OtpOutcome, TicketReceipt, TicketStore,
    TicketSummary, ToolBinding, ToolContext, ToolError, ToolSet,
};
