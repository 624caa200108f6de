//! Business-logic services: language identification, intent classification,
//! output guardrails, result repair, and the session router.

pub mod guardrails;
pub mod intent;
pub mod language;
pub mod repair;
pub mod router;

pub use guardrails::OutputGuardrail;
pub use intent::IntentClassifier;
pub use language::LanguageDetector;
pub use repair::ResultRepair;
pub use router::SessionRouter;
