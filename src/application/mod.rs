//! Application layer: use-case orchestration over the domain ports.

pub mod specialist_executor;

pub use specialist_executor::{DispatchContext, SpecialistExecutor};
