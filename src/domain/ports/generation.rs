//! Port trait for the language-model generation capability.
//!
//! The core never produces text itself; it hands a persona, a task, an opaque
//! history, and a set of named tool capabilities to an implementation of this
//! trait and validates whatever comes back. Adapters live in
//! `infrastructure` (HTTP-backed) and in the test suite (scripted mocks).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ports::tools::ToolBinding;

/// One generation invocation: persona + task + history, bounded by
/// `max_turns` model/tool iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System role description (persona).
    pub persona: String,

    /// Per-turn instruction.
    pub task: String,

    /// Named tool capabilities the model may invoke. Empty for single-shot
    /// calls such as classification.
    pub allowed_tools: Vec<String>,

    /// Externally formatted prior turns, passed through opaquely.
    pub history: String,

    /// Upper bound on model/tool-call iterations for this invocation.
    pub max_turns: u32,
}

impl GenerationRequest {
    /// Single-shot request with no tools and no history.
    pub fn single_shot(persona: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            task: task.into(),
            allowed_tools: Vec::new(),
            history: String::new(),
            max_turns: 1,
        }
    }
}

/// Failure taxonomy for a generation invocation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport-level failure (network, HTTP status, serialization).
    #[error("generation transport failed: {0}")]
    Transport(String),

    /// The collaborator-level timeout fired.
    #[error("generation timed out")]
    Timeout,

    /// The tool loop hit `max_turns` without producing a final reply.
    #[error("generation exhausted {max_turns} turns without a final reply")]
    TurnsExhausted { max_turns: u32 },

    /// The capability returned something that cannot be used at all.
    #[error("generation produced unusable output: {0}")]
    Unusable(String),
}

/// Port trait for the generation capability.
///
/// Implementations must be `Send + Sync`; the router invokes them from
/// concurrent per-session tasks. A `tools` binding is provided whenever the
/// request allows tool calls; single-shot callers pass `None`.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Produce a raw reply for the request, optionally invoking tools.
    ///
    /// The returned string is untrusted: it is always passed through the
    /// output guardrail and the repair layer before anything citizen-facing
    /// is built from it.
    async fn invoke(
        &self,
        request: GenerationRequest,
        tools: Option<&ToolBinding>,
    ) -> Result<String, GenerationError>;
}
