//! Normalized specialist output and guardrail verdicts.

use serde::{Deserialize, Serialize};

/// Normalized output handed back to the transport layer after a turn.
///
/// Always constructible: the repair layer has a hardcoded terminal fallback,
/// so no code path leaves the router without one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistResult {
    /// Citizen-facing reply text.
    pub message: String,

    /// Two-letter language tag the reply was produced in.
    pub language: String,

    /// Machine-readable flag for what the specialist did this turn
    /// (e.g. "otp_sent", "ticket_created", "collecting", "error").
    pub action_taken: String,

    /// Whether the specialist still owns the conversation.
    pub requires_followup: bool,

    /// Ticket tracking number, when one was created or looked up.
    pub tracking_number: Option<String>,

    /// Name of the specialist that produced this result.
    pub agent_name: String,

    /// Report category override. Always "gbv" for GBV results.
    pub category: Option<String>,

    /// Raw generation output kept for diagnostics, never shown to citizens.
    pub raw_output: Option<String>,

    /// Error marker when the result came from a failure path.
    pub error: Option<String>,
}

impl SpecialistResult {
    /// Minimal valid result around a message and language tag.
    pub fn from_message(message: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            language: language.into(),
            action_taken: "responded".to_string(),
            requires_followup: false,
            tracking_number: None,
            agent_name: String::new(),
            category: None,
            raw_output: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_taken = action.into();
        self
    }

    #[must_use]
    pub fn with_followup(mut self, requires_followup: bool) -> Self {
        self.requires_followup = requires_followup;
        self
    }

    #[must_use]
    pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// True when this result came from a failure path.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.action_taken == "error"
    }
}

/// Verdict of a guardrail predicate over one generation attempt.
///
/// Ephemeral: produced fresh per attempt, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailVerdict {
    /// Whether the raw output may be trusted.
    pub accepted: bool,
    /// Fixed re-prompt to append when rejected.
    pub retry_prompt: Option<String>,
}

impl GuardrailVerdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            retry_prompt: None,
        }
    }

    pub fn reject(retry_prompt: impl Into<String>) -> Self {
        Self {
            accepted: false,
            retry_prompt: Some(retry_prompt.into()),
        }
    }
}
