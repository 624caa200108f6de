//! Post-generation acceptance checks.
//!
//! The generic structural check catches truncated, empty, or garbled
//! generations cheaply, with no semantic evaluation. The GBV check is a raw
//! substring test for the mandated emergency numbers: for safety-critical
//! content only a presence/absence test is acceptable, "close enough" is not.

use regex::Regex;

use crate::domain::models::config::GuardrailConfig;
use crate::domain::models::result::GuardrailVerdict;
use crate::domain::models::specialist::{
    Specialist, EMERGENCY_GBV_COMMAND_CENTRE, EMERGENCY_SAPS,
};
use crate::services::repair::{extract_json_with_message, strip_markdown_fences};

/// Fixed re-prompt for structurally unusable output.
pub const STRUCTURAL_RETRY_PROMPT: &str = "\
Your previous reply was incomplete or unreadable. Respond again with a \
complete JSON object containing a full 'message' for the resident.";

/// Fixed re-prompt for GBV output missing the emergency numbers.
pub const GBV_RETRY_PROMPT: &str = "\
Your previous reply was missing the emergency numbers. Respond again and \
include SAPS 10111 and the GBV Command Centre 0800 150 150 in your message.";

/// Structural and safety acceptance checks over raw generation output.
pub struct OutputGuardrail {
    config: GuardrailConfig,
    final_answer: Regex,
}

impl OutputGuardrail {
    pub fn new(config: GuardrailConfig) -> Self {
        Self {
            config,
            final_answer: Regex::new(r"(?is)final\s+answer\s*[:\-]?\s*")
                .expect("final answer pattern is valid"),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(GuardrailConfig::default())
    }

    /// Bounded retry count for rejected attempts.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Check one generation attempt for the given specialist.
    ///
    /// The GBV safety check is layered on top of the structural one: output
    /// must be structurally usable before its content is even considered.
    pub fn check(&self, specialist: Specialist, raw: &str) -> GuardrailVerdict {
        if !self.structurally_acceptable(raw) {
            return GuardrailVerdict::reject(STRUCTURAL_RETRY_PROMPT);
        }

        if specialist.uses_gbv_guardrail() && !contains_emergency_number(raw) {
            return GuardrailVerdict::reject(GBV_RETRY_PROMPT);
        }

        GuardrailVerdict::accept()
    }

    /// Accept if any of:
    /// - a JSON object with a non-trivial `message` field
    /// - a "final answer" marker followed by non-trivial content
    /// - non-trivial bare text
    fn structurally_acceptable(&self, raw: &str) -> bool {
        let cleaned = strip_markdown_fences(raw);

        if let Some(reply) = extract_json_with_message(&cleaned) {
            if reply.message.trim().len() >= self.config.min_message_len {
                return true;
            }
        }

        if let Some(m) = self.final_answer.find_iter(&cleaned).last() {
            if cleaned[m.end()..].trim().len() >= self.config.min_message_len {
                return true;
            }
        }

        cleaned.trim().len() >= self.config.min_raw_len
    }
}

impl Default for OutputGuardrail {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Raw substring presence of at least one mandated emergency number.
pub fn contains_emergency_number(text: &str) -> bool {
    text.contains(EMERGENCY_SAPS) || text.contains(EMERGENCY_GBV_COMMAND_CENTRE)
}

/// Raw substring presence of both mandated emergency numbers.
pub fn contains_both_emergency_numbers(text: &str) -> bool {
    text.contains(EMERGENCY_SAPS) && text.contains(EMERGENCY_GBV_COMMAND_CENTRE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_structured_message() {
        let guardrail = OutputGuardrail::with_defaults();
        let raw = r#"{"message": "Your report has been captured."}"#;
        assert!(guardrail.check(Specialist::Municipal, raw).accepted);
    }

    #[test]
    fn test_rejects_trivial_structured_message() {
        let guardrail = OutputGuardrail::with_defaults();
        let raw = r#"{"message": "ok"}"#;
        let verdict = guardrail.check(Specialist::Municipal, raw);
        assert!(!verdict.accepted);
        assert_eq!(verdict.retry_prompt.as_deref(), Some(STRUCTURAL_RETRY_PROMPT));
    }

    #[test]
    fn test_accepts_final_answer_marker() {
        let guardrail = OutputGuardrail::with_defaults();
        let raw = "Thought: done\nFinal Answer: your ticket is still open";
        assert!(guardrail.check(Specialist::Municipal, raw).accepted);
    }

    #[test]
    fn test_rejects_empty_and_short_output() {
        let guardrail = OutputGuardrail::with_defaults();
        assert!(!guardrail.check(Specialist::Municipal, "").accepted);
        assert!(!guardrail.check(Specialist::Municipal, "thanks").accepted);
        assert!(!guardrail.check(Specialist::Municipal, "Final Answer:").accepted);
    }

    #[test]
    fn test_accepts_long_bare_text() {
        let guardrail = OutputGuardrail::with_defaults();
        let raw = "Your water outage report was captured, reference to follow.";
        assert!(guardrail.check(Specialist::Municipal, raw).accepted);
    }

    #[test]
    fn test_gbv_requires_emergency_number() {
        let guardrail = OutputGuardrail::with_defaults();

        let missing = r#"{"message": "I hear you, and I am here to support you."}"#;
        let verdict = guardrail.check(Specialist::Gbv, missing);
        assert!(!verdict.accepted);
        assert_eq!(verdict.retry_prompt.as_deref(), Some(GBV_RETRY_PROMPT));

        let with_saps = r#"{"message": "If you are in danger call 10111 right away."}"#;
        assert!(guardrail.check(Specialist::Gbv, with_saps).accepted);

        let with_centre =
            r#"{"message": "The GBV Command Centre on 0800 150 150 is free, 24 hours."}"#;
        assert!(guardrail.check(Specialist::Gbv, with_centre).accepted);
    }

    #[test]
    fn test_gbv_structural_rejection_comes_first() {
        let guardrail = OutputGuardrail::with_defaults();
        // Too short to be usable even though it carries a number.
        let verdict = guardrail.check(Specialist::Gbv, "10111");
        assert!(!verdict.accepted);
        assert_eq!(verdict.retry_prompt.as_deref(), Some(STRUCTURAL_RETRY_PROMPT));
    }

    #[test]
    fn test_non_gbv_handlers_skip_safety_check() {
        let guardrail = OutputGuardrail::with_defaults();
        let raw = r#"{"message": "Your refuse collection report is logged."}"#;
        for specialist in [Specialist::Auth, Specialist::Municipal, Specialist::TicketStatus] {
            assert!(guardrail.check(specialist, raw).accepted);
        }
    }

    #[test]
    fn test_emergency_number_helpers() {
        assert!(contains_emergency_number("call 10111 now"));
        assert!(contains_emergency_number("0800 150 150 is free"));
        assert!(!contains_emergency_number("call the municipality"));
        assert!(contains_both_emergency_numbers("10111 and 0800 150 150"));
        assert!(!contains_both_emergency_numbers("10111 only"));
    }
}
