//! Best-effort repair of raw generation output into a `SpecialistResult`.
//!
//! Three tiers, tried in order, each a safety net for the one above:
//! 1. a JSON object carrying a `message` key, extracted and parsed
//! 2. text following a "final answer" marker
//! 3. a hardcoded, handler-specific terminal fallback
//!
//! Tier 3 cannot fail, so repair as a whole never does. A separate
//! line-level filter strips internal delegation narration from anything
//! citizen-facing.

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::domain::models::conversation::Language;
use crate::domain::models::result::SpecialistResult;
use crate::domain::models::specialist::Specialist;

/// Partially structured reply as the model was asked to produce it.
/// Every field except `message` is optional; absent fields get defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStructuredReply {
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub action_taken: Option<String>,
    #[serde(default)]
    pub requires_followup: Option<bool>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// Repairs and sanitizes raw model output.
pub struct ResultRepair {
    final_answer: Regex,
    narration: Vec<Regex>,
}

impl ResultRepair {
    pub fn new() -> Self {
        let narration = [
            r"(?i)^\s*as the .{0,60}\b(manager|coordinator|orchestrator|agent)\b",
            r"(?i)^\s*step\s+\d+\s*:",
            r"(?i)^\s*i am delegating",
            r"(?i)^\s*delegating (?:this |the )?(?:task |request )?to",
            r"(?i)^\s*thought\s*:",
            r"(?i)^\s*action(?:\s+input)?\s*:",
            r"(?i)^\s*observation\s*:",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("narration pattern is valid"))
        .collect();

        Self {
            final_answer: Regex::new(r"(?is)final\s+answer\s*[:\-]?\s*")
                .expect("final answer pattern is valid"),
            narration,
        }
    }

    /// Build a well-formed result from guardrail-accepted output.
    ///
    /// Accepted output may legitimately be bare prose (that is one of the
    /// acceptance conditions), so prose survives here as the message itself.
    /// `raw` is `None` when generation failed outright; that goes straight
    /// to the terminal fallback.
    pub fn repair(
        &self,
        specialist: Specialist,
        language: Language,
        raw: Option<&str>,
    ) -> SpecialistResult {
        self.repair_inner(specialist, language, raw, true)
    }

    /// Build a result from output the guardrail rejected (retries exhausted).
    ///
    /// Stricter than [`Self::repair`]: only the structured and
    /// marker-delimited tiers may salvage content; bare prose that already
    /// failed acceptance goes to the terminal fallback instead.
    pub fn repair_rejected(
        &self,
        specialist: Specialist,
        language: Language,
        raw: Option<&str>,
    ) -> SpecialistResult {
        self.repair_inner(specialist, language, raw, false)
    }

    fn repair_inner(
        &self,
        specialist: Specialist,
        language: Language,
        raw: Option<&str>,
        allow_prose: bool,
    ) -> SpecialistResult {
        let Some(raw) = raw else {
            return self.terminal_fallback(specialist, language, "generation_failed");
        };

        let cleaned = strip_markdown_fences(raw);

        // Tier 1: structured JSON with a non-empty message key.
        if let Some(reply) = extract_json_with_message(&cleaned)
            .filter(|reply| !reply.message.trim().is_empty())
        {
            debug!(specialist = %specialist, "repaired output from structured JSON");
            let message = self.sanitize_message(specialist, language, &reply.message);
            let language_tag = reply
                .language
                .as_deref()
                .and_then(Language::from_tag)
                .unwrap_or(language);
            let mut result = SpecialistResult::from_message(message, language_tag.as_tag())
                .with_raw_output(raw);
            result.action_taken = reply
                .action_taken
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "responded".to_string());
            result.requires_followup = reply.requires_followup.unwrap_or(false);
            result.tracking_number = reply.tracking_number.filter(|t| !t.trim().is_empty());
            return result;
        }

        // Tier 2: text behind a "final answer" marker.
        if let Some(tail) = self.extract_final_answer(&cleaned) {
            let message = self.sanitize_message(specialist, language, &tail);
            if !message.is_empty() {
                debug!(specialist = %specialist, "repaired output from final-answer marker");
                return SpecialistResult::from_message(message, language.as_tag())
                    .with_raw_output(raw);
            }
        }

        // Plain prose that survives sanitization is still usable, but only
        // for output the guardrail actually accepted.
        if allow_prose {
            let message = self.sanitize_message(specialist, language, &cleaned);
            if !message.trim().is_empty() {
                return SpecialistResult::from_message(message, language.as_tag())
                    .with_raw_output(raw);
            }
        }

        // Tier 3: nothing salvageable.
        self.terminal_fallback(specialist, language, "unusable_output")
            .with_raw_output(raw)
    }

    /// Strip internal delegation narration, line by line.
    ///
    /// If filtering removes everything, a short persona-consistent apology
    /// replaces the empty reply.
    pub fn sanitize_message(
        &self,
        specialist: Specialist,
        language: Language,
        message: &str,
    ) -> String {
        let kept: Vec<&str> = message
            .lines()
            .filter(|line| !self.narration.iter().any(|re| re.is_match(line)))
            .collect();
        let joined = kept.join("\n").trim().to_string();
        if joined.is_empty() && !message.trim().is_empty() {
            return specialist.filtered_fallback(language);
        }
        joined
    }

    /// Text following the last "final answer" marker, if any.
    pub fn extract_final_answer(&self, raw: &str) -> Option<String> {
        let m = self.final_answer.find_iter(raw).last()?;
        let tail = raw[m.end()..].trim();
        if tail.is_empty() {
            None
        } else {
            Some(tail.to_string())
        }
    }

    /// The tier-3 result. The GBV fallback embeds the emergency numbers.
    fn terminal_fallback(
        &self,
        specialist: Specialist,
        language: Language,
        error: &str,
    ) -> SpecialistResult {
        SpecialistResult::from_message(specialist.fallback_message(language), language.as_tag())
            .with_action("error")
            .with_followup(true)
            .with_error(error)
    }
}

impl Default for ResultRepair {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a single wrapping markdown code fence, if present.
///
/// Models often wrap JSON in ```json fences despite instructions.
pub fn strip_markdown_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6 {
        let start = trimmed.find('\n').map_or(3, |pos| pos + 1);
        let end = trimmed.rfind("\n```").unwrap_or(trimmed.len() - 3);
        if start < end {
            return trimmed[start..end].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Extract the first JSON object containing a `"message"` key.
///
/// Scans balanced braces from each opening brace; candidates must parse and
/// carry a message. String-literal braces are skipped correctly.
pub fn extract_json_with_message(raw: &str) -> Option<RawStructuredReply> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    while let Some(open) = raw[start..].find('{').map(|i| i + start) {
        if let Some(end) = balanced_object_end(bytes, open) {
            let candidate = &raw[open..=end];
            if candidate.contains("\"message\"") {
                if let Ok(reply) = serde_json::from_str::<RawStructuredReply>(candidate) {
                    return Some(reply);
                }
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the brace closing the object opened at `open`, respecting
/// string literals and escapes. `None` when unbalanced.
fn balanced_object_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::specialist::{EMERGENCY_GBV_COMMAND_CENTRE, EMERGENCY_SAPS};

    #[test]
    fn test_tier1_structured_json() {
        let repair = ResultRepair::new();
        let raw = r#"Here you go: {"message": "Your ticket TKT-20260101-AAAAAA is open.", "language": "en", "action_taken": "status_provided", "requires_followup": false, "tracking_number": "TKT-20260101-AAAAAA"}"#;
        let result = repair.repair(Specialist::TicketStatus, Language::En, Some(raw));
        assert_eq!(result.message, "Your ticket TKT-20260101-AAAAAA is open.");
        assert_eq!(result.action_taken, "status_provided");
        assert_eq!(result.tracking_number.as_deref(), Some("TKT-20260101-AAAAAA"));
        assert!(!result.is_error());
    }

    #[test]
    fn test_tier1_handles_fenced_json() {
        let repair = ResultRepair::new();
        let raw = "```json\n{\"message\": \"Thanks, your report is logged.\"}\n```";
        let result = repair.repair(Specialist::Municipal, Language::En, Some(raw));
        assert_eq!(result.message, "Thanks, your report is logged.");
    }

    #[test]
    fn test_tier1_nested_braces_in_strings() {
        let raw = r#"{"message": "use {curly} braces", "action_taken": "responded"}"#;
        let reply = extract_json_with_message(raw).unwrap();
        assert_eq!(reply.message, "use {curly} braces");
    }

    #[test]
    fn test_tier1_skips_json_without_message() {
        let raw = r#"{"status": "ok"} and then {"message": "real one"}"#;
        let reply = extract_json_with_message(raw).unwrap();
        assert_eq!(reply.message, "real one");
    }

    #[test]
    fn test_tier2_final_answer_marker() {
        let repair = ResultRepair::new();
        let raw = "Thought: the resident asked about water.\nFinal Answer: We have logged your water problem and a team will visit tomorrow.";
        let result = repair.repair(Specialist::Municipal, Language::En, Some(raw));
        assert_eq!(
            result.message,
            "We have logged your water problem and a team will visit tomorrow."
        );
        assert!(!result.is_error());
    }

    #[test]
    fn test_tier2_case_insensitive_marker() {
        let repair = ResultRepair::new();
        assert_eq!(
            repair.extract_final_answer("FINAL ANSWER - all done here").as_deref(),
            Some("all done here")
        );
    }

    #[test]
    fn test_tier3_fallback_on_garbage() {
        let repair = ResultRepair::new();
        let result = repair.repair(Specialist::Municipal, Language::Af, Some("   \n  "));
        assert!(result.is_error());
        assert_eq!(result.language, "af");
        assert!(result.message.contains("Jammer"));
    }

    #[test]
    fn test_tier3_fallback_on_missing_output() {
        let repair = ResultRepair::new();
        let result = repair.repair(Specialist::Gbv, Language::En, None);
        assert!(result.is_error());
        assert!(result.message.contains(EMERGENCY_SAPS));
        assert!(result.message.contains(EMERGENCY_GBV_COMMAND_CENTRE));
    }

    #[test]
    fn test_narration_lines_are_stripped() {
        let repair = ResultRepair::new();
        let message = "As the Municipal Services Manager, I will handle this.\n\
                       Step 1: delegate to intake.\n\
                       I am delegating to the ticket team.\n\
                       Your report is logged, reference TKT-20260101-AAAAAA.";
        let sanitized = repair.sanitize_message(Specialist::Municipal, Language::En, message);
        assert_eq!(sanitized, "Your report is logged, reference TKT-20260101-AAAAAA.");
    }

    #[test]
    fn test_fully_narrated_output_gets_apology() {
        let repair = ResultRepair::new();
        let message = "As the Intake Manager, I am on it.\nStep 1: classify.\nStep 2: dispatch.";
        let sanitized = repair.sanitize_message(Specialist::Municipal, Language::En, message);
        assert!(!sanitized.is_empty());
        assert!(!sanitized.to_lowercase().contains("step"));
    }

    #[test]
    fn test_plain_prose_passes_through() {
        let repair = ResultRepair::new();
        let raw = "Your electricity report has been captured and the team was notified.";
        let result = repair.repair(Specialist::Municipal, Language::En, Some(raw));
        assert_eq!(result.message, raw);
    }

    #[test]
    fn test_rejected_prose_goes_to_fallback() {
        let repair = ResultRepair::new();
        let result = repair.repair_rejected(Specialist::Municipal, Language::En, Some("z"));
        assert!(result.is_error());
    }

    #[test]
    fn test_rejected_structured_output_still_salvages() {
        let repair = ResultRepair::new();
        let raw = r#"{"message": "I hear you and I am here with you."}"#;
        let result = repair.repair_rejected(Specialist::Gbv, Language::En, Some(raw));
        assert!(!result.is_error());
        assert_eq!(result.message, "I hear you and I am here with you.");
    }

    #[test]
    fn test_strip_markdown_fences() {
        assert_eq!(strip_markdown_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markdown_fences("no fences"), "no fences");
        assert_eq!(strip_markdown_fences("``````"), "``````");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Repair is the last line of defense; it must absorb anything.
            #[test]
            fn repair_always_yields_a_message(raw in ".{0,200}") {
                let repair = ResultRepair::new();
                let result = repair.repair(Specialist::Gbv, Language::En, Some(&raw));
                prop_assert!(!result.message.trim().is_empty());
            }

            #[test]
            fn extraction_never_panics(raw in ".{0,300}") {
                let _ = extract_json_with_message(&raw);
                let _ = strip_markdown_fences(&raw);
            }
        }
    }
}
