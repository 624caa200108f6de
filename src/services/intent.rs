//! Two-stage intent classification.
//!
//! Stage 1 is a deterministic pre-filter for the adversarial SAPS pattern:
//! residents describing abuse as a complaint about the officers handling
//! "my case" must reach the GBV handler, not ticket status. When it fires,
//! the generation capability is never invoked. Stage 2 is model-backed
//! single-shot labeling with a hard default for anything unrecognized.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::models::conversation::Intent;
use crate::domain::models::prompts;
use crate::domain::ports::generation::{GenerationCapability, GenerationRequest};

/// Police/officer-role terms. Matching is exact-substring on lowercased
/// text; the list is deliberately narrow to avoid false positives on
/// mundane municipal complaints that merely mention the police.
const POLICE_ROLE_TERMS: &[&str] = &[
    "saps officer",
    "police officer",
    "detective",
    "investigating officer",
    "case officer",
    "station commander",
    "warrant officer",
    "constable",
    "sergeant",
];

/// Personal-case-ownership terms. A bare "report to SAPS" must not trigger;
/// the resident has to be talking about a case of their own.
const CASE_OWNERSHIP_TERMS: &[&str] = &[
    "my case",
    "my report",
    "my docket",
    "my statement",
    "assigned to",
    "case number",
];

/// Intent classifier over the generation capability.
pub struct IntentClassifier {
    generation: Arc<dyn GenerationCapability>,
}

impl IntentClassifier {
    pub fn new(generation: Arc<dyn GenerationCapability>) -> Self {
        Self { generation }
    }

    /// Classify a raw citizen message into one of the four intents.
    ///
    /// Classification never fails: generation errors and unrecognized labels
    /// both fall back to `Intent::Municipal`, the least-harmful default (an
    /// unrelated message lands in a human-reviewable queue instead of being
    /// dropped).
    pub async fn classify(&self, message: &str) -> Intent {
        if saps_context_prefilter(message) {
            debug!("adversarial police-context pattern matched, routing to gbv");
            return Intent::Gbv;
        }

        let request = GenerationRequest::single_shot(
            prompts::CLASSIFIER_PERSONA,
            prompts::classification_task(message),
        );

        match self.generation.invoke(request, None).await {
            Ok(label) => match Intent::parse_label(&label) {
                Some(intent) => intent,
                None => {
                    warn!(label = %label.trim(), "unrecognized intent label, defaulting to municipal");
                    Intent::Municipal
                }
            },
            Err(err) => {
                warn!(error = %err, "classification generation failed, defaulting to municipal");
                Intent::Municipal
            }
        }
    }
}

/// Deterministic adversarial pre-filter.
///
/// Fires only on the conjunction of a police-role term and a
/// personal-case-ownership term, both case-insensitive.
pub fn saps_context_prefilter(message: &str) -> bool {
    let lower = message.to_lowercase();
    let has_role = POLICE_ROLE_TERMS.iter().any(|term| lower.contains(term));
    if !has_role {
        return false;
    }
    CASE_OWNERSHIP_TERMS.iter().any(|term| lower.contains(term))
}
