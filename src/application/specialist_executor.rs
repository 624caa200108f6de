//! Specialist invocation: generation, guardrail-bounded retry, repair, and
//! the safety overrides that must hold no matter what the model produced.
//!
//! Every failure is absorbed here. Nothing above this boundary ever sees an
//! error from the generation capability or a tool; the worst case is a
//! persona-consistent apology, which for GBV still carries the emergency
//! numbers.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::models::conversation::{Language, SessionStatus};
use crate::domain::models::result::SpecialistResult;
use crate::domain::models::specialist::{
    emergency_footer, is_valid_tracking_number, Specialist, TaskContext,
};
use crate::domain::ports::generation::{GenerationCapability, GenerationRequest};
use crate::domain::ports::tools::{ToolBinding, ToolContext, ToolSet};
use crate::services::guardrails::{contains_both_emergency_numbers, OutputGuardrail};
use crate::services::repair::ResultRepair;

/// Everything a specialist needs to run one turn.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub specialist: Specialist,
    pub language: Language,
    pub contact: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub message: String,
    pub conversation_history: String,
    pub user_exists: bool,
    pub session_status: SessionStatus,
}

/// Runs specialists against the generation capability.
pub struct SpecialistExecutor {
    generation: Arc<dyn GenerationCapability>,
    tools: ToolSet,
    guardrail: OutputGuardrail,
    repair: ResultRepair,
}

impl SpecialistExecutor {
    pub fn new(
        generation: Arc<dyn GenerationCapability>,
        tools: ToolSet,
        guardrail: OutputGuardrail,
    ) -> Self {
        Self {
            generation,
            tools,
            guardrail,
            repair: ResultRepair::new(),
        }
    }

    /// Execute one specialist turn. Infallible by contract: every generation
    /// or tool failure ends in a well-formed result.
    pub async fn execute(&self, ctx: &DispatchContext) -> SpecialistResult {
        let specialist = ctx.specialist;
        let persona = specialist.persona(ctx.language);
        let base_task = specialist.task(&TaskContext {
            contact: &ctx.contact,
            tenant_id: &ctx.tenant_id,
            language: ctx.language,
            message: &ctx.message,
            conversation_history: &ctx.conversation_history,
            user_exists: ctx.user_exists,
            session_status: ctx.session_status,
        });
        let allowed: Vec<String> = specialist
            .allowed_tools()
            .iter()
            .map(|t| (*t).to_string())
            .collect();
        let binding = ToolBinding::new(
            self.tools.clone(),
            ToolContext {
                contact: ctx.contact.clone(),
                user_id: ctx.user_id.clone(),
                tenant_id: ctx.tenant_id.clone(),
                language: ctx.language,
            },
            allowed.clone(),
        );

        let mut task = base_task.clone();
        let mut last_raw: Option<String> = None;
        let attempts = self.guardrail.max_retries() + 1;

        for attempt in 0..attempts {
            let request = GenerationRequest {
                persona: persona.clone(),
                task: task.clone(),
                allowed_tools: allowed.clone(),
                history: ctx.conversation_history.clone(),
                max_turns: specialist.max_turns(),
            };

            match self.generation.invoke(request, Some(&binding)).await {
                Ok(raw) => {
                    let verdict = self.guardrail.check(specialist, &raw);
                    if verdict.accepted {
                        debug!(specialist = %specialist, attempt, "output accepted");
                        let mut result = self.repair.repair(specialist, ctx.language, Some(&raw));
                        self.finalize(specialist, ctx.language, &mut result);
                        return result;
                    }
                    warn!(specialist = %specialist, attempt, "guardrail rejected output");
                    last_raw = Some(raw);
                    if let Some(prompt) = verdict.retry_prompt {
                        task = format!("{base_task}\n\n{prompt}");
                    }
                }
                Err(err) => {
                    warn!(specialist = %specialist, attempt, error = %err, "generation failed");
                }
            }
        }

        // Retries exhausted: salvage the last rejected output if the strict
        // repair tiers can, otherwise the terminal fallback fires.
        info!(specialist = %specialist, "retries exhausted, repairing last output");
        let mut result = self
            .repair
            .repair_rejected(specialist, ctx.language, last_raw.as_deref());
        self.finalize(specialist, ctx.language, &mut result);
        result
    }

    /// Deterministic post-processing applied to every result.
    ///
    /// The GBV overrides are safety rules, not defaults: they apply even
    /// when the structured output said otherwise.
    fn finalize(&self, specialist: Specialist, language: Language, result: &mut SpecialistResult) {
        result.agent_name = specialist.agent_name().to_string();

        if let Some(tracking) = result.tracking_number.take() {
            if is_valid_tracking_number(&tracking) {
                result.tracking_number = Some(tracking);
            } else {
                warn!(specialist = %specialist, "dropping malformed tracking number from output");
            }
        }

        if specialist == Specialist::Gbv {
            result.category = Some("gbv".to_string());
            result.requires_followup = true;
            if !contains_both_emergency_numbers(&result.message) {
                result.message =
                    format!("{}\n\n{}", result.message.trim_end(), emergency_footer(language));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::domain::models::specialist::{EMERGENCY_GBV_COMMAND_CENTRE, EMERGENCY_SAPS};
    use crate::domain::ports::generation::GenerationError;
    use crate::domain::ports::tools::{
        CitizenDirectory, CitizenRecord, CreateTicketRequest, EmergencyNotification,
        EmergencyNotifier, NewCitizen, OtpChannel, OtpGateway, OtpOutcome, TicketReceipt,
        TicketStore, TicketSummary, ToolError,
    };

    struct ScriptedGeneration {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGeneration {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationCapability for ScriptedGeneration {
        async fn invoke(
            &self,
            _request: GenerationRequest,
            _tools: Option<&ToolBinding>,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Timeout))
        }
    }

    struct NoopOtp;

    #[async_trait]
    impl OtpGateway for NoopOtp {
        async fn send_otp(
            &self,
            _contact: &str,
            _channel: OtpChannel,
            _is_returning: bool,
        ) -> Result<String, ToolError> {
            Ok("sent".to_string())
        }

        async fn verify_otp(&self, _contact: &str, _code: &str) -> Result<OtpOutcome, ToolError> {
            Ok(OtpOutcome::Verified { user_id: None })
        }
    }

    struct NoopDirectory;

    #[async_trait]
    impl CitizenDirectory for NoopDirectory {
        async fn lookup_user(&self, _contact: &str) -> Result<Option<CitizenRecord>, ToolError> {
            Ok(None)
        }

        async fn create_user(&self, _citizen: NewCitizen) -> Result<String, ToolError> {
            Ok("user-1".to_string())
        }
    }

    struct NoopTickets;

    #[async_trait]
    impl TicketStore for NoopTickets {
        async fn create_ticket(
            &self,
            _request: CreateTicketRequest,
        ) -> Result<TicketReceipt, ToolError> {
            Ok(TicketReceipt {
                id: "t-1".to_string(),
                tracking_number: "TKT-20260101-AAAAAA".to_string(),
                status: "open".to_string(),
            })
        }

        async fn lookup_tickets(
            &self,
            _user_id: &str,
            _tracking_number: Option<&str>,
        ) -> Result<Vec<TicketSummary>, ToolError> {
            Ok(vec![])
        }
    }

    struct NoopEmergency;

    #[async_trait]
    impl EmergencyNotifier for NoopEmergency {
        async fn notify(&self, _notification: EmergencyNotification) -> Result<String, ToolError> {
            Ok("ack".to_string())
        }
    }

    fn toolset() -> ToolSet {
        ToolSet {
            otp: Arc::new(NoopOtp),
            directory: Arc::new(NoopDirectory),
            tickets: Arc::new(NoopTickets),
            emergency: Arc::new(NoopEmergency),
        }
    }

    fn dispatch_ctx(specialist: Specialist) -> DispatchContext {
        DispatchContext {
            specialist,
            language: Language::En,
            contact: "+27820000000".to_string(),
            tenant_id: "ethekwini".to_string(),
            user_id: Some("user-1".to_string()),
            message: "hello".to_string(),
            conversation_history: String::new(),
            user_exists: true,
            session_status: SessionStatus::Active,
        }
    }

    fn executor(generation: Arc<ScriptedGeneration>) -> SpecialistExecutor {
        SpecialistExecutor::new(generation, toolset(), OutputGuardrail::with_defaults())
    }

    #[tokio::test]
    async fn test_accepted_output_passes_through_once() {
        let generation = Arc::new(ScriptedGeneration::new(vec![Ok(
            r#"{"message": "Your report is logged.", "action_taken": "collecting"}"#.to_string(),
        )]));
        let exec = executor(generation.clone());

        let result = exec.execute(&dispatch_ctx(Specialist::Municipal)).await;
        assert_eq!(result.message, "Your report is logged.");
        assert_eq!(result.agent_name, "municipal");
        assert_eq!(generation.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_retries_then_accepts() {
        let generation = Arc::new(ScriptedGeneration::new(vec![
            Ok("ok".to_string()), // structurally rejected
            Ok(r#"{"message": "Second attempt went through fine."}"#.to_string()),
        ]));
        let exec = executor(generation.clone());

        let result = exec.execute(&dispatch_ctx(Specialist::Municipal)).await;
        assert_eq!(result.message, "Second attempt went through fine.");
        assert_eq!(generation.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let generation = Arc::new(ScriptedGeneration::new(vec![
            Ok("x".to_string()),
            Ok("y".to_string()),
            Ok("z".to_string()),
            Ok("never reached".to_string()),
        ]));
        let exec = executor(generation.clone());

        let result = exec.execute(&dispatch_ctx(Specialist::Municipal)).await;
        // 1 initial + 2 retries, never more.
        assert_eq!(generation.call_count(), 3);
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_total_generation_failure_yields_fallback() {
        let generation = Arc::new(ScriptedGeneration::new(vec![]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::Municipal)).await;
        assert!(result.is_error());
        assert!(!result.message.is_empty());
        assert_eq!(result.agent_name, "municipal");
    }

    #[tokio::test]
    async fn test_gbv_total_failure_keeps_emergency_numbers() {
        let generation = Arc::new(ScriptedGeneration::new(vec![]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::Gbv)).await;
        assert!(result.message.contains(EMERGENCY_SAPS));
        assert!(result.message.contains(EMERGENCY_GBV_COMMAND_CENTRE));
        assert_eq!(result.category.as_deref(), Some("gbv"));
        assert!(result.requires_followup);
    }

    #[tokio::test]
    async fn test_gbv_overrides_contradicting_output() {
        // Model claims no follow-up and omits one number; overrides win.
        let generation = Arc::new(ScriptedGeneration::new(vec![Ok(format!(
            r#"{{"message": "You can call {EMERGENCY_SAPS} any time, day or night.", "requires_followup": false, "category": "municipal"}}"#
        ))]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::Gbv)).await;
        assert!(result.requires_followup);
        assert_eq!(result.category.as_deref(), Some("gbv"));
        assert!(result.message.contains(EMERGENCY_SAPS));
        assert!(result.message.contains(EMERGENCY_GBV_COMMAND_CENTRE));
    }

    #[tokio::test]
    async fn test_gbv_rejected_then_repaired_keeps_numbers() {
        // Every attempt misses the numbers; salvage path must still comply.
        let generation = Arc::new(ScriptedGeneration::new(vec![
            Ok(r#"{"message": "I hear you and I believe you, thank you for telling me."}"#
                .to_string()),
            Ok(r#"{"message": "You are very brave for reaching out to us today."}"#.to_string()),
            Ok(r#"{"message": "Please know that support is available for you."}"#.to_string()),
        ]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::Gbv)).await;
        assert!(result.message.contains(EMERGENCY_SAPS));
        assert!(result.message.contains(EMERGENCY_GBV_COMMAND_CENTRE));
    }

    #[tokio::test]
    async fn test_malformed_tracking_number_is_dropped() {
        let generation = Arc::new(ScriptedGeneration::new(vec![Ok(
            r#"{"message": "Here is your reference number.", "tracking_number": "ABC-123"}"#
                .to_string(),
        )]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::TicketStatus)).await;
        assert_eq!(result.tracking_number, None);
    }

    #[tokio::test]
    async fn test_valid_tracking_number_is_kept() {
        let generation = Arc::new(ScriptedGeneration::new(vec![Ok(
            r#"{"message": "Your ticket is open.", "tracking_number": "TKT-20260101-AAAAAA"}"#
                .to_string(),
        )]));
        let exec = executor(generation);

        let result = exec.execute(&dispatch_ctx(Specialist::TicketStatus)).await;
        assert_eq!(result.tracking_number.as_deref(), Some("TKT-20260101-AAAAAA"));
    }
}
