//! `gugu chat` subcommand: interactive demo transport over the session router.
//!
//! Wires the router to in-memory collaborators and either the Claude-backed
//! generation adapter or an offline canned generator (`--mock`). This is a
//! development harness; the production transport is a separate service.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use console::style;
use tracing::info;

use crate::application::SpecialistExecutor;
use crate::domain::models::conversation::{AuthSnapshot, SessionStatus, TurnRequest};
use crate::domain::models::specialist::{EMERGENCY_GBV_COMMAND_CENTRE, EMERGENCY_SAPS};
use crate::domain::ports::generation::{GenerationCapability, GenerationError, GenerationRequest};
use crate::domain::ports::tools::{CitizenDirectory, ToolBinding, ToolSet};
use crate::infrastructure::claude::ClaudeGeneration;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::memory::{
    InMemoryDirectory, InMemoryOtpGateway, InMemorySessionStore, InMemoryTicketStore,
    RecordingEmergencyNotifier,
};
use crate::services::{
    IntentClassifier, LanguageDetector, OutputGuardrail, SessionRouter,
};

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Contact the demo citizen chats from.
    #[arg(long, default_value = "+27820000001")]
    pub contact: String,

    /// Start the session already authenticated.
    #[arg(long)]
    pub authenticated: bool,

    /// Use the offline canned generator instead of the Claude API.
    #[arg(long)]
    pub mock: bool,

    /// API key; falls back to the ANTHROPIC_API_KEY environment variable.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

pub async fn execute(args: ChatArgs, _json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;

    let directory = Arc::new(InMemoryDirectory::new());
    let otp = Arc::new(InMemoryOtpGateway::with_fixed_code("123456"));
    let tickets = Arc::new(InMemoryTicketStore::new());
    let emergency = Arc::new(RecordingEmergencyNotifier::new());
    let store = Arc::new(InMemorySessionStore::new());

    let mut user_id = None;
    if args.authenticated {
        let id = directory.seed(&args.contact, config.language.default_language).await;
        otp.register_known_user(&args.contact, &id).await;
        user_id = Some(id);
    }

    let generation: Arc<dyn GenerationCapability> = if args.mock {
        Arc::new(CannedGeneration)
    } else {
        let api_key = args
            .api_key
            .clone()
            .context("an API key is required unless --mock is used")?;
        Arc::new(ClaudeGeneration::new(&config.generation, api_key)?)
    };

    let tools = ToolSet {
        otp: otp.clone(),
        directory: directory.clone(),
        tickets,
        emergency: emergency.clone(),
    };

    let router = SessionRouter::new(
        store,
        LanguageDetector::new(config.language.clone()),
        IntentClassifier::new(generation.clone()),
        SpecialistExecutor::new(generation, tools, OutputGuardrail::new(config.guardrail.clone())),
        config.language.default_language,
    );

    let session_id = format!("cli-{}", uuid::Uuid::new_v4());
    info!(session_id = %session_id, mock = args.mock, "chat session started");

    println!(
        "{} type a message, or 'quit' to leave (demo OTP code is 123456)",
        style("gugu chat:").bold().cyan()
    );

    let stdin = std::io::stdin();
    let mut history = String::new();
    let mut session_status = if args.authenticated {
        SessionStatus::Active
    } else {
        SessionStatus::None
    };

    loop {
        print!("{} ", style("you>").bold().green());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim().to_string();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        let result = router
            .route_turn(TurnRequest {
                session_id: session_id.clone(),
                contact: args.contact.clone(),
                tenant_id: config.tenant.id.clone(),
                message: message.clone(),
                conversation_history: history.clone(),
                auth: AuthSnapshot {
                    user_exists: user_id.is_some(),
                    session_status,
                    user_id: user_id.clone(),
                },
            })
            .await;

        println!("{} {}", style("gugu>").bold().cyan(), result.message);

        // The demo plays the external auth collaborator: once the auth
        // handler reports success, the session becomes active.
        if result.agent_name == "auth" && result.action_taken == "authenticated" {
            session_status = SessionStatus::Active;
            if user_id.is_none() {
                if let Ok(Some(record)) = directory.lookup_user(&args.contact).await {
                    user_id = Some(record.user_id);
                }
            }
            println!("{}", style("(session authenticated)").dim());
        } else if session_status == SessionStatus::None && result.agent_name == "auth" {
            session_status = SessionStatus::OtpPending;
        }

        history.push_str(&format!("citizen: {message}\ngugu: {}\n", result.message));
    }

    let notified = emergency.recorded().await;
    if !notified.is_empty() {
        println!(
            "{} {} emergency notification(s) were recorded this session",
            style("note:").bold().yellow(),
            notified.len()
        );
    }

    Ok(())
}

/// Offline generator producing guardrail-compliant canned replies, so the
/// whole pipeline can be exercised without network access.
struct CannedGeneration;

#[async_trait]
impl GenerationCapability for CannedGeneration {
    async fn invoke(
        &self,
        request: GenerationRequest,
        _tools: Option<&ToolBinding>,
    ) -> Result<String, GenerationError> {
        // Classification requests are the only single-shot, tool-less calls.
        // Only the citizen's message (after the "Message:" header) is
        // matched; the instruction itself names every label.
        if request.max_turns == 1 && request.allowed_tools.is_empty() {
            let task = request.task.to_lowercase();
            let message = task.split("message:").nth(1).unwrap_or("");
            let label = if ["abuse", "unsafe", "hurt", "scared", "violence"]
                .iter()
                .any(|term| message.contains(term))
            {
                "gbv"
            } else if message.contains("tkt-") {
                "ticket_status"
            } else {
                "municipal"
            };
            return Ok(label.to_string());
        }

        let message = if request.persona.contains(EMERGENCY_SAPS) {
            format!(
                "I hear you, and you are not alone. If you are in danger call \
                 {EMERGENCY_SAPS} now. The GBV Command Centre ({EMERGENCY_GBV_COMMAND_CENTRE}) \
                 is free, 24 hours. Can you tell me what kind of incident this is?"
            )
        } else {
            "Thank you, I have noted that. Could you share the location of the problem?"
                .to_string()
        };

        Ok(serde_json::json!({
            "message": message,
            "action_taken": "collecting",
            "requires_followup": true
        })
        .to_string())
    }
}
