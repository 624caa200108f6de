//! Claude-backed implementation of the generation capability.
//!
//! Runs the agentic loop: send the persona/task, execute any tool calls the
//! model requests through the bound tool set, feed the results back, and
//! stop at `end_turn` or once `max_turns` iterations have run.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::client::MessagesClient;
use super::error::ClaudeApiError;
use super::types::{ContentBlock, Message, MessageRequest, ToolDefinition};
use crate::domain::models::config::GenerationConfig;
use crate::domain::ports::generation::{GenerationCapability, GenerationError, GenerationRequest};
use crate::domain::ports::tools::ToolBinding;

/// Generation capability backed by the Claude Messages API.
pub struct ClaudeGeneration {
    client: MessagesClient,
    model: String,
    max_tokens: u32,
}

impl ClaudeGeneration {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, ClaudeApiError> {
        Ok(Self {
            client: MessagesClient::new(config, api_key)?,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl GenerationCapability for ClaudeGeneration {
    async fn invoke(
        &self,
        request: GenerationRequest,
        tools: Option<&ToolBinding>,
    ) -> Result<String, GenerationError> {
        let tool_definitions: Vec<ToolDefinition> = request
            .allowed_tools
            .iter()
            .filter_map(|name| tool_definition(name))
            .collect();

        let mut messages = Vec::new();
        if !request.history.is_empty() {
            messages.push(Message::user_text(format!(
                "Earlier conversation:\n{}",
                request.history
            )));
        }
        messages.push(Message::user_text(request.task.clone()));

        for turn in 0..request.max_turns {
            let api_request = MessageRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                max_tokens: self.max_tokens,
                system: Some(request.persona.clone()),
                temperature: None,
                tools: if tool_definitions.is_empty() {
                    None
                } else {
                    Some(tool_definitions.clone())
                },
            };

            let response = self.client.send(&api_request).await.map_err(map_error)?;

            let requested_tools = response.tool_uses();
            if requested_tools.is_empty() || response.stop_reason.as_deref() != Some("tool_use") {
                return Ok(response.text());
            }

            let Some(binding) = tools else {
                warn!("model requested tools but none are bound, returning text as-is");
                return Ok(response.text());
            };

            debug!(turn, count = requested_tools.len(), "executing requested tool calls");
            let mut results = Vec::with_capacity(requested_tools.len());
            for (id, name, input) in requested_tools {
                let output = binding.execute(name, input).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: output,
                });
            }

            messages.push(Message::assistant(response.content.clone()));
            messages.push(Message::tool_results(results));
        }

        Err(GenerationError::TurnsExhausted {
            max_turns: request.max_turns,
        })
    }
}

fn map_error(err: ClaudeApiError) -> GenerationError {
    match err {
        ClaudeApiError::Timeout => GenerationError::Timeout,
        other => GenerationError::Transport(other.to_string()),
    }
}

/// Input schema for each named tool capability.
///
/// Contact, user id, and tenant are injected from the session at dispatch
/// time, so none of them appear in any schema the model sees.
fn tool_definition(name: &str) -> Option<ToolDefinition> {
    let (description, schema) = match name {
        "send_otp" => (
            "Send a one-time password to the resident's contact on file.",
            json!({
                "type": "object",
                "properties": {
                    "channel": {"type": "string", "enum": ["sms", "whatsapp", "email"]},
                    "is_returning": {"type": "boolean"}
                },
                "required": []
            }),
        ),
        "verify_otp" => (
            "Verify a one-time password the resident typed in.",
            json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string"}
                },
                "required": ["code"]
            }),
        ),
        "lookup_user" => (
            "Look up whether an account exists for the resident's contact.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        "create_user" => (
            "Create an account for the resident after OTP verification.",
            json!({
                "type": "object",
                "properties": {
                    "full_name": {"type": "string"}
                },
                "required": ["full_name"]
            }),
        ),
        "create_ticket" => (
            "Open a service ticket once category, description, and location are known.",
            json!({
                "type": "object",
                "properties": {
                    "category": {"type": "string"},
                    "description": {"type": "string"},
                    "location": {"type": "string"},
                    "severity": {"type": "string", "enum": ["low", "normal", "high", "critical"]}
                },
                "required": ["category", "description"]
            }),
        ),
        "lookup_tickets" => (
            "Look up the resident's tickets, optionally by tracking number.",
            json!({
                "type": "object",
                "properties": {
                    "tracking_number": {"type": "string"}
                },
                "required": []
            }),
        ),
        "notify_emergency" => (
            "Notify the emergency response team. Only non-identifying fields.",
            json!({
                "type": "object",
                "properties": {
                    "ticket_id": {"type": "string"},
                    "tracking_number": {"type": "string"},
                    "incident_type": {"type": "string"},
                    "general_area": {"type": "string"},
                    "immediate_danger": {"type": "boolean"}
                },
                "required": ["ticket_id", "tracking_number", "incident_type"]
            }),
        ),
        other => {
            warn!(tool = other, "no definition for requested tool");
            return None;
        }
    };

    Some(ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema,
    })
}
