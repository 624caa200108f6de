//! Port traits for the narrow tool capabilities the generation capability may
//! invoke, plus the dispatcher that executes named tool calls.
//!
//! Tool failures never raise into the router: the dispatcher renders every
//! outcome, success or failure, as plain text for the model so the flow can
//! recover conversationally.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::models::conversation::Language;

/// Failure taxonomy for collaborator tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The collaborator cannot be reached or is down.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request (validation, throttling).
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Delivery channel for one-time passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Sms,
    Whatsapp,
    Email,
}

impl OtpChannel {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "email" => Self::Email,
            "whatsapp" => Self::Whatsapp,
            _ => Self::Sms,
        }
    }
}

/// Outcome of an OTP verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpOutcome {
    /// Code accepted. `user_id` is present for returning residents.
    Verified { user_id: Option<String> },
    /// Code refused, with a model-facing reason.
    Rejected { reason: String },
}

/// Known resident on file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenRecord {
    pub user_id: String,
    pub role: String,
    pub language: Language,
}

/// New resident to register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCitizen {
    pub contact: String,
    pub full_name: String,
    pub tenant_id: String,
    pub language: Language,
}

/// Request to open a service ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub category: String,
    pub description: String,
    pub user_id: String,
    pub tenant_id: String,
    pub language: Language,
    pub severity: String,
    pub location: Option<String>,
}

/// Receipt for a created ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub id: String,
    pub tracking_number: String,
    pub status: String,
}

/// Summary of an existing ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSummary {
    pub tracking_number: String,
    pub category: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for the emergency-response collaborator.
///
/// Deliberately has no fields for a name, phone number, or street address:
/// victim-identifying data cannot flow to third parties by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyNotification {
    pub ticket_id: String,
    pub tracking_number: String,
    pub incident_type: String,
    pub general_area: String,
    pub immediate_danger: bool,
    pub tenant_id: String,
}

/// OTP delivery and verification.
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Send a one-time password. Returns a model-facing status string.
    async fn send_otp(
        &self,
        contact: &str,
        channel: OtpChannel,
        is_returning: bool,
    ) -> Result<String, ToolError>;

    /// Verify a one-time password.
    async fn verify_otp(&self, contact: &str, code: &str) -> Result<OtpOutcome, ToolError>;
}

/// Resident account lookup and creation.
#[async_trait]
pub trait CitizenDirectory: Send + Sync {
    async fn lookup_user(&self, contact: &str) -> Result<Option<CitizenRecord>, ToolError>;

    /// Create an account, returning the new user id.
    async fn create_user(&self, citizen: NewCitizen) -> Result<String, ToolError>;
}

/// Ticket persistence collaborator.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create_ticket(&self, request: CreateTicketRequest) -> Result<TicketReceipt, ToolError>;

    /// Look up tickets for a user, optionally narrowed to one tracking number.
    async fn lookup_tickets(
        &self,
        user_id: &str,
        tracking_number: Option<&str>,
    ) -> Result<Vec<TicketSummary>, ToolError>;
}

/// Emergency-response notification collaborator.
#[async_trait]
pub trait EmergencyNotifier: Send + Sync {
    /// Notify the emergency responder. Returns an acknowledgement string.
    async fn notify(&self, notification: EmergencyNotification) -> Result<String, ToolError>;
}

/// Session context injected into tool calls.
///
/// Contact, user id, and tenant come from the session, never from model
/// arguments: the model cannot redirect a tool at another resident.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub contact: String,
    pub user_id: Option<String>,
    pub tenant_id: String,
    pub language: Language,
}

/// Bundle of collaborator ports with a named-dispatch entry point.
#[derive(Clone)]
pub struct ToolSet {
    pub otp: Arc<dyn OtpGateway>,
    pub directory: Arc<dyn CitizenDirectory>,
    pub tickets: Arc<dyn TicketStore>,
    pub emergency: Arc<dyn EmergencyNotifier>,
}

impl ToolSet {
    /// Execute a named tool call with JSON arguments from the model.
    ///
    /// Never fails: unknown tools, disallowed tools, bad arguments, and
    /// collaborator errors all come back as plain text the model can relay
    /// or recover from.
    pub async fn execute(
        &self,
        name: &str,
        args: &Value,
        allowed: &[String],
        ctx: &ToolContext,
    ) -> String {
        if !allowed.iter().any(|t| t == name) {
            warn!(tool = name, "tool call refused: not allowed for this handler");
            return format!("ERROR: tool '{name}' is not available here");
        }

        debug!(tool = name, "executing tool call");
        match self.dispatch(name, args, ctx).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                format!("ERROR: {err}")
            }
        }
    }

    async fn dispatch(&self, name: &str, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        match name {
            "send_otp" => {
                let channel = OtpChannel::parse(str_arg(args, "channel").unwrap_or("sms"));
                let is_returning = args
                    .get("is_returning")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                self.otp.send_otp(&ctx.contact, channel, is_returning).await
            }
            "verify_otp" => {
                let code = str_arg(args, "code")
                    .ok_or_else(|| ToolError::Rejected("missing 'code' argument".to_string()))?;
                match self.otp.verify_otp(&ctx.contact, code).await? {
                    OtpOutcome::Verified { user_id } => Ok(match user_id {
                        Some(id) => format!("verified, user id {id}"),
                        None => "verified".to_string(),
                    }),
                    OtpOutcome::Rejected { reason } => Ok(format!("not verified: {reason}")),
                }
            }
            "lookup_user" => match self.directory.lookup_user(&ctx.contact).await? {
                Some(record) => Ok(format!(
                    "found: user id {}, role {}",
                    record.user_id, record.role
                )),
                None => Ok("not found".to_string()),
            },
            "create_user" => {
                let full_name = str_arg(args, "full_name")
                    .ok_or_else(|| ToolError::Rejected("missing 'full_name' argument".to_string()))?;
                let user_id = self
                    .directory
                    .create_user(NewCitizen {
                        contact: ctx.contact.clone(),
                        full_name: full_name.to_string(),
                        tenant_id: ctx.tenant_id.clone(),
                        language: ctx.language,
                    })
                    .await?;
                Ok(format!("created, user id {user_id}"))
            }
            "create_ticket" => {
                let user_id = ctx
                    .user_id
                    .clone()
                    .ok_or_else(|| ToolError::Rejected("no authenticated user".to_string()))?;
                let category = str_arg(args, "category")
                    .ok_or_else(|| ToolError::Rejected("missing 'category' argument".to_string()))?;
                let description = str_arg(args, "description").ok_or_else(|| {
                    ToolError::Rejected("missing 'description' argument".to_string())
                })?;
                let receipt = self
                    .tickets
                    .create_ticket(CreateTicketRequest {
                        category: category.to_string(),
                        description: description.to_string(),
                        user_id,
                        tenant_id: ctx.tenant_id.clone(),
                        language: ctx.language,
                        severity: str_arg(args, "severity").unwrap_or("normal").to_string(),
                        location: str_arg(args, "location").map(str::to_string),
                    })
                    .await?;
                Ok(format!(
                    "ticket created: id {}, tracking number {}, status {}",
                    receipt.id, receipt.tracking_number, receipt.status
                ))
            }
            "lookup_tickets" => {
                let user_id = ctx
                    .user_id
                    .clone()
                    .ok_or_else(|| ToolError::Rejected("no authenticated user".to_string()))?;
                let tracking = str_arg(args, "tracking_number");
                let tickets = self.tickets.lookup_tickets(&user_id, tracking).await?;
                if tickets.is_empty() {
                    return Ok("no tickets found".to_string());
                }
                let lines: Vec<String> = tickets
                    .iter()
                    .map(|t| {
                        format!(
                            "{} | {} | {} | {}",
                            t.tracking_number,
                            t.category,
                            t.status,
                            t.created_at.format("%Y-%m-%d")
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "notify_emergency" => {
                let notification = EmergencyNotification {
                    ticket_id: str_arg(args, "ticket_id").unwrap_or_default().to_string(),
                    tracking_number: str_arg(args, "tracking_number")
                        .unwrap_or_default()
                        .to_string(),
                    incident_type: str_arg(args, "incident_type")
                        .unwrap_or("unspecified")
                        .to_string(),
                    general_area: str_arg(args, "general_area")
                        .unwrap_or("unspecified")
                        .to_string(),
                    immediate_danger: args
                        .get("immediate_danger")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    tenant_id: ctx.tenant_id.clone(),
                };
                self.emergency.notify(notification).await
            }
            other => Err(ToolError::Rejected(format!("unknown tool '{other}'"))),
        }
    }
}

/// A `ToolSet` bound to one session's context and one handler's allowlist.
///
/// This is what generation adapters receive: they can execute named calls
/// but cannot widen the allowlist or retarget another resident.
#[derive(Clone)]
pub struct ToolBinding {
    set: ToolSet,
    ctx: ToolContext,
    allowed: Vec<String>,
}

impl ToolBinding {
    pub fn new(set: ToolSet, ctx: ToolContext, allowed: Vec<String>) -> Self {
        Self { set, ctx, allowed }
    }

    /// Names the bound handler may call.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Execute a named tool call. Never fails; see [`ToolSet::execute`].
    pub async fn execute(&self, name: &str, args: &Value) -> String {
        self.set.execute(name, args, &self.allowed, &self.ctx).await
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}
