//! In-memory OTP gateway for the CLI demo and integration tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::tools::{OtpChannel, OtpGateway, OtpOutcome, ToolError};

const RESEND_WINDOW: Duration = Duration::from_secs(60);

struct IssuedOtp {
    code: String,
    issued_at: Instant,
    user_id: Option<String>,
}

/// Process-local OTP issuance with a resend throttle.
pub struct InMemoryOtpGateway {
    issued: RwLock<HashMap<String, IssuedOtp>>,
    fixed_code: Option<String>,
    known_user_id: RwLock<HashMap<String, String>>,
}

impl InMemoryOtpGateway {
    pub fn new() -> Self {
        Self {
            issued: RwLock::new(HashMap::new()),
            fixed_code: None,
            known_user_id: RwLock::new(HashMap::new()),
        }
    }

    /// Use one predictable code for every send. Demo/test convenience.
    pub fn with_fixed_code(code: impl Into<String>) -> Self {
        Self {
            fixed_code: Some(code.into()),
            ..Self::new()
        }
    }

    /// Associate a contact with an existing user id so verification of a
    /// returning resident can hand it back.
    pub async fn register_known_user(&self, contact: &str, user_id: &str) {
        self.known_user_id
            .write()
            .await
            .insert(contact.to_string(), user_id.to_string());
    }

    fn generate_code(&self) -> String {
        if let Some(code) = &self.fixed_code {
            return code.clone();
        }
        // Six digits derived from a fresh UUID.
        let n = Uuid::new_v4().as_u128() % 1_000_000;
        format!("{n:06}")
    }
}

impl Default for InMemoryOtpGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpGateway for InMemoryOtpGateway {
    async fn send_otp(
        &self,
        contact: &str,
        channel: OtpChannel,
        is_returning: bool,
    ) -> Result<String, ToolError> {
        let mut issued = self.issued.write().await;

        if let Some(existing) = issued.get(contact) {
            if existing.issued_at.elapsed() < RESEND_WINDOW {
                return Err(ToolError::Rejected(
                    "an OTP was sent less than a minute ago, ask the resident to wait".to_string(),
                ));
            }
        }

        let user_id = if is_returning {
            self.known_user_id.read().await.get(contact).cloned()
        } else {
            None
        };

        issued.insert(
            contact.to_string(),
            IssuedOtp {
                code: self.generate_code(),
                issued_at: Instant::now(),
                user_id,
            },
        );

        let channel_name = match channel {
            OtpChannel::Sms => "sms",
            OtpChannel::Whatsapp => "whatsapp",
            OtpChannel::Email => "email",
        };
        Ok(format!("OTP sent via {channel_name} to the contact on file"))
    }

    async fn verify_otp(&self, contact: &str, code: &str) -> Result<OtpOutcome, ToolError> {
        let mut issued = self.issued.write().await;
        match issued.get(contact) {
            Some(otp) if otp.code == code.trim() => {
                let user_id = otp.user_id.clone();
                issued.remove(contact);
                Ok(OtpOutcome::Verified { user_id })
            }
            Some(_) => Ok(OtpOutcome::Rejected {
                reason: "the code does not match".to_string(),
            }),
            None => Ok(OtpOutcome::Rejected {
                reason: "no OTP is outstanding for this contact".to_string(),
            }),
        }
    }
}
