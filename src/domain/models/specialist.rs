//! The four specialist conversation handlers as a closed set.
//!
//! Dispatch over handlers is an exhaustive `match` on `Specialist`, so adding
//! a handler is a compile-time event, not a runtime registration.

use serde::{Deserialize, Serialize};

use crate::domain::models::conversation::{Intent, Language, RoutingPhase, SessionStatus};
use crate::domain::models::prompts;

/// SAPS national emergency number.
pub const EMERGENCY_SAPS: &str = "10111";

/// National GBV Command Centre (toll-free, 24h).
pub const EMERGENCY_GBV_COMMAND_CENTRE: &str = "0800 150 150";

/// Public ticket reference format: TKT-YYYYMMDD-XXXXXX.
pub const TRACKING_NUMBER_PREFIX: &str = "TKT-";

/// One of the four task-specific conversation handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    Auth,
    Municipal,
    TicketStatus,
    Gbv,
}

/// Context a specialist needs to build its per-turn task instruction.
#[derive(Debug, Clone)]
pub struct TaskContext<'a> {
    pub contact: &'a str,
    pub tenant_id: &'a str,
    pub language: Language,
    pub message: &'a str,
    pub conversation_history: &'a str,
    pub user_exists: bool,
    pub session_status: SessionStatus,
}

impl Specialist {
    /// The specialist that serves a classified intent.
    pub fn from_intent(intent: Intent) -> Self {
        match intent {
            Intent::Auth => Self::Auth,
            Intent::Municipal => Self::Municipal,
            Intent::TicketStatus => Self::TicketStatus,
            Intent::Gbv => Self::Gbv,
        }
    }

    /// Routing phase this specialist owns.
    pub fn phase(self) -> RoutingPhase {
        match self {
            Self::Auth => RoutingPhase::Auth,
            Self::Municipal => RoutingPhase::Municipal,
            Self::TicketStatus => RoutingPhase::TicketStatus,
            Self::Gbv => RoutingPhase::Gbv,
        }
    }

    /// Name stamped onto results as `agent_name`.
    pub fn agent_name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Municipal => "municipal",
            Self::TicketStatus => "ticket_status",
            Self::Gbv => "gbv",
        }
    }

    /// Upper bound on model/tool-call iterations per invocation.
    ///
    /// Auth gets the most (registration is a long multi-step flow); GBV gets
    /// the fewest so a victim is never dragged through excessive questioning.
    pub fn max_turns(self) -> u32 {
        match self {
            Self::Auth => 12,
            Self::Municipal => 8,
            Self::TicketStatus => 6,
            Self::Gbv => 4,
        }
    }

    /// Cross-session retention is disabled for every handler. Conversations
    /// may contain PII; leakage between sessions is a safety violation, not a
    /// tuning knob.
    pub fn memory_enabled(self) -> bool {
        false
    }

    /// Named tool capabilities the generation capability may invoke.
    pub fn allowed_tools(self) -> &'static [&'static str] {
        match self {
            Self::Auth => &["send_otp", "verify_otp", "lookup_user", "create_user"],
            Self::Municipal => &["create_ticket"],
            Self::TicketStatus => &["lookup_tickets"],
            Self::Gbv => &["create_ticket", "notify_emergency"],
        }
    }

    /// Whether the stricter GBV output guardrail applies.
    pub fn uses_gbv_guardrail(self) -> bool {
        matches!(self, Self::Gbv)
    }

    /// Language-specific system role description.
    pub fn persona(self, language: Language) -> String {
        match self {
            Self::Auth => prompts::auth_persona(language),
            Self::Municipal => prompts::municipal_persona(language),
            Self::TicketStatus => prompts::ticket_status_persona(language),
            Self::Gbv => prompts::gbv_persona(language),
        }
    }

    /// Per-turn task instruction built from the conversation context.
    pub fn task(self, ctx: &TaskContext<'_>) -> String {
        match self {
            Self::Auth => prompts::auth_task(
                ctx.contact,
                ctx.session_status,
                ctx.user_exists,
                ctx.conversation_history,
                ctx.message,
            ),
            Self::Municipal => prompts::municipal_task(
                ctx.contact,
                ctx.tenant_id,
                ctx.conversation_history,
                ctx.message,
            ),
            Self::TicketStatus => {
                prompts::ticket_status_task(ctx.contact, ctx.conversation_history, ctx.message)
            }
            Self::Gbv => prompts::gbv_task(ctx.tenant_id, ctx.conversation_history, ctx.message),
        }
    }

    /// Terminal, hardcoded apology used when generation fails outright.
    ///
    /// Persona-consistent per language. The GBV apology carries both
    /// emergency numbers in every language; that content must survive every
    /// failure path.
    pub fn fallback_message(self, language: Language) -> String {
        match self {
            Self::Gbv => match language {
                Language::En => format!(
                    "I'm having trouble responding right now, but you are not alone. \
                     If you are in danger, call the police on {EMERGENCY_SAPS}. The \
                     GBV Command Centre is free and available 24 hours on \
                     {EMERGENCY_GBV_COMMAND_CENTRE}. Please send your message again \
                     in a moment."
                ),
                Language::Zu => format!(
                    "Ngiyaxolisa, nginenkinga yokuphendula njengamanje, kodwa awuwedwa. \
                     Uma usengozini, shayela amaphoyisa ku-{EMERGENCY_SAPS}. \
                     I-GBV Command Centre iyatholakala mahhala amahora angu-24 \
                     ku-{EMERGENCY_GBV_COMMAND_CENTRE}. Sicela uphinde uthumele \
                     umlayezo wakho emva kwesikhashana."
                ),
                Language::Af => format!(
                    "Ek sukkel om nou te antwoord, maar jy is nie alleen nie. As jy \
                     in gevaar is, bel die polisie by {EMERGENCY_SAPS}. Die \
                     GBV-bevelsentrum is gratis en 24 uur beskikbaar by \
                     {EMERGENCY_GBV_COMMAND_CENTRE}. Stuur asseblief netnou weer \
                     jou boodskap."
                ),
            },
            _ => match language {
                Language::En => {
                    "Sorry, something went wrong on my side. Please send your message \
                     again in a moment."
                        .to_string()
                }
                Language::Zu => {
                    "Ngiyaxolisa, kukhona okungahambanga kahle ohlangothini lwami. \
                     Sicela uphinde uthumele umlayezo wakho emva kwesikhashana."
                        .to_string()
                }
                Language::Af => {
                    "Jammer, iets het aan my kant verkeerd geloop. Stuur asseblief \
                     netnou weer jou boodskap."
                        .to_string()
                }
            },
        }
    }

    /// Short apology used when narration filtering strips an entire reply.
    pub fn filtered_fallback(self, language: Language) -> String {
        match self {
            Self::Gbv => self.fallback_message(language),
            _ => match language {
                Language::En => "Could you say that again? I want to make sure I help \
                                 you with the right thing."
                    .to_string(),
                Language::Zu => "Ungaphinda usho lokho? Ngifuna ukuqiniseka ukuthi \
                                 ngikusiza ngento efanele."
                    .to_string(),
                Language::Af => "Kan jy dit weer sê? Ek wil seker maak ek help jou \
                                 met die regte ding."
                    .to_string(),
            },
        }
    }
}

/// One-line emergency reminder appended when a GBV reply is missing either
/// mandated number.
pub fn emergency_footer(language: Language) -> String {
    match language {
        Language::En => format!(
            "If you are in danger, call the police on {EMERGENCY_SAPS}. The GBV \
             Command Centre ({EMERGENCY_GBV_COMMAND_CENTRE}) is free, 24 hours."
        ),
        Language::Zu => format!(
            "Uma usengozini, shayela amaphoyisa ku-{EMERGENCY_SAPS}. I-GBV Command \
             Centre ({EMERGENCY_GBV_COMMAND_CENTRE}) iyatholakala mahhala amahora angu-24."
        ),
        Language::Af => format!(
            "As jy in gevaar is, bel die polisie by {EMERGENCY_SAPS}. Die \
             GBV-bevelsentrum ({EMERGENCY_GBV_COMMAND_CENTRE}) is gratis, 24 uur."
        ),
    }
}

impl std::fmt::Display for Specialist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// Validate the public ticket reference format TKT-YYYYMMDD-XXXXXX.
pub fn is_valid_tracking_number(candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(TRACKING_NUMBER_PREFIX) else {
        return false;
    };
    let mut parts = rest.splitn(2, '-');
    let (Some(date), Some(suffix)) = (parts.next(), parts.next()) else {
        return false;
    };
    date.len() == 8
        && date.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == 6
        && suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
}
