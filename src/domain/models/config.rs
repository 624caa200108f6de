//! Configuration tree with programmatic defaults.
//!
//! Loaded hierarchically by `infrastructure::config::ConfigLoader`; every
//! field has a sensible default so a bare checkout runs without a config file.

use serde::{Deserialize, Serialize};

use crate::domain::models::conversation::Language;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tenant (municipality) identity stamped onto tickets and notifications.
    pub tenant: TenantConfig,
    /// Generation capability settings.
    pub generation: GenerationConfig,
    /// Language detection thresholds.
    pub language: LanguageConfig,
    /// Output guardrail settings.
    pub guardrail: GuardrailConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Tenant identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    /// Stable tenant identifier.
    pub id: String,
    /// Display name used in prompts.
    pub display_name: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            display_name: "your municipality".to_string(),
        }
    }
}

/// Settings for the Claude-backed generation adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Maximum tokens per generation.
    pub max_tokens: u32,
    /// Hard wall-clock bound per HTTP request, in seconds.
    pub timeout_secs: u64,
    /// Requests per second for the token bucket.
    pub rate_limit_rps: f64,
    /// Transport retry policy for transient API errors.
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 1024,
            timeout_secs: 120,
            rate_limit_rps: 5.0,
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff retry settings for the HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries for transient errors.
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}

/// Language detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Minimum trimmed length before probabilistic detection is attempted.
    pub min_text_len: usize,
    /// Minimum confidence for a detection to replace the fallback.
    pub min_confidence: f64,
    /// Default language for brand-new sessions.
    pub default_language: Language,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            min_confidence: 0.70,
            default_language: Language::En,
        }
    }
}

/// Output guardrail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Bounded re-generation attempts after a rejection.
    pub max_retries: u32,
    /// Minimum length of a structured `message` field.
    pub min_message_len: usize,
    /// Minimum length for accepting bare unstructured text.
    pub min_raw_len: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_message_len: 10,
            min_raw_len: 20,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset: trace|debug|info|warn|error.
    pub level: String,
    /// Output format: json|pretty.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
