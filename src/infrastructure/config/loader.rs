//! Hierarchical configuration loading.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Generation model cannot be empty")]
    EmptyModel,

    #[error("Generation base URL cannot be empty")]
    EmptyBaseUrl,

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid timeout: {0}s. Must be at least 1")]
    InvalidTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid language confidence: {0}. Must be within (0.0, 1.0]")]
    InvalidConfidence(f64),

    #[error("Invalid guardrail retries: {0}. Must be at most 5")]
    ExcessiveGuardrailRetries(u32),

    #[error("Tenant id cannot be empty")]
    EmptyTenant,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.gugu/config.yaml` (project config)
    /// 3. `.gugu/local.yaml` (local overrides, optional)
    /// 4. Environment variables (`GUGU_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".gugu/config.yaml"))
            .merge(Yaml::file(".gugu/local.yaml"))
            .merge(Env::prefixed("GUGU_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.tenant.id.trim().is_empty() {
            return Err(ConfigError::EmptyTenant);
        }

        if config.generation.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if config.generation.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if config.generation.rate_limit_rps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.generation.rate_limit_rps));
        }
        if config.generation.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.generation.timeout_secs));
        }
        if config.generation.retry.initial_backoff_ms >= config.generation.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.generation.retry.initial_backoff_ms,
                config.generation.retry.max_backoff_ms,
            ));
        }

        if config.language.min_confidence <= 0.0 || config.language.min_confidence > 1.0 {
            return Err(ConfigError::InvalidConfidence(config.language.min_confidence));
        }

        if config.guardrail.max_retries > 5 {
            return Err(ConfigError::ExcessiveGuardrailRetries(config.guardrail.max_retries));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
