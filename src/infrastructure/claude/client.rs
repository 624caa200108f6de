//! HTTP client for the Claude Messages API.
//!
//! Connection pooling via `reqwest`, token-bucket rate limiting, and
//! exponential-backoff retry for transient errors. The request timeout is
//! the system's wall-clock bound on a single generation attempt.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::error::ClaudeApiError;
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;
use super::types::{MessageRequest, MessageResponse};
use crate::domain::models::config::GenerationConfig;

/// Production HTTP client for the Messages API.
pub struct MessagesClient {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl MessagesClient {
    /// Build a client from generation settings and an API key.
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, ClaudeApiError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.clone(),
            rate_limiter: TokenBucketRateLimiter::new(config.rate_limit_rps),
            retry_policy: RetryPolicy::from_config(&config.retry),
        })
    }

    /// Send a message request, rate-limited and retried on transient errors.
    pub async fn send(&self, request: &MessageRequest) -> Result<MessageResponse, ClaudeApiError> {
        self.rate_limiter.acquire().await;
        self.retry_policy
            .execute(|| self.send_once(request))
            .await
    }

    async fn send_once(&self, request: &MessageRequest) -> Result<MessageResponse, ClaudeApiError> {
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ClaudeApiError::Timeout
                } else {
                    ClaudeApiError::NetworkError(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(ClaudeApiError::from_status(status, body));
        }

        let message: MessageResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ClaudeApiError::Timeout
            } else {
                ClaudeApiError::NetworkError(err)
            }
        })?;

        debug!(
            message_id = %message.id,
            input_tokens = message.usage.input_tokens,
            output_tokens = message.usage.output_tokens,
            stop_reason = ?message.stop_reason,
            "message completed"
        );
        Ok(message)
    }
}
