//! Claude Messages API integration: HTTP client, retry, rate limiting, and
//! the generation-capability adapter with its tool loop.

pub mod adapter;
pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use adapter::ClaudeGeneration;
pub use client::MessagesClient;
pub use error::ClaudeApiError;
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
