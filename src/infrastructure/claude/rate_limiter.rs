//! Token bucket rate limiter for API request throttling.
//!
//! Tokens refill continuously with elapsed time. `acquire` waits until at
//! least one token is available, then consumes it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

/// Token bucket rate limiter.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    /// Current number of tokens.
    tokens: Arc<Mutex<f64>>,
    /// Maximum token capacity (burst tolerance).
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last refill instant.
    last_refill: Arc<Mutex<Instant>>,
}

impl TokenBucketRateLimiter {
    /// Create a limiter allowing `rate_limit_rps` requests per second.
    pub fn new(rate_limit_rps: f64) -> Self {
        assert!(rate_limit_rps > 0.0, "rate limit must be positive");
        Self {
            tokens: Arc::new(Mutex::new(rate_limit_rps)),
            capacity: rate_limit_rps,
            refill_rate: rate_limit_rps,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Wait for and consume one token.
    pub async fn acquire(&self) {
        loop {
            {
                let mut tokens = self.tokens.lock().await;
                let mut last_refill = self.last_refill.lock().await;

                let elapsed = last_refill.elapsed().as_secs_f64();
                *tokens = (*tokens + elapsed * self.refill_rate).min(self.capacity);
                *last_refill = Instant::now();

                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    return;
                }
            }

            // Sleep roughly until the next token exists.
            let wait_ms = (1000.0 / self.refill_rate).ceil() as u64;
            sleep(Duration::from_millis(wait_ms.max(10))).await;
        }
    }
}
