//! Bounded retry for store writes

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::StoreError;

/// Attempt count and linear backoff (`backoff * attempt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Delay before retrying after the given 1-based failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        debug!(%what, attempts = self.attempts, "RetryPolicy::run: called");
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay(attempt);
                    warn!(%what, attempt, delay_ms = delay.as_millis() as u64, error = %e, "RetryPolicy::run: retrying after store error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(%what, attempt, error = %e, "RetryPolicy::run: giving up");
                    return Err(e);
                }
            }
        }
    }
}
