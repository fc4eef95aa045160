// src/ingest/retry.rs
//! Bounded exponential backoff around a single remote call.

use metrics::counter;
use std::future::Future;
use std::time::Duration;

use crate::error::{RetryError, SourceError};
use crate::ingest::config::SourceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(cfg: &SourceConfig) -> Self {
        Self::new(cfg.max_attempts, Duration::from_millis(cfg.retry_base_delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// Run `op` until it succeeds or attempts run out. Any `Ok`, including
    /// an empty result, is returned immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        call = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "remote call failed"
                    );
                    if attempt >= self.max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    counter!("ingest_retries_total").increment(1);
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
