// src/ingest/rate_limit.rs
use std::time::Duration;

use crate::ingest::config::SourceConfig;

/// Which budget a remote call draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Header,
    Body,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Header => "header",
            CallKind::Body => "body",
        }
    }
}

/// Fixed spacing before each remote call. Calls are already serialized by
/// the orchestrator, so waiting the configured delay is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    header: Duration,
    body: Duration,
}

impl RateLimiter {
    pub fn new(header: Duration, body: Duration) -> Self {
        Self { header, body }
    }

    pub fn from_config(cfg: &SourceConfig) -> Self {
        Self::new(
            Duration::from_millis(cfg.header_delay_ms),
            Duration::from_millis(cfg.body_delay_ms),
        )
    }

    pub fn delay(&self, kind: CallKind) -> Duration {
        match kind {
            CallKind::Header => self.header,
            CallKind::Body => self.body,
        }
    }

    pub async fn wait(&self, kind: CallKind) {
        let d = self.delay(kind);
        tracing::debug!(target: "ingest", kind = kind.as_str(), delay_ms = d.as_millis() as u64, "rate limit wait");
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}
