// src/ingest/gateway.rs
//! The only path to the remote source: rate limit, then call, then retry.

use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ingest::config::SourceConfig;
use crate::ingest::rate_limit::{CallKind, RateLimiter};
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::{HeadlineRequest, NewsSource, PageFetch};

pub struct SourceGateway {
    source: Arc<dyn NewsSource>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    api_calls: AtomicU64,
}

impl SourceGateway {
    pub fn new(source: Arc<dyn NewsSource>, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            source,
            limiter,
            retry,
            api_calls: AtomicU64::new(0),
        }
    }

    pub fn from_config(source: Arc<dyn NewsSource>, cfg: &SourceConfig) -> Self {
        Self::new(
            source,
            RateLimiter::from_config(cfg),
            RetryPolicy::from_config(cfg),
        )
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Remote calls issued since construction (every attempt counts).
    pub fn api_calls(&self) -> u64 {
        self.api_calls.load(Ordering::Relaxed)
    }

    fn count_call(&self, kind: CallKind) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        counter!("ingest_api_calls_total", "kind" => kind.as_str()).increment(1);
    }

    pub async fn fetch_page(&self, req: &HeadlineRequest) -> PageFetch {
        let this = self;
        let out = self
            .retry
            .run("fetch_headlines", || async move {
                this.limiter.wait(CallKind::Header).await;
                this.count_call(CallKind::Header);
                this.source.fetch_headlines(req).await
            })
            .await;
        match out {
            Ok(items) => PageFetch::from(items),
            Err(e) => PageFetch::Failed(e),
        }
    }

    /// Story body, HTML-cleaned. Failure is logged and yields `None`.
    pub async fn fetch_body(&self, id: &str) -> Option<String> {
        let this = self;
        let out = self
            .retry
            .run("fetch_body", || async move {
                this.limiter.wait(CallKind::Body).await;
                this.count_call(CallKind::Body);
                this.source.fetch_body(id).await
            })
            .await;
        match out {
            Ok(body) => body
                .map(|b| crate::ingest::normalize_text(&b))
                .filter(|b| !b.is_empty()),
            Err(e) => {
                tracing::warn!(target: "ingest", id, error = %e, "body fetch abandoned");
                None
            }
        }
    }
}
