// tests/common/mod.rs
// Shared fakes for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use newswire_ingest::store::MemoryStore;
use newswire_ingest::{
    AppConfig, HeadlineRequest, Ingestor, NewsSource, RawItem, SourceError,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
}

pub fn at_min(m: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(m)
}

pub fn raw(id: &str, headline: &str, at: DateTime<Utc>) -> RawItem {
    RawItem::new(id, headline, at).with_source("NS:RTRS")
}

/// No pacing, no backoff, no body calls.
pub fn fast_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.source.header_delay_ms = 0;
    cfg.source.body_delay_ms = 0;
    cfg.source.retry_base_delay_ms = 0;
    cfg.source.fetch_body = false;
    cfg.schedule.category_pause_secs = 0;
    cfg
}

pub type Response = Result<Vec<RawItem>, SourceError>;

/// Replays queued responses in order. Once the script runs out every call
/// answers with an empty page.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<HeadlineRequest>>,
    bodies: HashMap<String, String>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Response>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn pages(pages: Vec<Vec<RawItem>>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    pub fn with_body(mut self, id: &str, body: &str) -> Self {
        self.bodies.insert(id.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<HeadlineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for ScriptedSource {
    async fn fetch_headlines(&self, req: &HeadlineRequest) -> Result<Vec<RawItem>, SourceError> {
        self.requests.lock().unwrap().push(req.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_body(&self, id: &str) -> Result<Option<String>, SourceError> {
        Ok(self.bodies.get(id).cloned())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Delegates to `inner` and keeps every headline request.
pub struct Recording<S> {
    inner: S,
    requests: Mutex<Vec<HeadlineRequest>>,
}

impl<S: NewsSource> Recording<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HeadlineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: NewsSource> NewsSource for Recording<S> {
    async fn fetch_headlines(&self, req: &HeadlineRequest) -> Result<Vec<RawItem>, SourceError> {
        self.requests.lock().unwrap().push(req.clone());
        self.inner.fetch_headlines(req).await
    }

    async fn fetch_body(&self, id: &str) -> Result<Option<String>, SourceError> {
        self.inner.fetch_body(id).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

pub struct Harness {
    pub ingestor: Ingestor,
    pub store: Arc<MemoryStore>,
}

pub fn harness(cfg: AppConfig, source: Arc<dyn NewsSource>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(Arc::new(cfg), source, store.clone(), store.clone()).unwrap();
    Harness { ingestor, store }
}
