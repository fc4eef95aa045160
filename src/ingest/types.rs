// src/ingest/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RetryError, SourceError};
use crate::ingest::config::ClassifierConfig;
use crate::model::{RawItem, TimeRange};

/// One page request: newest-first items inside `range`, at most `capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineRequest {
    pub range: TimeRange,
    pub capacity: usize,
    pub query: Option<String>,
}

/// Remote content API. Implementations do not pace or retry; the engine does.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_headlines(&self, req: &HeadlineRequest) -> Result<Vec<RawItem>, SourceError>;
    /// `Ok(None)` when the story has no body.
    async fn fetch_body(&self, id: &str) -> Result<Option<String>, SourceError>;
    fn name(&self) -> &str;
}

/// Outcome of one page fetch, after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum PageFetch {
    Items(Vec<RawItem>),
    /// Successful response with nothing in it. Never retried.
    Empty,
    Failed(RetryError),
}

impl From<Vec<RawItem>> for PageFetch {
    fn from(items: Vec<RawItem>) -> Self {
        if items.is_empty() {
            PageFetch::Empty
        } else {
            PageFetch::Items(items)
        }
    }
}

/// Caller-side scoping of a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFilter {
    /// Requested category; always first in the stored category set
    pub category: Option<String>,
    /// ISO 639-1 language restriction passed to the source
    pub language: Option<String>,
    /// Free-text query appended verbatim
    pub query: Option<String>,
}

impl FetchFilter {
    pub fn category(name: &str) -> Self {
        Self {
            category: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn requested_category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Remote query string, e.g. `Topic:MCU AND Language:LEN`.
    ///
    /// A category with a configured topic code becomes a `Topic:` clause;
    /// without one, its name is sent as free text.
    pub fn to_query(&self, classifier: &ClassifierConfig) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(cat) = self.requested_category() {
            match classifier.category(cat).and_then(|c| c.topic.as_deref()) {
                Some(topic) => parts.push(format!("Topic:{topic}")),
                None => parts.push(cat.to_string()),
            }
        }
        if let Some(lang) = self.language.as_deref().filter(|l| !l.trim().is_empty()) {
            parts.push(format!("Language:L{}", lang.trim().to_ascii_uppercase()));
        }
        if let Some(q) = self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            parts.push(q.trim().to_string());
        }
        (!parts.is_empty()).then(|| parts.join(" AND "))
    }

    pub fn label(&self) -> String {
        self.requested_category().unwrap_or("ALL").to_string()
    }
}
