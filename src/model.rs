// src/model.rs
//! Typed records flowing through the engine: raw source items, stored items,
//! category sets, urgency and fetch-run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One headline exactly as the remote source returned it.
/// Anything may be missing; `Item::from_raw` decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, alias = "storyId")]
    pub id: Option<String>,
    #[serde(default, alias = "text")]
    pub headline: Option<String>,
    #[serde(default, alias = "versionCreated")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "sourceCode")]
    pub source: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl RawItem {
    pub fn new(id: &str, headline: &str, published_at: DateTime<Utc>) -> Self {
        Self {
            id: Some(id.to_string()),
            headline: Some(headline.to_string()),
            published_at: Some(published_at),
            source: None,
            summary: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

/// Ordinal urgency; lower is more urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High = 1,
    Medium = 2,
    #[default]
    Normal = 3,
}

impl Urgency {
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Ordered set of category tags. Insertion order is preserved and every tag
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet(Vec<String>);

impl CategorySet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append `tag` unless already present. Returns true if it was added.
    pub fn push(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used in the stored record and in logs.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<'a> FromIterator<&'a str> for CategorySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for t in iter {
            set.push(t);
        }
        set
    }
}

/// The unit of ingestion, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub headline: String,
    pub body: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub language: String,
    pub categories: CategorySet,
    pub urgency: Urgency,
    pub priority_score: i32,
}

/// Reason a raw item could not become an `Item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    MissingId,
    MissingHeadline,
    MissingTimestamp,
}

impl Item {
    /// Build an unclassified item from a raw record.
    ///
    /// `headline` is normalized and capped at `max_headline_chars`.
    pub fn from_raw(raw: &RawItem, max_headline_chars: usize) -> Result<Item, Malformed> {
        let id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(Malformed::MissingId)?;

        let headline = raw
            .headline
            .as_deref()
            .map(crate::ingest::normalize_text)
            .filter(|s| !s.is_empty())
            .ok_or(Malformed::MissingHeadline)?;
        let headline = truncate_chars(&headline, max_headline_chars);

        let published_at = raw.published_at.ok_or(Malformed::MissingTimestamp)?;

        Ok(Item {
            id: id.to_string(),
            headline,
            body: None,
            summary: raw
                .summary
                .as_deref()
                .map(crate::ingest::normalize_text)
                .filter(|s| !s.is_empty()),
            source: canonical_source(raw.source.as_deref().unwrap_or_default()),
            published_at,
            language: crate::analyze::language::UNKNOWN_LANGUAGE.to_string(),
            categories: CategorySet::new(),
            urgency: Urgency::Normal,
            priority_score: 0,
        })
    }
}

/// Map provider source codes to display labels (`NS:RTRS` → `Reuters`).
pub fn canonical_source(code: &str) -> String {
    let code = code.trim();
    if code.contains("RTRS") {
        return "Reuters".to_string();
    }
    code.strip_prefix("NS:").unwrap_or(code).to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// Inclusive time window passed to the source. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Lifecycle state of a fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Counts reported when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub fetched: u64,
    pub inserted: u64,
    pub updated: u64,
    pub api_calls: u64,
}

/// Persistent record of one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRun {
    pub run_id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items_fetched: u64,
    pub items_inserted: u64,
    pub items_updated: u64,
    pub status: RunStatus,
    pub error: Option<String>,
    pub api_calls: u64,
}

impl FetchRun {
    pub fn started(run_id: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: None,
            items_fetched: 0,
            items_inserted: 0,
            items_updated: 0,
            status: RunStatus::Running,
            error: None,
            api_calls: 0,
        }
    }

    /// Apply the single completion mutation.
    pub fn finish(&mut self, at: DateTime<Utc>, counts: RunCounts, error: Option<String>) {
        self.finished_at = Some(at);
        self.items_fetched = counts.fetched;
        self.items_inserted = counts.inserted;
        self.items_updated = counts.updated;
        self.api_calls = counts.api_calls;
        self.status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.error = error;
    }
}
