// src/ingest/providers/fixture.rs
//! Offline source over a fixed set of stories, with the same paging rules as
//! the remote API: filter by inclusive range, newest first, truncate to
//! capacity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::SourceError;
use crate::ingest::types::{HeadlineRequest, NewsSource};
use crate::model::RawItem;

#[derive(Debug, Deserialize)]
struct FixtureRecord {
    #[serde(flatten)]
    raw: RawItem,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    items: Vec<RawItem>,
    bodies: HashMap<String, String>,
}

impl FixtureSource {
    pub fn new(items: Vec<RawItem>) -> Self {
        let mut s = Self {
            items,
            bodies: HashMap::new(),
        };
        s.sort();
        s
    }

    pub fn with_body(mut self, id: &str, body: &str) -> Self {
        self.bodies.insert(id.to_string(), body.to_string());
        self
    }

    /// JSON array of story objects (`storyId`/`text`/`versionCreated`/
    /// `sourceCode` or the snake_case names, plus optional `body`).
    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<FixtureRecord> =
            serde_json::from_str(content).context("parsing fixture stories")?;
        let mut bodies = HashMap::new();
        let mut items = Vec::with_capacity(records.len());
        for r in records {
            if let (Some(id), Some(body)) = (r.raw.id.clone(), r.body) {
                bodies.insert(id, body);
            }
            items.push(r.raw);
        }
        let mut s = Self { items, bodies };
        s.sort();
        Ok(s)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // Newest first; undated stories sink to the end.
    fn sort(&mut self) {
        self.items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    }
}

#[async_trait]
impl NewsSource for FixtureSource {
    async fn fetch_headlines(&self, req: &HeadlineRequest) -> Result<Vec<RawItem>, SourceError> {
        let out = self
            .items
            .iter()
            .filter(|i| match i.published_at {
                Some(t) => {
                    req.range.start.map_or(true, |s| t >= s) && req.range.end.map_or(true, |e| t <= e)
                }
                None => req.range.start.is_none() && req.range.end.is_none(),
            })
            .take(req.capacity)
            .cloned()
            .collect();
        Ok(out)
    }

    async fn fetch_body(&self, id: &str) -> Result<Option<String>, SourceError> {
        Ok(self.bodies.get(id).cloned())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeRange;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn pages_are_newest_first_and_bounded() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let items = (0..10)
            .map(|i| RawItem::new(&format!("s{i}"), "Copper", t0 + Duration::minutes(i)))
            .collect();
        let src = FixtureSource::new(items);
        let req = HeadlineRequest {
            range: TimeRange::between(t0 + Duration::minutes(2), t0 + Duration::minutes(8)),
            capacity: 3,
            query: None,
        };
        let page = src.fetch_headlines(&req).await.unwrap();
        let ids: Vec<_> = page.iter().filter_map(|i| i.id.as_deref()).collect();
        assert_eq!(ids, ["s8", "s7", "s6"]);
    }

    #[tokio::test]
    async fn parses_wire_field_names() {
        let src = FixtureSource::from_json(
            r#"[{"storyId":"urn:1","text":"Zinc falls","versionCreated":"2025-06-01T09:00:00Z","sourceCode":"NS:RTRS","body":"<p>Full&nbsp;story</p>"}]"#,
        )
        .unwrap();
        assert_eq!(src.len(), 1);
        assert_eq!(
            src.fetch_body("urn:1").await.unwrap().as_deref(),
            Some("<p>Full&nbsp;story</p>")
        );
    }
}
