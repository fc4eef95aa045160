// src/store/mod.rs
//! Persistence capabilities the engine depends on.
//!
//! `ArticleStore` holds items (insert-or-skip per id, no multi-item
//! transactions). `RunLogStore` holds fetch-run records. Both are narrow on
//! purpose so tests can swap in the in-memory implementation.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::error::StoreError;
use crate::model::{FetchRun, Item, RunCounts};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Result of an idempotent insert. A duplicate is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: u64,
    pub distinct_sources: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub avg_headline_len: f64,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, item: Item) -> Result<InsertOutcome, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Item>, StoreError>;
    /// Items with `start <= published_at <= end`, oldest first.
    async fn query_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError>;
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    /// Remove items published before `cutoff`; returns how many were removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn aggregate_stats(&self) -> Result<StoreStats, StoreError>;
    /// Items with no body, newest first. `category` matches any tag.
    async fn items_missing_body(
        &self,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError>;
    /// Set the body of a stored item; `false` if the id is unknown.
    async fn update_body(&self, id: &str, body: String) -> Result<bool, StoreError>;
}

pub trait RunLogStore: Send + Sync {
    fn create_run(&self, started_at: DateTime<Utc>) -> Result<FetchRun, StoreError>;
    fn finish_run(
        &self,
        run_id: u64,
        finished_at: DateTime<Utc>,
        counts: RunCounts,
        error: Option<String>,
    ) -> Result<FetchRun, StoreError>;
    fn runs(&self) -> Result<Vec<FetchRun>, StoreError>;
}

/// Item table keyed by id; shared by both store implementations.
#[derive(Debug, Default)]
pub(crate) struct ItemTable {
    items: BTreeMap<String, Item>,
}

impl ItemTable {
    pub(crate) fn insert(&mut self, item: Item) -> InsertOutcome {
        if self.items.contains_key(&item.id) {
            return InsertOutcome::Duplicate;
        }
        self.items.insert(item.id.clone(), item);
        InsertOutcome::Inserted
    }

    pub(crate) fn get(&self, id: &str) -> Option<Item> {
        self.items.get(id).cloned()
    }

    pub(crate) fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Item> {
        let mut out: Vec<Item> = self
            .items
            .values()
            .filter(|i| i.published_at >= start && i.published_at <= end)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.published_at.cmp(&b.published_at).then(a.id.cmp(&b.id)));
        out
    }

    pub(crate) fn latest(&self) -> Option<DateTime<Utc>> {
        self.items.values().map(|i| i.published_at).max()
    }

    pub(crate) fn retain_since(&mut self, cutoff: DateTime<Utc>) -> u64 {
        let before = self.items.len();
        self.items.retain(|_, i| i.published_at >= cutoff);
        (before - self.items.len()) as u64
    }

    pub(crate) fn missing_body(&self, category: Option<&str>, limit: Option<usize>) -> Vec<Item> {
        let mut out: Vec<Item> = self
            .items
            .values()
            .filter(|i| i.body.as_deref().map_or(true, |b| b.trim().is_empty()))
            .filter(|i| category.map_or(true, |c| i.categories.contains(c)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(a.id.cmp(&b.id)));
        if let Some(n) = limit {
            out.truncate(n);
        }
        out
    }

    pub(crate) fn set_body(&mut self, id: &str, body: String) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.body = Some(body);
                true
            }
            None => false,
        }
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub(crate) fn stats(&self) -> StoreStats {
        let total = self.items.len() as u64;
        if total == 0 {
            return StoreStats::default();
        }
        let sources: HashSet<&str> = self.items.values().map(|i| i.source.as_str()).collect();
        let headline_chars: usize = self
            .items
            .values()
            .map(|i| i.headline.chars().count())
            .sum();
        StoreStats {
            total,
            distinct_sources: sources.len() as u64,
            oldest: self.items.values().map(|i| i.published_at).min(),
            newest: self.latest(),
            avg_headline_len: headline_chars as f64 / total as f64,
        }
    }
}

/// Run records with monotonically increasing ids.
#[derive(Debug, Default)]
pub(crate) struct RunTable {
    next_id: u64,
    runs: Vec<FetchRun>,
}

impl RunTable {
    pub(crate) fn from_runs(runs: Vec<FetchRun>) -> Self {
        let next_id = runs.iter().map(|r| r.run_id).max().unwrap_or(0);
        Self { next_id, runs }
    }

    pub(crate) fn create(&mut self, started_at: DateTime<Utc>) -> FetchRun {
        self.next_id += 1;
        let run = FetchRun::started(self.next_id, started_at);
        self.runs.push(run.clone());
        run
    }

    pub(crate) fn finish(
        &mut self,
        run_id: u64,
        finished_at: DateTime<Utc>,
        counts: RunCounts,
        error: Option<String>,
    ) -> Result<FetchRun, StoreError> {
        let run = self
            .runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or(StoreError::UnknownRun(run_id))?;
        run.finish(finished_at, counts, error);
        Ok(run.clone())
    }

    pub(crate) fn all(&self) -> &[FetchRun] {
        &self.runs
    }
}
