// src/store/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use super::{ArticleStore, InsertOutcome, ItemTable, RunLogStore, RunTable, StoreStats};
use crate::error::StoreError;
use crate::model::{FetchRun, Item, RunCounts};

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<ItemTable>,
    runs: Mutex<RunTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<MutexGuard<'_, ItemTable>, StoreError> {
        self.items.lock().map_err(|_| StoreError::Poisoned)
    }

    fn run_table(&self) -> Result<MutexGuard<'_, RunTable>, StoreError> {
        self.runs.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn len(&self) -> usize {
        self.items().map(|t| t.values().count()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored items, oldest first.
    pub fn all_items(&self) -> Vec<Item> {
        self.items()
            .map(|t| t.range(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, item: Item) -> Result<InsertOutcome, StoreError> {
        Ok(self.items()?.insert(item))
    }

    async fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items()?.get(id))
    }

    async fn query_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError> {
        Ok(self.items()?.range(start, end))
    }

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.items()?.latest())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self.items()?.retain_since(cutoff))
    }

    async fn aggregate_stats(&self) -> Result<StoreStats, StoreError> {
        Ok(self.items()?.stats())
    }

    async fn items_missing_body(
        &self,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError> {
        Ok(self.items()?.missing_body(category, limit))
    }

    async fn update_body(&self, id: &str, body: String) -> Result<bool, StoreError> {
        Ok(self.items()?.set_body(id, body))
    }
}

impl RunLogStore for MemoryStore {
    fn create_run(&self, started_at: DateTime<Utc>) -> Result<FetchRun, StoreError> {
        Ok(self.run_table()?.create(started_at))
    }

    fn finish_run(
        &self,
        run_id: u64,
        finished_at: DateTime<Utc>,
        counts: RunCounts,
        error: Option<String>,
    ) -> Result<FetchRun, StoreError> {
        self.run_table()?.finish(run_id, finished_at, counts, error)
    }

    fn runs(&self) -> Result<Vec<FetchRun>, StoreError> {
        Ok(self.run_table()?.all().to_vec())
    }
}
