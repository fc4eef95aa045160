// src/store/file.rs
//! Durable store backed by a directory:
//! - `articles.jsonl`: one item per line, appended on insert
//! - `runs.json`: the full run log, rewritten on every change
//!
//! Everything is loaded into memory on open. Writes happen while the table
//! lock is held, so an insert is all-or-nothing per item.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{ArticleStore, InsertOutcome, ItemTable, RunLogStore, RunTable, StoreStats};
use crate::error::StoreError;
use crate::model::{FetchRun, Item, RunCounts};

const ARTICLES_FILE: &str = "articles.jsonl";
const RUNS_FILE: &str = "runs.json";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    items: Mutex<ItemTable>,
    runs: Mutex<RunTable>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut table = ItemTable::default();
        let articles = dir.join(ARTICLES_FILE);
        if articles.exists() {
            let reader = BufReader::new(File::open(&articles)?);
            for (n, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Item>(&line) {
                    Ok(item) => {
                        table.insert(item);
                    }
                    Err(e) => {
                        tracing::warn!(target: "store", line = n + 1, error = %e, "skipping unreadable article line");
                    }
                }
            }
        }

        let runs_path = dir.join(RUNS_FILE);
        let runs = if runs_path.exists() {
            let content = fs::read_to_string(&runs_path)?;
            RunTable::from_runs(serde_json::from_str(&content)?)
        } else {
            RunTable::default()
        };

        tracing::debug!(target: "store", dir = %dir.display(), "file store opened");
        Ok(Self {
            dir,
            items: Mutex::new(table),
            runs: Mutex::new(runs),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn items(&self) -> Result<MutexGuard<'_, ItemTable>, StoreError> {
        self.items.lock().map_err(|_| StoreError::Poisoned)
    }

    fn run_table(&self) -> Result<MutexGuard<'_, RunTable>, StoreError> {
        self.runs.lock().map_err(|_| StoreError::Poisoned)
    }

    fn append_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(ARTICLES_FILE))?;
        let mut line = serde_json::to_string(item)?;
        line.push('\n');
        f.write_all(line.as_bytes())?;
        Ok(())
    }

    fn rewrite_items(&self, table: &ItemTable) -> Result<(), StoreError> {
        let tmp = self.dir.join(format!("{ARTICLES_FILE}.tmp"));
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            for item in table.values() {
                serde_json::to_writer(&mut w, item)?;
                w.write_all(b"\n")?;
            }
            w.flush()?;
        }
        fs::rename(&tmp, self.dir.join(ARTICLES_FILE))?;
        Ok(())
    }

    fn write_runs(&self, runs: &RunTable) -> Result<(), StoreError> {
        let tmp = self.dir.join(format!("{RUNS_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(runs.all())?)?;
        fs::rename(&tmp, self.dir.join(RUNS_FILE))?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for FileStore {
    async fn insert(&self, item: Item) -> Result<InsertOutcome, StoreError> {
        let mut table = self.items()?;
        if table.get(&item.id).is_some() {
            return Ok(InsertOutcome::Duplicate);
        }
        self.append_item(&item)?;
        Ok(table.insert(item))
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
        let mut table = self.items()?;
        let removed = table.retain_since(cutoff);
        if removed > 0 {
            self.rewrite_items(&table)?;
        }
        Ok(removed)
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
        let mut table = self.items()?;
        if !table.set_body(id, body) {
            return Ok(false);
        }
        self.rewrite_items(&table)?;
        Ok(true)
    }
}

impl RunLogStore for FileStore {
    fn create_run(&self, started_at: DateTime<Utc>) -> Result<FetchRun, StoreError> {
        let mut runs = self.run_table()?;
        let run = runs.create(started_at);
        self.write_runs(&runs)?;
        Ok(run)
    }

    fn finish_run(
        &self,
        run_id: u64,
        finished_at: DateTime<Utc>,
        counts: RunCounts,
        error: Option<String>,
    ) -> Result<FetchRun, StoreError> {
        let mut runs = self.run_table()?;
        let run = runs.finish(run_id, finished_at, counts, error)?;
        self.write_runs(&runs)?;
        Ok(run)
    }

    fn runs(&self) -> Result<Vec<FetchRun>, StoreError> {
        Ok(self.run_table()?.all().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawItem, RunStatus};
    use chrono::{Duration, TimeZone};

    fn item(id: &str, at: DateTime<Utc>) -> Item {
        Item::from_raw(&RawItem::new(id, "Zinc output falls", at), 500).unwrap()
    }

    #[tokio::test]
    async fn survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        {
            let s = FileStore::open(tmp.path()).unwrap();
            s.insert(item("a", t0)).await.unwrap();
            s.insert(item("b", t0 + Duration::hours(1))).await.unwrap();
            assert_eq!(s.insert(item("a", t0)).await.unwrap(), InsertOutcome::Duplicate);
            let run = s.create_run(t0).unwrap();
            s.finish_run(run.run_id, t0, RunCounts::default(), Some("x".into()))
                .unwrap();
        }
        let s = FileStore::open(tmp.path()).unwrap();
        assert_eq!(s.aggregate_stats().await.unwrap().total, 2);
        assert_eq!(s.runs().unwrap()[0].status, RunStatus::Failed);
        assert_eq!(s.create_run(t0).unwrap().run_id, 2);
    }

    #[tokio::test]
    async fn body_update_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        {
            let s = FileStore::open(tmp.path()).unwrap();
            s.insert(item("a", t0)).await.unwrap();
            assert!(s.update_body("a", "Output fell 4%.".into()).await.unwrap());
        }
        let s = FileStore::open(tmp.path()).unwrap();
        assert_eq!(s.get("a").await.unwrap().unwrap().body.as_deref(), Some("Output fell 4%."));
        assert!(s.items_missing_body(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retention_rewrites_file() {
        let tmp = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let s = FileStore::open(tmp.path()).unwrap();
        s.insert(item("old", t0 - Duration::days(400))).await.unwrap();
        s.insert(item("new", t0)).await.unwrap();
        assert_eq!(s.delete_older_than(t0 - Duration::days(365)).await.unwrap(), 1);
        drop(s);

        let s = FileStore::open(tmp.path()).unwrap();
        assert!(s.get("old").await.unwrap().is_none());
        assert!(s.get("new").await.unwrap().is_some());
    }
}
