// src/fetch_log.rs
//! Run bookkeeping: one `FetchRun` record per orchestrator invocation.
//!
//! `FetchLogRecorder::start` hands out a `RunHandle`. The handle is consumed
//! by `complete`, and if it is dropped without completing (early return,
//! panic unwinding) the run is closed as failed. Either way the record is
//! finished exactly once.

use chrono::Utc;
use metrics::{counter, gauge};
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::{FetchRun, RunCounts, RunStatus};
use crate::store::RunLogStore;

pub const ABORTED_MESSAGE: &str = "run aborted";

#[derive(Clone)]
pub struct FetchLogRecorder {
    store: Arc<dyn RunLogStore>,
}

impl FetchLogRecorder {
    pub fn new(store: Arc<dyn RunLogStore>) -> Self {
        Self { store }
    }

    pub fn start(&self, label: &str) -> Result<RunHandle, StoreError> {
        let run = self.store.create_run(Utc::now())?;
        tracing::info!(target: "fetch_log", run_id = run.run_id, label, "run started");
        Ok(RunHandle {
            run_id: run.run_id,
            label: label.to_string(),
            store: Arc::clone(&self.store),
            done: false,
        })
    }

    pub fn runs(&self) -> Result<Vec<FetchRun>, StoreError> {
        self.store.runs()
    }

    /// Most recent successfully completed run.
    pub fn last_success(&self) -> Result<Option<FetchRun>, StoreError> {
        Ok(self
            .store
            .runs()?
            .into_iter()
            .filter(|r| r.status == RunStatus::Completed)
            .max_by_key(|r| r.finished_at))
    }
}

#[must_use = "a run handle that is dropped is recorded as failed"]
pub struct RunHandle {
    run_id: u64,
    label: String,
    store: Arc<dyn RunLogStore>,
    done: bool,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Close the run: completed without `error`, failed with one.
    pub fn complete(mut self, counts: RunCounts, error: Option<String>) -> Option<FetchRun> {
        self.finish(counts, error)
    }

    fn finish(&mut self, counts: RunCounts, error: Option<String>) -> Option<FetchRun> {
        self.done = true;
        match self
            .store
            .finish_run(self.run_id, Utc::now(), counts, error)
        {
            Ok(run) => {
                counter!("ingest_runs_total", "status" => run.status.as_str()).increment(1);
                if run.status == RunStatus::Completed {
                    gauge!("ingest_last_run_ts").set(Utc::now().timestamp() as f64);
                }
                tracing::info!(
                    target: "fetch_log",
                    run_id = run.run_id,
                    label = %self.label,
                    status = run.status.as_str(),
                    fetched = run.items_fetched,
                    inserted = run.items_inserted,
                    api_calls = run.api_calls,
                    error = run.error.as_deref().unwrap_or(""),
                    "run finished"
                );
                Some(run)
            }
            Err(e) => {
                tracing::error!(target: "fetch_log", run_id = self.run_id, error = %e, "could not record run completion");
                None
            }
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!(target: "fetch_log", run_id = self.run_id, "run handle dropped before completion");
            self.finish(RunCounts::default(), Some(ABORTED_MESSAGE.to_string()));
        }
    }
}
