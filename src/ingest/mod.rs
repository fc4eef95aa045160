// src/ingest/mod.rs
//! Ingestion engine: run modes on top of the page walkers.
//!
//! Every mode opens a fetch-log run, walks pages strictly one after another
//! through the `SourceGateway`, and closes the run with its counts. The
//! returned `RunReport` is what callers (CLI, scheduler) show or log.

pub mod backfill;
pub mod config;
pub mod gateway;
pub mod paginate;
pub mod pipeline;
pub mod providers;
pub mod rate_limit;
pub mod refill;
pub mod retry;
pub mod scheduler;
pub mod types;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::analyze::Classifier;
use crate::dedup::{NearDuplicateChecker, SeenIds};
use crate::error::{IngestError, StoreError};
use crate::fetch_log::FetchLogRecorder;
use crate::ingest::config::{AppConfig, MAX_RETENTION_DAYS, MAX_WINDOW_HOURS};
use crate::ingest::gateway::SourceGateway;
use crate::ingest::pipeline::RunTally;
use crate::ingest::types::{FetchFilter, HeadlineRequest, NewsSource, PageFetch};
use crate::model::{RawItem, RunCounts, TimeRange};
use crate::store::{ArticleStore, RunLogStore, StoreStats};

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. decoded &nbsp;)
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

pub(crate) fn latest_of(page: &[RawItem]) -> Option<DateTime<Utc>> {
    page.iter().filter_map(|r| r.published_at).max()
}

pub(crate) fn earliest_of(page: &[RawItem]) -> Option<DateTime<Utc>> {
    page.iter().filter_map(|r| r.published_at).min()
}

/// How a page walk ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Walk {
    Complete,
    Truncated,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    /// Stopped at `max_pages`; not an error
    Truncated,
    /// Stop signal observed between pages
    Cancelled,
    Failed(String),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

/// User-visible summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Option<u64>,
    pub label: String,
    pub fetched: usize,
    pub inserted: usize,
    /// Stored items whose body was filled in
    pub updated: usize,
    pub duplicates: usize,
    pub near_duplicates: usize,
    pub filtered: usize,
    pub malformed: usize,
    pub failed: usize,
    pub api_calls: u64,
    pub pages: usize,
    #[serde(serialize_with = "ser_duration_ms")]
    pub duration: std::time::Duration,
    pub outcome: RunOutcome,
}

fn ser_duration_ms<S: serde::Serializer>(d: &std::time::Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !self.outcome.is_failure()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &self.outcome {
            RunOutcome::Completed => "completed".to_string(),
            RunOutcome::Truncated => "truncated (max pages)".to_string(),
            RunOutcome::Cancelled => "cancelled".to_string(),
            RunOutcome::Failed(e) => format!("FAILED: {e}"),
        };
        write!(
            f,
            "[{}] {} | fetched {} | stored {} | updated {} | duplicates {} (+{} similar) | filtered {} | malformed {} | failed {} | pages {} | api calls {} | {:.1}s",
            self.label,
            status,
            self.fetched,
            self.inserted,
            self.updated,
            self.duplicates,
            self.near_duplicates,
            self.filtered,
            self.malformed,
            self.failed,
            self.pages,
            self.api_calls,
            self.duration.as_secs_f64()
        )
    }
}

pub struct Ingestor {
    pub(crate) cfg: Arc<AppConfig>,
    pub(crate) gateway: SourceGateway,
    pub(crate) store: Arc<dyn ArticleStore>,
    pub(crate) fetch_log: FetchLogRecorder,
    pub(crate) classifier: Classifier,
    pub(crate) near_dup: Option<NearDuplicateChecker>,
    pub(crate) cancel: CancellationToken,
}

impl Ingestor {
    pub fn new(
        cfg: Arc<AppConfig>,
        source: Arc<dyn NewsSource>,
        store: Arc<dyn ArticleStore>,
        runs: Arc<dyn RunLogStore>,
    ) -> Result<Self> {
        crate::metrics::ensure_described();
        let classifier = Classifier::new(&cfg.classifier)?;
        Ok(Self {
            gateway: SourceGateway::from_config(source, &cfg.source),
            near_dup: NearDuplicateChecker::from_config(&cfg.dedup.near_duplicate),
            fetch_log: FetchLogRecorder::new(runs),
            classifier,
            store,
            cancel: CancellationToken::new(),
            cfg,
        })
    }

    /// Share a stop signal with the caller (scheduler, ctrl-c handler).
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn fetch_log(&self) -> &FetchLogRecorder {
        &self.fetch_log
    }

    pub(crate) fn page_capacity(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.cfg.source.page_capacity)
            .clamp(1, self.cfg.source.max_page_capacity)
    }

    /// Open a logged run, drive `mode`, close the run and build the report.
    async fn run_logged(&self, mode: RunMode<'_>) -> RunReport {
        let label = mode.label();
        let t0 = Instant::now();
        let calls_before = self.gateway.api_calls();
        let handle = match self.fetch_log.start(&label) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, %label, "could not open fetch run; continuing unlogged");
                None
            }
        };

        let mut tally = RunTally::default();
        let result = self.drive(mode, &mut tally).await;
        let api_calls = self.gateway.api_calls() - calls_before;

        let outcome = match result {
            Ok(Walk::Complete) => RunOutcome::Completed,
            Ok(Walk::Truncated) => RunOutcome::Truncated,
            Ok(Walk::Cancelled) => RunOutcome::Cancelled,
            Err(e) => {
                tracing::error!(target: "ingest", %label, error = %e, "run failed");
                RunOutcome::Failed(e.to_string())
            }
        };

        let run_id = handle.map(|h| {
            let id = h.run_id();
            let counts = RunCounts {
                fetched: tally.fetched as u64,
                inserted: tally.inserted as u64,
                updated: tally.updated as u64,
                api_calls,
            };
            let error = match &outcome {
                RunOutcome::Failed(e) => Some(e.clone()),
                _ => None,
            };
            h.complete(counts, error);
            id
        });

        let report = RunReport {
            run_id,
            label,
            fetched: tally.fetched,
            inserted: tally.inserted,
            updated: tally.updated,
            duplicates: tally.duplicates,
            near_duplicates: tally.near_duplicates,
            filtered: tally.filtered,
            malformed: tally.malformed,
            failed: tally.failed,
            api_calls,
            pages: tally.pages,
            duration: t0.elapsed(),
            outcome,
        };
        tracing::info!(target: "ingest", "{report}");
        report
    }

    async fn drive(&self, mode: RunMode<'_>, tally: &mut RunTally) -> Result<Walk, IngestError> {
        match mode {
            RunMode::Once {
                filter,
                count,
                range,
            } => {
                if let (Some(start), Some(end)) = (range.start, range.end) {
                    check_range(start, end)?;
                }
                let req = HeadlineRequest {
                    range,
                    capacity: self.page_capacity(count),
                    query: filter.to_query(&self.cfg.classifier),
                };
                match self.gateway.fetch_page(&req).await {
                    PageFetch::Items(items) => {
                        let mut seen = SeenIds::new();
                        let report = self
                            .process_page(&items, &mut seen, filter.requested_category())
                            .await;
                        tally.absorb(&report);
                        Ok(Walk::Complete)
                    }
                    PageFetch::Empty => {
                        tally.pages += 1;
                        Ok(Walk::Complete)
                    }
                    PageFetch::Failed(e) => Err(e.into()),
                }
            }
            RunMode::Forward { start, end, filter } => {
                check_range(start, end)?;
                self.walk_forward(start, end, filter, tally).await
            }
            RunMode::Backward { start, end, filter }
            | RunMode::Incremental { start, end, filter } => {
                check_range(start, end)?;
                self.walk_backward(start, end, filter, tally).await
            }
            RunMode::RefillBodies { category, limit } => {
                self.refill_missing(category, limit, tally).await
            }
        }
    }

    /// One page, optionally bounded in time. `count` defaults to the page
    /// capacity and is capped at the source maximum.
    pub async fn fetch_once(
        &self,
        filter: &FetchFilter,
        count: Option<usize>,
        range: TimeRange,
    ) -> RunReport {
        self.run_logged(RunMode::Once {
            filter,
            count,
            range,
        })
        .await
    }

    /// Exhaustive forward coverage of `[start, end]`; `end` defaults to now.
    pub async fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        filter: &FetchFilter,
    ) -> RunReport {
        let end = end.unwrap_or_else(Utc::now);
        self.run_logged(RunMode::Forward { start, end, filter }).await
    }

    /// Walk backward from `end` (default now) down to `start`.
    pub async fn backfill(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        filter: &FetchFilter,
    ) -> RunReport {
        let end = end.unwrap_or_else(Utc::now);
        self.run_logged(RunMode::Backward { start, end, filter }).await
    }

    /// Incremental fetch from the newest stored item up to now, once per
    /// configured category (one unscoped run when none are configured).
    ///
    /// The source serves newest first, so each run walks backward from now
    /// down to the newest stored item; a gap wider than one page is covered.
    pub async fn fetch_since_latest(&self) -> Result<Vec<RunReport>, StoreError> {
        let now = Utc::now();
        let lookback =
            Duration::hours(self.cfg.schedule.incremental_lookback_hours.clamp(1, MAX_WINDOW_HOURS));
        let start = match self.store.latest_timestamp().await? {
            Some(ts) if ts < now => ts,
            Some(_) => now - Duration::minutes(1),
            None => now - lookback,
        };

        let sched = &self.cfg.schedule;
        let filters: Vec<FetchFilter> = if sched.incremental_categories.is_empty() {
            vec![FetchFilter::default()]
        } else {
            sched
                .incremental_categories
                .iter()
                .map(|c| FetchFilter::category(c))
                .collect()
        };

        let pause = std::time::Duration::from_secs(sched.category_pause_secs);
        let mut reports = Vec::with_capacity(filters.len());
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            if self.cancel.is_cancelled() {
                tracing::info!(target: "ingest", remaining = filters.len() - i, "stop requested; skipping remaining categories");
                break;
            }
            reports.push(
                self.run_logged(RunMode::Incremental {
                    start,
                    end: now,
                    filter,
                })
                .await,
            );
        }
        Ok(reports)
    }

    /// Fetch bodies for stored items that have none, newest first.
    /// `category` restricts to items tagged with it; `limit` caps the batch.
    pub async fn refill_bodies(&self, category: Option<&str>, limit: Option<usize>) -> RunReport {
        self.run_logged(RunMode::RefillBodies { category, limit }).await
    }

    /// Retention: drop items older than `days_to_keep` days.
    pub async fn cleanup(&self, days_to_keep: i64) -> Result<u64, IngestError> {
        let cutoff = retention_cutoff(Utc::now(), days_to_keep)?;
        let removed = self.store.delete_older_than(cutoff).await?;
        tracing::info!(target: "ingest", removed, %cutoff, "retention cleanup");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.store.aggregate_stats().await
    }
}

enum RunMode<'a> {
    Once {
        filter: &'a FetchFilter,
        count: Option<usize>,
        range: TimeRange,
    },
    Forward {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &'a FetchFilter,
    },
    Backward {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &'a FetchFilter,
    },
    /// Backward walk from now down to the newest stored item
    Incremental {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &'a FetchFilter,
    },
    RefillBodies {
        category: Option<&'a str>,
        limit: Option<usize>,
    },
}

impl RunMode<'_> {
    fn label(&self) -> String {
        match self {
            RunMode::Once { filter, .. } => format!("fetch:{}", filter.label()),
            RunMode::Forward { filter, .. } => format!("range:{}", filter.label()),
            RunMode::Backward { filter, .. } => format!("backfill:{}", filter.label()),
            RunMode::Incremental { filter, .. } => format!("incremental:{}", filter.label()),
            RunMode::RefillBodies { category, .. } => {
                format!("refill:{}", category.unwrap_or("ALL"))
            }
        }
    }
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), IngestError> {
    if start >= end {
        return Err(IngestError::InvalidRange(format!(
            "start {start} is not before end {end}"
        )));
    }
    Ok(())
}

fn retention_cutoff(now: DateTime<Utc>, days_to_keep: i64) -> Result<DateTime<Utc>, IngestError> {
    if !(0..=MAX_RETENTION_DAYS).contains(&days_to_keep) {
        return Err(IngestError::InvalidRange(format!(
            "days to keep must be in 0..={MAX_RETENTION_DAYS}, got {days_to_keep}"
        )));
    }
    Duration::try_days(days_to_keep)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| {
            IngestError::InvalidRange(format!("{days_to_keep} days before {now} is out of range"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn retention_cutoff_rejects_unrepresentable_windows() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            retention_cutoff(now, 30).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(retention_cutoff(now, 0).unwrap(), now);
        assert!(matches!(
            retention_cutoff(now, i64::MAX / 1000),
            Err(IngestError::InvalidRange(_))
        ));
        assert!(retention_cutoff(now, -1).is_err());
    }
}
