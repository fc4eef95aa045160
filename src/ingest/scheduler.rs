// src/ingest/scheduler.rs
//! Periodic jobs on one task: incremental fetch, daily batch, retention
//! maintenance and a health check. Jobs never overlap; the stop token is
//! observed between jobs (and between pages inside a run). `run_once` runs
//! a single job immediately, outside the timers.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ingest::config::{ScheduleConfig, MAX_WINDOW_HOURS};
use crate::ingest::types::FetchFilter;
use crate::ingest::Ingestor;

const CLOCK_CHECK: Duration = Duration::from_secs(60);

/// One scheduler job, runnable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Latest,
    Daily,
    Maintenance,
    Health,
}

impl Job {
    pub const ALL: [Job; 4] = [Job::Latest, Job::Daily, Job::Maintenance, Job::Health];

    pub fn as_str(self) -> &'static str {
        match self {
            Job::Latest => "latest",
            Job::Daily => "daily",
            Job::Maintenance => "maintenance",
            Job::Health => "health",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Job::ALL
            .into_iter()
            .find(|j| j.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown job {s:?} (expected latest, daily, maintenance or health)")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ok,
    NeverSucceeded,
    Stale { last_success: DateTime<Utc> },
}

/// Classify the time since the last successful run.
pub fn health_status(
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stale_after: ChronoDuration,
) -> Health {
    match last_success {
        None => Health::NeverSucceeded,
        Some(t) if now - t > stale_after => Health::Stale { last_success: t },
        Some(_) => Health::Ok,
    }
}

/// True once per UTC day, at or after `hour`.
pub fn daily_due(now: DateTime<Utc>, hour: u32, last_run: Option<NaiveDate>) -> bool {
    now.hour() >= hour && last_run != Some(now.date_naive())
}

/// `[yesterday 00:00, today 00:00)` in UTC, as an inclusive range.
pub fn previous_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (today - ChronoDuration::days(1), today - ChronoDuration::seconds(1))
}

pub struct Scheduler {
    ingestor: Arc<Ingestor>,
    cfg: ScheduleConfig,
    cancel: CancellationToken,
    last_daily: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        let cfg = ingestor.config().schedule.clone();
        let cancel = ingestor.cancel_token();
        Self {
            ingestor,
            cfg,
            cancel,
            last_daily: None,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let secs = |s: u64| Duration::from_secs(s.max(1));
        let mut incremental = interval(secs(self.cfg.incremental_interval_secs));
        let maint_period = secs(self.cfg.maintenance_interval_secs);
        let mut maintenance = interval_at(Instant::now() + maint_period, maint_period);
        let health_period = secs(self.cfg.health_interval_secs);
        let mut health = interval_at(Instant::now() + health_period, health_period);
        let mut clock = interval(CLOCK_CHECK);
        for t in [&mut incremental, &mut maintenance, &mut health, &mut clock] {
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        tracing::info!(
            target: "scheduler",
            incremental_secs = self.cfg.incremental_interval_secs,
            daily_batch_hour = self.cfg.daily_batch_hour,
            retention_days = self.cfg.retention_days,
            "scheduler started"
        );

        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = incremental.tick() => { self.incremental_job().await; }
                _ = clock.tick() => self.daily_job().await,
                _ = maintenance.tick() => { self.maintenance_job().await; }
                _ = health.tick() => { self.health_job().await; }
            }
        }
        tracing::info!(target: "scheduler", "scheduler stopped");
    }

    /// Run a single job now, outside the timer loop. Returns whether it
    /// succeeded (for `Health`, whether the run log looks healthy).
    pub async fn run_once(&self, job: Job) -> bool {
        tracing::info!(target: "scheduler", %job, "running single job");
        let ok = match job {
            Job::Latest => self.incremental_job().await,
            Job::Daily => self.daily_batch(Utc::now()).await,
            Job::Maintenance => self.maintenance_job().await,
            Job::Health => self.health_job().await,
        };
        tracing::info!(target: "scheduler", %job, ok, "single job finished");
        ok
    }

    async fn incremental_job(&self) -> bool {
        match self.ingestor.fetch_since_latest().await {
            Ok(reports) => {
                let inserted: usize = reports.iter().map(|r| r.inserted).sum();
                let failed = reports.iter().filter(|r| !r.is_success()).count();
                tracing::info!(target: "scheduler", runs = reports.len(), inserted, failed, "incremental job done");
                failed == 0
            }
            Err(e) => {
                tracing::error!(target: "scheduler", error = %e, "incremental job could not start");
                false
            }
        }
    }

    async fn daily_job(&mut self) {
        let now = Utc::now();
        if !daily_due(now, self.cfg.daily_batch_hour, self.last_daily) {
            return;
        }
        self.last_daily = Some(now.date_naive());
        self.daily_batch(now).await;
    }

    /// Backfill the previous UTC day, per category.
    async fn daily_batch(&self, now: DateTime<Utc>) -> bool {
        let (start, end) = previous_day(now);
        let filters: Vec<FetchFilter> = if self.cfg.incremental_categories.is_empty() {
            vec![FetchFilter::default()]
        } else {
            self.cfg
                .incremental_categories
                .iter()
                .map(|c| FetchFilter::category(c))
                .collect()
        };
        let mut ok = true;
        for filter in &filters {
            if self.cancel.is_cancelled() {
                break;
            }
            let report = self.ingestor.backfill(start, Some(end), filter).await;
            tracing::info!(target: "scheduler", %start, %end, "daily batch: {report}");
            ok &= report.is_success();
        }
        ok
    }

    async fn maintenance_job(&self) -> bool {
        let ok = match self.ingestor.cleanup(self.cfg.retention_days).await {
            Ok(removed) => {
                tracing::info!(target: "scheduler", removed, "maintenance: retention applied");
                true
            }
            Err(e) => {
                tracing::error!(target: "scheduler", error = %e, "maintenance failed");
                false
            }
        };
        match self.ingestor.stats().await {
            Ok(s) => tracing::info!(
                target: "scheduler",
                total = s.total,
                sources = s.distinct_sources,
                avg_headline_len = s.avg_headline_len,
                "store stats"
            ),
            Err(e) => tracing::warn!(target: "scheduler", error = %e, "stats unavailable"),
        }
        ok
    }

    async fn health_job(&self) -> bool {
        let last = match self.ingestor.fetch_log().last_success() {
            Ok(r) => r.and_then(|r| r.finished_at),
            Err(e) => {
                tracing::warn!(target: "scheduler", error = %e, "health: run log unavailable");
                return false;
            }
        };
        let stale_secs = self
            .cfg
            .health_stale_after_secs
            .clamp(1, MAX_WINDOW_HOURS * 3600);
        match health_status(last, Utc::now(), ChronoDuration::seconds(stale_secs)) {
            Health::Ok => {
                tracing::debug!(target: "scheduler", "health ok");
                true
            }
            Health::NeverSucceeded => {
                tracing::warn!(target: "scheduler", "health: no successful run recorded yet");
                false
            }
            Health::Stale { last_success } => {
                tracing::warn!(
                    target: "scheduler",
                    %last_success,
                    "health: no successful run within {stale_secs}s"
                );
                false
            }
        }
    }
}
