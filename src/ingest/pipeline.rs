// src/ingest/pipeline.rs
//! Per-page processing: raw items in, stored items out.
//!
//! Order per page:
//! 1) build typed items (malformed ones dropped at debug level)
//! 2) exact in-run dedup
//! 3) skip ids already stored (no body fetch for them)
//! 4) body fetch, classification, score filters
//! 5) rank by score, near-duplicate check, insert

use chrono::Utc;
use metrics::{counter, histogram};
use std::time::Instant;

use crate::dedup::SeenIds;
use crate::ingest::Ingestor;
use crate::model::{Item, RawItem};
use crate::store::InsertOutcome;

/// Counts for one processed page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    /// Raw items returned by the source
    pub fetched: usize,
    pub malformed: usize,
    pub duplicates_in_run: usize,
    /// Already stored before this run saw them
    pub duplicates_stored: usize,
    pub near_duplicates: usize,
    pub filtered: usize,
    pub inserted: usize,
    /// Store writes that errored
    pub failed: usize,
}

impl PageReport {
    pub fn duplicates(&self) -> usize {
        self.duplicates_in_run + self.duplicates_stored
    }
}

/// Running totals across the pages of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub pages: usize,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub near_duplicates: usize,
    pub filtered: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl RunTally {
    pub fn absorb(&mut self, p: &PageReport) {
        self.pages += 1;
        self.fetched += p.fetched;
        self.inserted += p.inserted;
        self.duplicates += p.duplicates();
        self.near_duplicates += p.near_duplicates;
        self.filtered += p.filtered;
        self.malformed += p.malformed;
        self.failed += p.failed;
    }
}

impl Ingestor {
    pub(crate) async fn process_page(
        &self,
        raw: &[RawItem],
        seen: &mut SeenIds,
        requested: Option<&str>,
    ) -> PageReport {
        let t0 = Instant::now();
        let mut report = PageReport {
            fetched: raw.len(),
            ..PageReport::default()
        };

        let max_len = self.cfg.source.max_headline_length;
        let mut typed = Vec::with_capacity(raw.len());
        for r in raw {
            match Item::from_raw(r, max_len) {
                Ok(item) => typed.push(item),
                Err(reason) => {
                    report.malformed += 1;
                    tracing::debug!(target: "ingest", ?reason, id = ?r.id, "dropping malformed item");
                }
            }
        }

        let (unique, dropped) = seen.filter_page(typed);
        report.duplicates_in_run = dropped;

        let mut ready: Vec<Item> = Vec::with_capacity(unique.len());
        for mut item in unique {
            match self.store.get(&item.id).await {
                Ok(Some(_)) => {
                    report.duplicates_stored += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "ingest", id = %item.id, error = %e, "store lookup failed; relying on insert");
                }
            }
            if self.cfg.source.fetch_body {
                item.body = self.gateway.fetch_body(&item.id).await;
            }
            self.classifier.apply(&mut item, requested);
            if !self.classifier.passes_filters(&item) {
                report.filtered += 1;
                tracing::debug!(target: "ingest", id = %item.id, score = item.priority_score, "below minimum score");
                continue;
            }
            ready.push(item);
        }

        crate::analyze::rank_by_score(&mut ready);

        for item in ready {
            if let Some(checker) = &self.near_dup {
                if checker
                    .check(self.store.as_ref(), &item.headline, Utc::now())
                    .await
                    .is_some()
                {
                    report.near_duplicates += 1;
                    continue;
                }
            }
            let id = item.id.clone();
            match self.store.insert(item).await {
                Ok(InsertOutcome::Inserted) => report.inserted += 1,
                Ok(InsertOutcome::Duplicate) => report.duplicates_stored += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(target: "ingest", %id, error = %e, "insert failed");
                }
            }
        }

        counter!("ingest_pages_total").increment(1);
        counter!("ingest_items_inserted_total").increment(report.inserted as u64);
        counter!("ingest_items_duplicate_total").increment(report.duplicates() as u64);
        counter!("ingest_items_near_duplicate_total").increment(report.near_duplicates as u64);
        counter!("ingest_items_filtered_total").increment(report.filtered as u64);
        counter!("ingest_items_malformed_total").increment(report.malformed as u64);
        histogram!("ingest_page_ms").record(t0.elapsed().as_secs_f64() * 1000.0);

        tracing::debug!(
            target: "ingest",
            fetched = report.fetched,
            inserted = report.inserted,
            dup_in_run = report.duplicates_in_run,
            dup_stored = report.duplicates_stored,
            near_dup = report.near_duplicates,
            filtered = report.filtered,
            malformed = report.malformed,
            "page processed"
        );
        report
    }
}
