// src/ingest/backfill.rs
//! Reverse walk: `current_end` retreats toward a fixed `target_start`.
//!
//! A short page is only a hint here; the gap down to `target_start` may
//! still hold data, so termination waits for the timestamp check or an
//! empty page.

use chrono::{DateTime, Utc};

use crate::dedup::SeenIds;
use crate::error::IngestError;
use crate::ingest::paginate::cursor_step;
use crate::ingest::pipeline::RunTally;
use crate::ingest::types::{FetchFilter, HeadlineRequest, PageFetch};
use crate::ingest::{earliest_of, Ingestor, Walk};
use crate::model::{RawItem, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackwardStep {
    Continue(DateTime<Utc>),
    /// Next end would be at or before `target_start`, or the page was empty
    Done,
    /// Cursor would not retreat; treated as done
    Stalled,
}

pub fn backward_step(
    page: &[RawItem],
    target_start: DateTime<Utc>,
    current_end: DateTime<Utc>,
) -> Result<BackwardStep, IngestError> {
    if page.is_empty() {
        return Ok(BackwardStep::Done);
    }
    let oldest = earliest_of(page).ok_or(IngestError::CursorStalled {
        page_len: page.len(),
    })?;
    let next = oldest - cursor_step();
    if next <= target_start {
        Ok(BackwardStep::Done)
    } else if next >= current_end {
        Ok(BackwardStep::Stalled)
    } else {
        Ok(BackwardStep::Continue(next))
    }
}

impl Ingestor {
    pub(crate) async fn walk_backward(
        &self,
        target_start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &FetchFilter,
        tally: &mut RunTally,
    ) -> Result<Walk, IngestError> {
        let capacity = self.page_capacity(None);
        let query = filter.to_query(&self.cfg.classifier);
        let max_pages = self.cfg.source.max_pages;
        let mut seen = SeenIds::new();
        let mut current_end = end;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(target: "ingest", pages = tally.pages, "stop requested; ending backfill");
                return Ok(Walk::Cancelled);
            }
            let req = HeadlineRequest {
                range: TimeRange::between(target_start, current_end),
                capacity,
                query: query.clone(),
            };
            let page = match self.gateway.fetch_page(&req).await {
                PageFetch::Items(items) => items,
                PageFetch::Empty => {
                    tally.pages += 1;
                    tracing::debug!(target: "ingest", %current_end, "empty page; history exhausted");
                    return Ok(Walk::Complete);
                }
                PageFetch::Failed(e) => return Err(e.into()),
            };

            let report = self
                .process_page(&page, &mut seen, filter.requested_category())
                .await;
            tally.absorb(&report);
            if page.len() < capacity {
                tracing::debug!(target: "ingest", len = page.len(), capacity, "short page; continuing until boundary");
            }

            match backward_step(&page, target_start, current_end)? {
                BackwardStep::Done => return Ok(Walk::Complete),
                BackwardStep::Stalled => {
                    tracing::warn!(target: "ingest", %current_end, "cursor did not retreat; treating backfill as done");
                    return Ok(Walk::Complete);
                }
                BackwardStep::Continue(next) => {
                    if max_pages.is_some_and(|m| tally.pages >= m) {
                        tracing::warn!(target: "ingest", pages = tally.pages, next = %next, "max_pages reached; backfill truncated");
                        return Ok(Walk::Truncated);
                    }
                    tracing::debug!(target: "ingest", from = %current_end, to = %next, "retreating cursor");
                    current_end = next;
                }
            }
        }
    }
}
