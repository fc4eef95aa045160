// src/ingest/paginate.rs
//! Forward walk: `current_start` advances, `end` stays fixed.

use chrono::{DateTime, Duration, Utc};

use crate::dedup::SeenIds;
use crate::error::IngestError;
use crate::ingest::pipeline::RunTally;
use crate::ingest::types::{FetchFilter, HeadlineRequest, PageFetch};
use crate::ingest::{latest_of, Ingestor, Walk};
use crate::model::{RawItem, TimeRange};

/// Cursor resolution: one second past the newest (or before the oldest) item.
pub fn cursor_step() -> Duration {
    Duration::seconds(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardStep {
    Continue(DateTime<Utc>),
    /// Range covered (short page or cursor reached `end`)
    Done,
    /// Cursor would not move; treated as done
    Stalled,
}

/// Decide the next cursor after a page of `page` raw items.
pub fn forward_step(
    page: &[RawItem],
    capacity: usize,
    current_start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ForwardStep, IngestError> {
    if page.len() < capacity {
        return Ok(ForwardStep::Done);
    }
    let newest = latest_of(page).ok_or(IngestError::CursorStalled {
        page_len: page.len(),
    })?;
    let next = newest + cursor_step();
    if next >= end {
        Ok(ForwardStep::Done)
    } else if next <= current_start {
        Ok(ForwardStep::Stalled)
    } else {
        Ok(ForwardStep::Continue(next))
    }
}

impl Ingestor {
    pub(crate) async fn walk_forward(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &FetchFilter,
        tally: &mut RunTally,
    ) -> Result<Walk, IngestError> {
        let capacity = self.page_capacity(None);
        let query = filter.to_query(&self.cfg.classifier);
        let max_pages = self.cfg.source.max_pages;
        let mut seen = SeenIds::new();
        let mut current_start = start;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(target: "ingest", pages = tally.pages, "stop requested; ending forward walk");
                return Ok(Walk::Cancelled);
            }
            let req = HeadlineRequest {
                range: TimeRange::between(current_start, end),
                capacity,
                query: query.clone(),
            };
            let page = match self.gateway.fetch_page(&req).await {
                PageFetch::Items(items) => items,
                PageFetch::Empty => {
                    tally.pages += 1;
                    tracing::debug!(target: "ingest", %current_start, "empty page; range covered");
                    return Ok(Walk::Complete);
                }
                PageFetch::Failed(e) => return Err(e.into()),
            };

            let report = self
                .process_page(&page, &mut seen, filter.requested_category())
                .await;
            tally.absorb(&report);

            match forward_step(&page, capacity, current_start, end)? {
                ForwardStep::Done => return Ok(Walk::Complete),
                ForwardStep::Stalled => {
                    tracing::warn!(target: "ingest", %current_start, "cursor did not advance; treating range as covered");
                    return Ok(Walk::Complete);
                }
                ForwardStep::Continue(next) => {
                    if max_pages.is_some_and(|m| tally.pages >= m) {
                        tracing::warn!(target: "ingest", pages = tally.pages, next = %next, "max_pages reached; run truncated");
                        return Ok(Walk::Truncated);
                    }
                    tracing::debug!(target: "ingest", from = %current_start, to = %next, "advancing cursor");
                    current_start = next;
                }
            }
        }
    }
}
