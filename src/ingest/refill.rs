// src/ingest/refill.rs
//! Body refill: stored items saved without a body get one more attempt.
//!
//! Each body goes through the gateway, so the body rate budget and the retry
//! policy apply exactly as during ingestion. A missing or failed body is
//! counted and the batch moves on.

use metrics::counter;

use crate::error::IngestError;
use crate::ingest::pipeline::RunTally;
use crate::ingest::{Ingestor, Walk};

impl Ingestor {
    pub(crate) async fn refill_missing(
        &self,
        category: Option<&str>,
        limit: Option<usize>,
        tally: &mut RunTally,
    ) -> Result<Walk, IngestError> {
        let pending = self.store.items_missing_body(category, limit).await?;
        tally.fetched = pending.len();
        tracing::info!(
            target: "ingest",
            pending = pending.len(),
            category = category.unwrap_or("ALL"),
            "refilling missing bodies"
        );

        for item in pending {
            if self.cancel.is_cancelled() {
                tracing::info!(target: "ingest", updated = tally.updated, "stop requested; ending body refill");
                return Ok(Walk::Cancelled);
            }
            let Some(body) = self.gateway.fetch_body(&item.id).await else {
                tally.failed += 1;
                tracing::warn!(target: "ingest", id = %item.id, "no body available");
                continue;
            };
            let chars = body.chars().count();
            match self.store.update_body(&item.id, body).await {
                Ok(true) => {
                    tally.updated += 1;
                    counter!("ingest_items_updated_total").increment(1);
                    tracing::debug!(target: "ingest", id = %item.id, chars, "body stored");
                }
                Ok(false) => {
                    tally.failed += 1;
                    tracing::warn!(target: "ingest", id = %item.id, "item vanished before body update");
                }
                Err(e) => {
                    tally.failed += 1;
                    tracing::warn!(target: "ingest", id = %item.id, error = %e, "body update failed");
                }
            }
        }
        Ok(Walk::Complete)
    }
}
