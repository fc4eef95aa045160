// src/dedup/mod.rs
//! Duplicate suppression.
//!
//! Two independent layers:
//! - `SeenIds`: exact identifier dedup within one run, always on.
//! - `NearDuplicateChecker`: headline similarity against recently stored
//!   items, applied right before insert when enabled in config.

pub mod exact;
pub mod similarity;

use chrono::{DateTime, Duration, Utc};

use crate::ingest::config::{NearDuplicateConfig, MAX_WINDOW_HOURS};
use crate::store::ArticleStore;

pub use exact::SeenIds;

/// Stored item a new headline collided with.
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicate {
    pub existing_id: String,
    pub existing_headline: String,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct NearDuplicateChecker {
    window: Duration,
    threshold: f64,
    max_features: usize,
}

impl NearDuplicateChecker {
    /// `None` when the check is disabled.
    pub fn from_config(cfg: &NearDuplicateConfig) -> Option<Self> {
        cfg.enabled.then(|| Self {
            window: Duration::hours(cfg.window_hours.clamp(1, MAX_WINDOW_HOURS)),
            threshold: cfg.threshold,
            max_features: cfg.max_features,
        })
    }

    /// Compare `headline` with everything stored in `[now - window, now]`.
    ///
    /// Best-effort: an empty window, an empty vocabulary or a failing store
    /// query all mean "not a duplicate".
    pub async fn check(
        &self,
        store: &dyn ArticleStore,
        headline: &str,
        now: DateTime<Utc>,
    ) -> Option<NearDuplicate> {
        let since = now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent = match store.query_by_range(since, now).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "dedup", error = %e, "similarity check skipped: store query failed");
                return None;
            }
        };
        let existing: Vec<&str> = recent.iter().map(|i| i.headline.as_str()).collect();
        let Some((idx, similarity)) =
            similarity::best_match(headline, &existing, self.max_features)
        else {
            tracing::debug!(target: "dedup", candidates = existing.len(), "similarity check skipped");
            return None;
        };
        if similarity < self.threshold {
            return None;
        }
        let hit = &recent[idx];
        tracing::info!(
            target: "dedup",
            similarity = %format!("{similarity:.2}"),
            new = %preview(headline),
            existing_id = %hit.id,
            existing = %preview(&hit.headline),
            "near-duplicate headline rejected"
        );
        Some(NearDuplicate {
            existing_id: hit.id.clone(),
            existing_headline: hit.headline.clone(),
            similarity,
        })
    }
}

fn preview(s: &str) -> String {
    s.chars().take(50).collect()
}
