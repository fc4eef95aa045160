// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod dedup;
pub mod error;
pub mod fetch_log;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::error::{IngestError, RetryError, SourceError, StoreError};
pub use crate::ingest::config::AppConfig;
pub use crate::ingest::types::{FetchFilter, HeadlineRequest, NewsSource, PageFetch};
pub use crate::ingest::{Ingestor, RunOutcome, RunReport};
pub use crate::model::{CategorySet, FetchRun, Item, RawItem, RunStatus, TimeRange, Urgency};
pub use crate::store::{ArticleStore, InsertOutcome, RunLogStore, StoreStats};
