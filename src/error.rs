// src/error.rs
//! Typed error taxonomy for the ingestion engine.
//!
//! Transient remote failures (`SourceError`) are retried by the engine; store
//! failures (`StoreError`) are counted per item; `IngestError` ends a run.
//! Duplicates and malformed items are not errors and never appear here.

use thiserror::Error;

/// Failure reported by a `NewsSource` for a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network / connection level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote side asked us to slow down
    #[error("rate limited by remote source")]
    RateLimited,

    /// Call did not finish in time
    #[error("remote call timed out")]
    Timeout,

    /// Response arrived but could not be decoded
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode(message.to_string())
    }
}

#[cfg(feature = "ingest-http")]
impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.status().map(|s| s.as_u16()) == Some(429) {
            Self::RateLimited
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Returned by `RetryPolicy::run` once every attempt has failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: SourceError },
}

/// Failure of the article store or run log.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("unknown run id {0}")]
    UnknownRun(u64),
}

/// Conditions that end an orchestrator run early.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A non-empty page carried no usable publish timestamp.
    #[error("cannot advance cursor: page of {page_len} items has no usable timestamp")]
    CursorStalled { page_len: usize },

    /// Every retry attempt for a page failed.
    #[error("remote source unavailable after {attempts} attempts: {last}")]
    SourceUnavailable { attempts: u32, last: SourceError },

    /// The store could not answer a query the run depends on.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Caller supplied a range that cannot be walked.
    #[error("invalid time range: {0}")]
    InvalidRange(String),
}

impl From<RetryError> for IngestError {
    fn from(e: RetryError) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => {
                IngestError::SourceUnavailable { attempts, last }
            }
        }
    }
}
