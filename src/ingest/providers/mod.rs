// src/ingest/providers/mod.rs
pub mod fixture;
#[cfg(feature = "ingest-http")]
pub mod http;

pub use fixture::FixtureSource;
#[cfg(feature = "ingest-http")]
pub use http::HttpSource;
