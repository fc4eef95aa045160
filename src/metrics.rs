// src/metrics.rs
//! Metric registration and the optional Prometheus exporter.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on first scrape).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_api_calls_total",
            "Remote calls issued, including retries."
        );
        describe_counter!("ingest_retries_total", "Failed remote calls that were retried.");
        describe_counter!("ingest_pages_total", "Pages fetched by the orchestrators.");
        describe_counter!("ingest_items_inserted_total", "Items newly stored.");
        describe_counter!(
            "ingest_items_updated_total",
            "Stored items whose missing body was filled in."
        );
        describe_counter!(
            "ingest_items_duplicate_total",
            "Items dropped as exact duplicates (in-run or already stored)."
        );
        describe_counter!(
            "ingest_items_near_duplicate_total",
            "Items rejected by headline similarity."
        );
        describe_counter!(
            "ingest_items_filtered_total",
            "Items dropped by priority score filters."
        );
        describe_counter!(
            "ingest_items_malformed_total",
            "Items missing id, headline or timestamp."
        );
        describe_counter!("ingest_runs_total", "Finished runs by status.");
        describe_histogram!("ingest_page_ms", "Page processing time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the last run finished successfully."
        );
    });
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
/// Must be called from inside a tokio runtime.
pub fn install_exporter(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics.listen_addr {addr:?}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing prometheus exporter")?;
    ensure_described();
    tracing::info!(target: "metrics", %addr, "prometheus exporter listening");
    Ok(())
}
