// tests/ingest_backfill.rs
mod common;

use chrono::Duration;
use common::{at_min, fast_config, harness, raw, t0, Recording, ScriptedSource};
use newswire_ingest::ingest::providers::FixtureSource;
use newswire_ingest::{FetchFilter, RunOutcome, RunStatus};
use std::sync::Arc;

/// One story every five minutes in `(t0, t0 + 10h]`.
fn ten_hours_of_stories() -> FixtureSource {
    FixtureSource::new(
        (1..=120)
            .map(|i| raw(&format!("s{i}"), &format!("Copper market update {i}"), at_min(5 * i)))
            .collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn walks_back_in_pages_of_fifty_until_the_target() {
    let mut cfg = fast_config();
    cfg.source.page_capacity = 50;
    let src = Arc::new(Recording::new(ten_hours_of_stories()));
    let h = harness(cfg, src.clone());
    let end = t0() + Duration::hours(10);

    let report = h.ingestor.backfill(t0(), Some(end), &FetchFilter::default()).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.label, "backfill:ALL");
    assert_eq!(report.inserted, 120);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.pages, 4);

    let one = Duration::seconds(1);
    let ends: Vec<_> = src.requests().iter().map(|r| r.range.end.unwrap()).collect();
    assert_eq!(
        ends,
        vec![end, at_min(355) - one, at_min(105) - one, at_min(5) - one]
    );
    assert!(src.requests().iter().all(|r| r.range.start == Some(t0())));
    assert_eq!(h.store.len(), 120);
}

#[tokio::test(start_paused = true)]
async fn stops_once_the_oldest_item_reaches_the_target() {
    let src = Arc::new(ScriptedSource::pages(vec![vec![
        raw("late", "Zinc output cut", at_min(60)),
        raw("first", "Zinc smelter restarts", t0()),
    ]]));
    let h = harness(fast_config(), src.clone());

    let report = h
        .ingestor
        .backfill(t0(), Some(at_min(120)), &FetchFilter::default())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.inserted, 2);
    assert_eq!(src.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_page_does_not_end_a_backfill() {
    let src = Arc::new(ScriptedSource::pages(vec![
        vec![raw("a", "Tin prices climb", at_min(300))],
        vec![raw("b", "Tin exports resume", at_min(100))],
    ]));
    let h = harness(fast_config(), src.clone());

    let report = h
        .ingestor
        .backfill(t0(), Some(at_min(600)), &FetchFilter::category("TIN"))
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.inserted, 2);
    let reqs = src.requests();
    // two short pages, then the empty page that ends the walk
    assert_eq!(reqs.len(), 3);
    assert_eq!(reqs[1].range.end, Some(at_min(300) - Duration::seconds(1)));
    assert_eq!(reqs[2].range.end, Some(at_min(100) - Duration::seconds(1)));
    assert!(reqs.iter().all(|r| r.query.as_deref() == Some("Topic:MTN")));

    let stored = h.store.all_items();
    assert!(stored.iter().all(|i| i.categories.first() == Some("TIN")));
}

#[tokio::test(start_paused = true)]
async fn rerunning_a_backfill_inserts_nothing_new() {
    let mut cfg = fast_config();
    cfg.source.page_capacity = 50;
    let src = Arc::new(ten_hours_of_stories());
    let h = harness(cfg, src);
    let end = t0() + Duration::hours(10);

    let first = h.ingestor.backfill(t0(), Some(end), &FetchFilter::default()).await;
    let second = h.ingestor.backfill(t0(), Some(end), &FetchFilter::default()).await;

    assert_eq!(first.inserted, 120);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 120);
    assert!(second.is_success());
    assert_eq!(h.store.len(), 120);
    assert_eq!(h.ingestor.fetch_log().runs().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn max_pages_truncates_a_backfill() {
    let mut cfg = fast_config();
    cfg.source.page_capacity = 50;
    cfg.source.max_pages = Some(2);
    let src = Arc::new(Recording::new(ten_hours_of_stories()));
    let h = harness(cfg, src.clone());
    let end = t0() + Duration::hours(10);

    let report = h.ingestor.backfill(t0(), Some(end), &FetchFilter::default()).await;

    assert_eq!(report.outcome, RunOutcome::Truncated);
    assert!(report.is_success());
    assert_eq!(report.pages, 2);
    assert_eq!(report.inserted, 100);
    assert_eq!(src.requests().len(), 2);
    assert_eq!(h.store.len(), 100);

    let runs = h.ingestor.fetch_log().runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].items_inserted, 100);
}
