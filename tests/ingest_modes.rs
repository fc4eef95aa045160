// tests/ingest_modes.rs
mod common;

use chrono::{Duration, Utc};
use common::{at_min, fast_config, harness, raw, t0, Recording, ScriptedSource};
use newswire_ingest::ingest::providers::FixtureSource;
use newswire_ingest::{
    ArticleStore, FetchFilter, IngestError, Item, RunOutcome, RunStatus, TimeRange, Urgency,
};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn single_fetch_caps_count_and_tags_requested_category_first() {
    let page = vec![raw("n1", "Copper and zinc prices rise", at_min(5))];
    let src = Arc::new(ScriptedSource::pages(vec![page.clone(), page]));
    let h = harness(fast_config(), src.clone());
    let filter = FetchFilter::category("NICKEL");

    let first = h.ingestor.fetch_once(&filter, Some(500), TimeRange::unbounded()).await;
    assert_eq!(first.outcome, RunOutcome::Completed);
    assert_eq!(first.label, "fetch:NICKEL");
    assert_eq!(first.inserted, 1);

    let req = &src.requests()[0];
    assert_eq!(req.capacity, 100);
    assert_eq!(req.range, TimeRange::unbounded());
    assert_eq!(req.query.as_deref(), Some("Topic:MNI"));

    let stored = h.store.get("n1").await.unwrap().unwrap();
    assert_eq!(stored.categories.joined(), "NICKEL,COPPER,ZINC");
    assert_eq!(stored.source, "Reuters");

    let second = h.ingestor.fetch_once(&filter, None, TimeRange::unbounded()).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(src.requests()[1].capacity, 50);
}

#[tokio::test(start_paused = true)]
async fn body_is_cleaned_and_used_for_classification() {
    let mut cfg = fast_config();
    cfg.source.fetch_body = true;
    let src = Arc::new(
        ScriptedSource::pages(vec![vec![
            raw("a", "BREAKING: Copper mine strike in Chile", at_min(3)),
            raw("b", "Aluminium demand steady", at_min(2)),
        ]])
        .with_body("a", "<p>Workers at the mine&nbsp;halted zinc output too.</p>"),
    );
    let h = harness(cfg, src);

    let report = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;

    // one header call plus one body call per new item
    assert_eq!(report.api_calls, 3);
    let a = h.store.get("a").await.unwrap().unwrap();
    assert_eq!(a.body.as_deref(), Some("Workers at the mine halted zinc output too."));
    assert_eq!(a.categories.joined(), "COPPER,ZINC");
    assert_eq!(a.urgency, Urgency::High);
    assert_eq!(a.priority_score, 3);
    let b = h.store.get("b").await.unwrap().unwrap();
    assert_eq!(b.body, None);
}

#[tokio::test(start_paused = true)]
async fn stored_ids_skip_body_fetch() {
    let mut cfg = fast_config();
    cfg.source.fetch_body = true;
    let page = vec![raw("a", "Copper rises", at_min(3))];
    let src = Arc::new(ScriptedSource::pages(vec![page.clone(), page]));
    let h = harness(cfg, src);

    let first = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;
    let second = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;

    assert_eq!(first.api_calls, 2);
    assert_eq!(second.api_calls, 1);
    assert_eq!(second.duplicates, 1);
}

#[tokio::test(start_paused = true)]
async fn minimum_score_filters_low_priority_items() {
    let mut cfg = fast_config();
    cfg.classifier.priority.min_score = Some(3);
    let src = Arc::new(ScriptedSource::pages(vec![vec![
        raw("hot", "LME copper strike", at_min(2)),
        raw("cold", "Copper rises", at_min(1)),
    ]]));
    let h = harness(cfg, src);

    let report = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;

    assert_eq!(report.inserted, 1);
    assert_eq!(report.filtered, 1);
    let hot: Item = h.store.get("hot").await.unwrap().unwrap();
    assert_eq!(hot.priority_score, 6);
    assert!(h.store.get("cold").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn similar_headline_inside_window_is_rejected() {
    let mut cfg = fast_config();
    cfg.dedup.near_duplicate.enabled = true;
    let now = Utc::now();
    let src = Arc::new(ScriptedSource::pages(vec![vec![
        raw("n1", "Copper prices surge as LME inventories fall sharply", now),
        raw("n2", "Yen slides against the dollar", now),
    ]]));
    let h = harness(cfg, src);
    let seed = Item::from_raw(
        &raw("old", "Copper prices surge as LME inventories fall", now - Duration::hours(1)),
        500,
    )
    .unwrap();
    h.store.insert(seed).await.unwrap();

    let report = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;

    assert_eq!(report.near_duplicates, 1);
    assert_eq!(report.inserted, 1);
    assert!(h.store.get("n1").await.unwrap().is_none());
    assert!(h.store.get("n2").await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn incremental_starts_at_latest_stored_item_per_category() {
    let mut cfg = fast_config();
    cfg.schedule.incremental_categories = vec!["COPPER".into(), "ZINC".into()];
    cfg.schedule.category_pause_secs = 60;
    let src = Arc::new(ScriptedSource::pages(vec![]));
    let h = harness(cfg, src.clone());
    let latest = Utc::now() - Duration::minutes(10);
    h.store
        .insert(Item::from_raw(&raw("seen", "Copper rises", latest), 500).unwrap())
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let reports = h.ingestor.fetch_since_latest().await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].label, "incremental:COPPER");
    assert_eq!(reports[1].label, "incremental:ZINC");
    assert!(started.elapsed() >= std::time::Duration::from_secs(60));

    let reqs = src.requests();
    assert_eq!(reqs[0].query.as_deref(), Some("Topic:MCU"));
    assert_eq!(reqs[1].query.as_deref(), Some("Topic:MZN"));
    assert!(reqs.iter().all(|r| r.range.start == Some(latest)));
    assert_eq!(reqs[0].range.end, reqs[1].range.end);
}

#[tokio::test(start_paused = true)]
async fn incremental_covers_a_gap_wider_than_one_page() {
    let mut cfg = fast_config();
    cfg.source.page_capacity = 50;
    let latest = Utc::now() - Duration::hours(3);
    let stories: Vec<_> = (1..=120)
        .map(|i| {
            let at = latest + Duration::minutes(i);
            raw(&format!("g{i}"), &format!("Copper market update {i}"), at)
        })
        .collect();
    let src = Arc::new(Recording::new(FixtureSource::new(stories)));
    let h = harness(cfg, src.clone());
    h.store
        .insert(Item::from_raw(&raw("seen", "Copper rises", latest), 500).unwrap())
        .await
        .unwrap();

    let reports = h.ingestor.fetch_since_latest().await.unwrap();

    assert_eq!(reports.len(), 1);
    let r = &reports[0];
    assert_eq!(r.outcome, RunOutcome::Completed);
    assert_eq!(r.inserted, 120);
    // 50 + 50 + 20, then an empty page just above the stored item
    assert_eq!(r.pages, 4);
    assert_eq!(h.store.len(), 121);
    assert!(src.requests().iter().all(|q| q.range.start == Some(latest)));
}

#[tokio::test(start_paused = true)]
async fn incremental_on_empty_store_uses_lookback() {
    let src = Arc::new(ScriptedSource::pages(vec![]));
    let h = harness(fast_config(), src.clone());

    let reports = h.ingestor.fetch_since_latest().await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].label, "incremental:ALL");
    let r = &src.requests()[0].range;
    assert_eq!(r.end.unwrap() - r.start.unwrap(), Duration::hours(1));
}

#[tokio::test(start_paused = true)]
async fn cancelled_incremental_runs_nothing() {
    let src = Arc::new(ScriptedSource::pages(vec![]));
    let h = harness(fast_config(), src.clone());
    h.ingestor.cancel_token().cancel();

    let reports = h.ingestor.fetch_since_latest().await.unwrap();

    assert!(reports.is_empty());
    assert!(src.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cleanup_and_stats() {
    let src = Arc::new(ScriptedSource::pages(vec![]));
    let h = harness(fast_config(), src);
    let now = Utc::now();
    for (id, age_days) in [("fresh", 1), ("old", 400), ("older", 800)] {
        let item = Item::from_raw(&raw(id, "Copper rises", now - Duration::days(age_days)), 500)
            .unwrap();
        h.store.insert(item).await.unwrap();
    }

    assert_eq!(h.ingestor.cleanup(365).await.unwrap(), 2);
    assert!(matches!(
        h.ingestor.cleanup(i64::MAX / 1000).await,
        Err(IngestError::InvalidRange(_))
    ));
    assert!(h.ingestor.cleanup(-1).await.is_err());
    let stats = h.ingestor.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.distinct_sources, 1);
    assert_eq!(stats.newest, stats.oldest);
}

#[tokio::test(start_paused = true)]
async fn every_run_is_recorded_in_the_fetch_log() {
    let src = Arc::new(ScriptedSource::pages(vec![vec![raw("a", "Copper rises", t0())]]));
    let h = harness(fast_config(), src);

    let ok = h
        .ingestor
        .fetch_once(&FetchFilter::default(), None, TimeRange::unbounded())
        .await;
    let bad = h
        .ingestor
        .fetch_range(at_min(10), Some(t0()), &FetchFilter::default())
        .await;

    let runs = h.ingestor.fetch_log().runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(Some(runs[0].run_id), ok.run_id);
    assert_eq!(Some(runs[1].run_id), bad.run_id);
    assert!(runs.iter().all(|r| r.finished_at.is_some() && r.items_updated == 0));
    let last = h.ingestor.fetch_log().last_success().unwrap().unwrap();
    assert_eq!(last.run_id, runs[0].run_id);
    assert_eq!(last.items_inserted, 1);
}

fn stored(id: &str, category: &str, at: chrono::DateTime<Utc>) -> Item {
    let mut item = Item::from_raw(&raw(id, "Copper output update", at), 500).unwrap();
    item.categories = [category].into_iter().collect();
    item
}

#[tokio::test(start_paused = true)]
async fn refill_fills_missing_bodies_and_counts_updates() {
    let src = Arc::new(
        ScriptedSource::pages(vec![])
            .with_body("a", "<p>Smelter&nbsp;output fell.</p>")
            .with_body("c", "Never requested."),
    );
    let h = harness(fast_config(), src);
    h.store.insert(stored("a", "COPPER", at_min(3))).await.unwrap();
    h.store.insert(stored("b", "COPPER", at_min(2))).await.unwrap();
    let mut full = stored("c", "COPPER", at_min(1));
    full.body = Some("Already here.".into());
    h.store.insert(full).await.unwrap();

    let report = h.ingestor.refill_bodies(None, None).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.label, "refill:ALL");
    assert_eq!((report.fetched, report.updated, report.failed), (2, 1, 1));
    assert_eq!(report.api_calls, 2);
    let a = h.store.get("a").await.unwrap().unwrap();
    assert_eq!(a.body.as_deref(), Some("Smelter output fell."));
    assert_eq!(
        h.store.get("c").await.unwrap().unwrap().body.as_deref(),
        Some("Already here.")
    );

    let run = &h.ingestor.fetch_log().runs().unwrap()[0];
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.items_updated, 1);
    assert_eq!(run.items_inserted, 0);
}

#[tokio::test(start_paused = true)]
async fn refill_respects_category_and_limit() {
    let src = Arc::new(
        ScriptedSource::pages(vec![])
            .with_body("z1", "Zinc body one.")
            .with_body("z2", "Zinc body two.")
            .with_body("z3", "Zinc body three.")
            .with_body("cu", "Copper body."),
    );
    let h = harness(fast_config(), src);
    for (id, cat, m) in [("z1", "ZINC", 1), ("z2", "ZINC", 2), ("z3", "ZINC", 3), ("cu", "COPPER", 4)] {
        h.store.insert(stored(id, cat, at_min(m))).await.unwrap();
    }

    let report = h.ingestor.refill_bodies(Some("ZINC"), Some(2)).await;

    assert_eq!(report.label, "refill:ZINC");
    assert_eq!(report.updated, 2);
    assert!(h.store.get("z3").await.unwrap().unwrap().body.is_some());
    assert!(h.store.get("z2").await.unwrap().unwrap().body.is_some());
    assert!(h.store.get("z1").await.unwrap().unwrap().body.is_none());
    assert!(h.store.get("cu").await.unwrap().unwrap().body.is_none());
}
