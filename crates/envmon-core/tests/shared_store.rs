//! Concurrent ingestion into a shared store with snapshot evaluation.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use envmon_core::{
    Domain, Monitor, Reading, Severity, SharedReadingStore, StationStatus, ThresholdRegistry,
    ThresholdRule,
};

fn registry() -> Arc<ThresholdRegistry> {
    Arc::new(
        ThresholdRegistry::from_rules(vec![
            ThresholdRule::upper(Domain::Air, "PM2.5", 35.0, Severity::Critical),
            ThresholdRule::range(Domain::Water, "pH", 6.5, 8.5, Severity::Critical),
        ])
        .expect("registry"),
    )
}

#[tokio::test]
async fn concurrent_writers_lose_no_readings() {
    let shared = SharedReadingStore::new();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut handles = Vec::new();
    for writer in 0..4 {
        let store = shared.clone();
        handles.push(tokio::spawn(async move {
            for tick in 0..25 {
                store.record(Reading::new(
                    base + Duration::hours(tick),
                    format!("site-{writer}"),
                    Domain::Air,
                    "PM2.5",
                    10.0 + tick as f64,
                ));
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.expect("writer task");
    }

    assert_eq!(shared.len(), 100);
    let snapshot = shared.snapshot();
    assert_eq!(snapshot.sites(Domain::Air).len(), 4);
}

#[tokio::test]
async fn snapshot_is_isolated_from_later_writes() {
    let shared = SharedReadingStore::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    shared.record(Reading::new(at, "Lake Central", Domain::Water, "pH", 7.2));

    let snapshot = shared.snapshot();
    let writer = {
        let shared = shared.clone();
        tokio::spawn(async move {
            shared.record(Reading::new(at, "Canal Industrial", Domain::Water, "pH", 5.9));
        })
    };
    writer.await.expect("writer task");

    let monitor = Monitor::new(registry());
    let before = monitor.evaluate_store(&snapshot);
    assert!(before.alerts.is_clear());
    assert_eq!(before.readings, 1);

    let after = monitor.evaluate_store(&shared.snapshot());
    assert_eq!(after.alerts.len(), 1);
    assert_eq!(
        after.station_statuses[&Domain::Water]["Canal Industrial"],
        StationStatus::Poor
    );
}

#[tokio::test]
async fn evaluating_snapshots_leaves_monitor_unevaluated() {
    let shared = SharedReadingStore::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    shared.record(Reading::new(at, "Industrial Area", Domain::Air, "PM2.5", 48.0));

    let monitor = Monitor::new(registry());
    let report = monitor.evaluate_store(&shared.snapshot());
    assert_eq!(report.alerts.len(), 1);
    assert!(monitor.alerts().is_none());
    assert!(monitor.store().is_empty());
}

#[tokio::test]
async fn clear_empties_shared_store() {
    let shared = SharedReadingStore::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    shared.record(Reading::new(at, "North Zone", Domain::Air, "PM2.5", 20.0));
    assert!(!shared.is_empty());

    shared.clear();
    assert!(shared.is_empty());
    assert!(shared.snapshot().is_empty());
}
