mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use gamma_core::config::MIN_REFRESH_SECONDS;
use gamma_core::{Clock, ManualClock, RefreshError, SnapshotError};
use gamma_service::{ServiceError, SnapshotCoordinator};
use gamma_strategy::CHECK_NAMES;

use common::{filters, service_config, MockProvider};

fn market_open_clock() -> Arc<ManualClock> {
    // 10:30 ET
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 2, 10, 15, 30, 0).unwrap(),
    ))
}

fn coordinator(provider: Arc<MockProvider>, clock: Arc<ManualClock>) -> SnapshotCoordinator {
    SnapshotCoordinator::builder(service_config(&["SPX", "NDX"]), filters(), provider)
        .with_clock(clock)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_share_one_fetch() {
    let provider = MockProvider::with_delay(Duration::from_millis(200));
    let coord = coordinator(provider.clone(), market_open_clock());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let coord = coord.clone();
            tokio::spawn(async move { coord.trigger_refresh("SPX").await })
        })
        .collect();

    let mut snapshots = Vec::new();
    for task in tasks {
        snapshots.push(task.await.unwrap().unwrap());
    }

    assert_eq!(provider.calls(), 1);
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert_eq!(coord.get_history("SPX", 10).unwrap().len(), 1);
    assert!(!coord.refresh_state("SPX").unwrap().in_flight);
}

#[tokio::test]
async fn sequential_triggers_fetch_each_time() {
    let provider = MockProvider::new();
    let coord = coordinator(provider.clone(), market_open_clock());

    coord.trigger_refresh("SPX").await.unwrap();
    coord.trigger_refresh("SPX").await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(coord.refresh_state("SPX").unwrap().success_count, 2);
}

#[tokio::test]
async fn indices_refresh_independently() {
    let provider = MockProvider::new();
    let coord = coordinator(provider.clone(), market_open_clock());

    coord.trigger_refresh("SPX").await.unwrap();

    assert!(coord.get_snapshot("SPX").is_ok());
    assert!(matches!(
        coord.get_snapshot("NDX"),
        Err(SnapshotError::NoDataYet { .. })
    ));
}

#[tokio::test]
async fn cold_start_reports_no_data_yet() {
    let provider = MockProvider::new();
    provider.set_failing(true);
    let coord = coordinator(provider.clone(), market_open_clock());

    match coord.get_snapshot("SPX") {
        Err(SnapshotError::NoDataYet { index, last_error }) => {
            assert_eq!(index, "SPX");
            assert!(last_error.is_none());
        }
        other => panic!("expected NoDataYet, got {other:?}"),
    }

    let err = coord.trigger_refresh("SPX").await.unwrap_err();
    assert!(matches!(err, ServiceError::Refresh(RefreshError::UpstreamTransient(_))));

    match coord.get_snapshot("spx") {
        Err(SnapshotError::NoDataYet { last_error, .. }) => {
            assert!(last_error.unwrap().contains("HTTP 503"));
        }
        other => panic!("expected NoDataYet, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_and_goes_stale() {
    let provider = MockProvider::new();
    let clock = market_open_clock();
    let coord = coordinator(provider.clone(), clock.clone());

    let good = coord.trigger_refresh("SPX").await.unwrap();
    let fresh = coord.get_snapshot("SPX").unwrap();
    assert!(!fresh.system.stale);
    assert_eq!(fresh.system.age_seconds, Some(0.0));
    assert_eq!(fresh.system.source, "mock");

    provider.set_failing(true);
    clock.advance(chrono::Duration::seconds(10));
    assert!(coord.trigger_refresh("SPX").await.is_err());

    let within = coord.get_snapshot("SPX").unwrap();
    assert!(!within.system.stale);
    assert_eq!(within.system.age_seconds, Some(10.0));
    assert!(within.system.last_error.as_deref().unwrap().contains("HTTP 503"));

    // 2 x 12s interval exceeded
    clock.advance(chrono::Duration::seconds(15));
    let stale = coord.get_snapshot("SPX").unwrap();
    assert!(stale.system.stale);
    assert_eq!(stale.timestamp, good.timestamp);
    assert_eq!(stale.market.spot, Some(6010.0));
    assert_eq!(stale.gex, good.gex);

    let state = coord.refresh_state("SPX").unwrap();
    assert_eq!(state.success_count, 1);
    assert_eq!(state.failure_count, 1);

    provider.set_failing(false);
    coord.trigger_refresh("SPX").await.unwrap();
    let recovered = coord.get_snapshot("SPX").unwrap();
    assert!(!recovered.system.stale);
    assert!(recovered.system.last_error.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_new_snapshot_with_old_state() {
    let provider = MockProvider::with_delay(Duration::from_millis(5));
    let clock = market_open_clock();
    let coord = coordinator(provider.clone(), clock.clone());

    coord.trigger_refresh("SPX").await.unwrap();
    provider.set_failing(true);
    clock.advance(chrono::Duration::seconds(30));
    assert!(coord.trigger_refresh("SPX").await.is_err());
    provider.set_failing(false);

    let done = Arc::new(AtomicBool::new(false));
    let fresh_reads = Arc::new(AtomicUsize::new(0));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let coord = coord.clone();
            let done = done.clone();
            let fresh_reads = fresh_reads.clone();
            let new_ts = clock.now();
            tokio::spawn(async move {
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let snapshot = coord.get_snapshot("SPX").unwrap();
                    if snapshot.timestamp == new_ts {
                        assert!(!snapshot.system.stale);
                        assert!(snapshot.system.last_error.is_none());
                        assert_eq!(snapshot.system.last_success_ts, Some(new_ts));
                        fresh_reads.fetch_add(1, Ordering::SeqCst);
                    } else {
                        assert!(snapshot.system.stale);
                        assert!(snapshot.system.last_error.is_some());
                    }
                    if finished {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for _ in 0..20 {
        coord.trigger_refresh("SPX").await.unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.await.unwrap();
    }
    assert!(fresh_reads.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn zero_refresh_interval_is_floored() {
    let mut service = service_config(&["spx"]);
    service.refresh_seconds = 0;
    service.staleness_multiplier = 0.0;
    let coord = SnapshotCoordinator::builder(service, filters(), MockProvider::new())
        .with_clock(market_open_clock())
        .build()
        .unwrap();

    assert_eq!(coord.refresh_interval(), Duration::from_secs(MIN_REFRESH_SECONDS));
    assert_eq!(coord.indices(), vec!["SPX"]);
    assert_eq!(coord.health().refresh_seconds, MIN_REFRESH_SECONDS);

    coord.trigger_refresh("SPX").await.unwrap();
    let snapshot = coord.get_snapshot("SPX").unwrap();
    assert!(!snapshot.system.stale);
    assert_eq!(snapshot.system.refresh_seconds, MIN_REFRESH_SECONDS);
}

#[tokio::test]
async fn history_returns_most_recent_in_order() {
    let provider = MockProvider::new();
    let clock = market_open_clock();
    let coord = coordinator(provider, clock.clone());

    let mut stamps = Vec::new();
    for _ in 0..3 {
        stamps.push(coord.trigger_refresh("SPX").await.unwrap().timestamp);
        clock.advance(chrono::Duration::seconds(12));
    }

    let history = coord.get_history("SPX", 2).unwrap();
    let got: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    assert_eq!(got, vec![stamps[1], stamps[2]]);

    // limit 0 is clamped up to 1
    assert_eq!(coord.get_history("SPX", 0).unwrap().len(), 1);
    assert!(coord.get_history("NDX", 5).unwrap().is_empty());
}

#[tokio::test]
async fn unknown_index_is_rejected() {
    let coord = coordinator(MockProvider::new(), market_open_clock());

    assert!(matches!(
        coord.get_snapshot("RUT"),
        Err(SnapshotError::UnknownIndex { .. })
    ));
    assert!(matches!(
        coord.trigger_refresh("RUT").await,
        Err(ServiceError::Snapshot(SnapshotError::UnknownIndex { .. }))
    ));
    assert!(coord.get_debug("RUT").is_err());
}

#[test]
fn builder_rejects_unsupported_configured_index() {
    let result = SnapshotCoordinator::builder(
        service_config(&["SPX", "RUT"]),
        filters(),
        MockProvider::new(),
    )
    .build();

    assert!(matches!(result, Err(SnapshotError::UnknownIndex { index }) if index == "RUT"));
}

#[tokio::test]
async fn dropped_caller_does_not_cancel_refresh() {
    let provider = MockProvider::with_delay(Duration::from_millis(100));
    let coord = coordinator(provider.clone(), market_open_clock());

    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), coord.trigger_refresh("SPX")).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(coord.get_snapshot("SPX").is_ok());
    assert!(!coord.refresh_state("SPX").unwrap().in_flight);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn debug_report_tracks_events_and_rules() {
    let provider = MockProvider::new();
    let coord = coordinator(provider.clone(), market_open_clock());

    let empty = coord.get_debug("SPX").unwrap();
    assert!(!empty.service.has_snapshot);
    assert!(empty.snapshot_summary.is_none());

    coord.trigger_refresh("SPX").await.unwrap();
    provider.set_failing(true);
    let _ = coord.trigger_refresh("SPX").await;

    let report = coord.get_debug("SPX").unwrap();
    assert_eq!(report.index, "SPX");
    assert!(report.service.has_snapshot);
    assert_eq!(report.service.history_len, 1);
    assert_eq!(report.recent_events.len(), 2);
    assert_eq!(report.recent_errors.len(), 1);
    assert_eq!(report.rule_stats.rules.len(), CHECK_NAMES.len());

    let summary = report.snapshot_summary.unwrap();
    assert_eq!(summary.spot, Some(6010.0));
    assert_eq!(summary.checks_count, CHECK_NAMES.len());

    let json = serde_json::to_value(coord.get_debug("SPX").unwrap()).unwrap();
    assert_eq!(json["recent_errors"][0]["kind"], "snapshot_refresh_failed");
}

#[tokio::test]
async fn health_lists_every_index() {
    let coord = coordinator(MockProvider::new(), market_open_clock());
    coord.trigger_refresh("NDX").await.unwrap();

    let health = coord.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.source, "mock");
    assert_eq!(health.refresh_seconds, 12);
    assert!(health.indices["NDX"].has_snapshot);
    assert!(!health.indices["NDX"].stale);
    assert!(!health.indices["SPX"].has_snapshot);
    assert!(health.indices["SPX"].stale);
}

#[tokio::test]
async fn journal_appends_each_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = service_config(&["SPX"]);
    service.journal_dir = Some(dir.path().to_path_buf());
    let coord = SnapshotCoordinator::builder(service, filters(), MockProvider::new())
        .with_clock(market_open_clock())
        .build()
        .unwrap();

    coord.trigger_refresh("SPX").await.unwrap();
    coord.trigger_refresh("SPX").await.unwrap();

    let path = dir.path().join("dashboard_snapshots_spx_20260210.jsonl");
    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents.lines().count(), 2);

    let report = coord.get_debug("SPX").unwrap();
    assert_eq!(report.log_files.journal_dir.as_deref(), Some(dir.path()));
}
