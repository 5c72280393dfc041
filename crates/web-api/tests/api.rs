use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gamma_core::{
    FilterConfig, IndexProfile, ManualClock, MarketData, MarketDataProvider, MarketQuote,
    RawContract, RawExpiration, RawOptionChain, RawStrike, RefreshError, ServiceConfig,
};
use gamma_service::SnapshotCoordinator;
use gamma_web_api::ApiServer;
use serde_json::Value;
use tower::ServiceExt;

struct StaticProvider;

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn fetch(&self, profile: &IndexProfile) -> Result<MarketData, RefreshError> {
        let strikes = vec![
            RawStrike::new("5990.0").with_put(RawContract::with_greeks(0.004, 3000.0)),
            RawStrike::new("6000.0").with_call(RawContract::with_greeks(0.005, 1500.0)),
            RawStrike::new("6020.0").with_call(RawContract::with_greeks(0.003, 2500.0)),
        ];
        Ok(MarketData {
            quote: MarketQuote {
                symbol: profile.index_symbol.clone(),
                spot: Some(6010.0),
                vix: Some(18.0),
                quote_time: None,
            },
            chain: RawOptionChain::new("$SPX", vec![RawExpiration::new("2026-02-10:0", strikes)]),
            momentum: None,
            warnings: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

fn coordinator() -> SnapshotCoordinator {
    let service = ServiceConfig {
        indices: vec!["SPX".to_string(), "NDX".to_string()],
        ..ServiceConfig::default()
    };
    let clock = ManualClock::new(
        chrono::DateTime::parse_from_rfc3339("2026-02-10T15:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc),
    );
    SnapshotCoordinator::builder(service, FilterConfig::default(), Arc::new(StaticProvider))
        .with_clock(Arc::new(clock))
        .build()
        .unwrap()
}

fn router(coordinator: &SnapshotCoordinator) -> Router {
    ApiServer::new(coordinator.clone()).router()
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_lists_indices() {
    let coord = coordinator();
    let (status, body) = get_json(router(&coord), "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["source"], "static");
    assert_eq!(body["indices"]["SPX"]["has_snapshot"], false);
    assert_eq!(body["indices"]["NDX"]["in_flight"], false);
}

#[tokio::test]
async fn test_snapshot_cold_start_is_503() {
    let coord = coordinator();
    let (status, body) = get_json(router(&coord), "/api/dashboard/snapshot?index=SPX").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "no data yet");
    assert_eq!(body["index"], "SPX");
}

#[tokio::test]
async fn test_snapshot_after_refresh() {
    let coord = coordinator();
    coord.trigger_refresh("SPX").await.unwrap();

    let (status, body) = get_json(router(&coord), "/api/dashboard/snapshot?index=spx").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], "SPX");
    assert_eq!(body["market"]["spot"], 6010.0);
    assert_eq!(body["system"]["stale"], false);
    assert!(body["strategy"]["tradeable"]["action"].is_string());

    // index defaults to SPX
    let (status, _) = get_json(router(&coord), "/api/dashboard/snapshot").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_index_is_404() {
    let coord = coordinator();
    for uri in [
        "/api/dashboard/snapshot?index=RUT",
        "/api/dashboard/history?index=RUT",
        "/api/dashboard/debug?index=RUT",
    ] {
        let (status, body) = get_json(router(&coord), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["index"], "RUT");
    }
}

#[tokio::test]
async fn test_history_limit_and_default() {
    let coord = coordinator();
    for _ in 0..3 {
        coord.trigger_refresh("NDX").await.unwrap();
    }

    let (status, body) = get_json(router(&coord), "/api/dashboard/history?index=NDX&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], "NDX");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (_, body) = get_json(router(&coord), "/api/dashboard/history?index=NDX&limit=abc").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 3);

    let (status, body) = get_json(router(&coord), "/api/dashboard/history").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_debug_report() {
    let coord = coordinator();
    coord.trigger_refresh("SPX").await.unwrap();

    let (status, body) = get_json(router(&coord), "/api/dashboard/debug?index=SPX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"]["has_snapshot"], true);
    assert_eq!(body["recent_events"][0]["kind"], "snapshot_refresh_ok");
    assert!(body["rule_stats"]["rules"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let coord = coordinator();
    let (status, body) = get_json(router(&coord), "/api/bots").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/api/bots"));
}
