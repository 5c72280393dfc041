use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use gamma_core::Snapshot;
use gamma_service::{DebugReport, HealthReport, SnapshotCoordinator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_INDEX: &str = "SPX";
pub const DEFAULT_HISTORY_LIMIT: usize = 120;

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub index: Option<String>,
}

/// `limit` is taken as text so a malformed value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub index: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub index: String,
    pub items: Vec<Snapshot>,
}

fn index_or_default(index: Option<&str>) -> String {
    index
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_INDEX)
        .to_uppercase()
}

/// Service and per-index freshness summary.
pub async fn health(State(coordinator): State<SnapshotCoordinator>) -> Json<HealthReport> {
    Json(coordinator.health())
}

/// Latest cached snapshot for `?index=` (default SPX).
///
/// # Errors
/// `503` before the first successful refresh, `404` for an unmanaged index.
pub async fn snapshot(
    State(coordinator): State<SnapshotCoordinator>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Snapshot>, ApiError> {
    let index = index_or_default(query.index.as_deref());
    Ok(Json(coordinator.get_snapshot(&index)?))
}

/// Recent snapshots, oldest first, `?limit=` default 120.
///
/// # Errors
/// `404` for an unmanaged index.
pub async fn history(
    State(coordinator): State<SnapshotCoordinator>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let index = index_or_default(query.index.as_deref());
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let items = coordinator.get_history(&index, limit)?;
    Ok(Json(HistoryResponse { index, items }))
}

/// Refresh diagnostics for one index.
///
/// # Errors
/// `404` for an unmanaged index.
pub async fn debug(
    State(coordinator): State<SnapshotCoordinator>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<DebugReport>, ApiError> {
    let index = index_or_default(query.index.as_deref());
    Ok(Json(coordinator.get_debug(&index)?))
}

pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found(format!("route not found: {}", uri.path()))
}
