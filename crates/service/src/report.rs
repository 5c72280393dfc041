//! Read-only views served alongside snapshots.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gamma_core::{
    DebugEvent, DirectionBias, Observation, RefreshError, Snapshot, StrategyKind, TradeAction,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::debug_ring::RuleStats;

/// Mutable refresh bookkeeping for one index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshState {
    pub in_flight: bool,
    pub last_success_ts: Option<DateTime<Utc>>,
    pub last_attempt_ts: Option<DateTime<Utc>>,
    pub last_error: Option<RefreshError>,
    pub last_duration_ms: Option<f64>,
    pub success_count: u64,
    pub failure_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexHealth {
    pub has_snapshot: bool,
    pub in_flight: bool,
    pub stale: bool,
    pub age_seconds: Option<f64>,
    pub last_success_ts: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub source: String,
    pub refresh_seconds: u64,
    pub fast_mode: bool,
    pub indices: BTreeMap<String, IndexHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub refresh_seconds: u64,
    pub fast_mode: bool,
    pub history_len: usize,
    pub history_capacity: usize,
    pub has_snapshot: bool,
    pub state: RefreshState,
}

/// Headline fields of the cached snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub timestamp: DateTime<Utc>,
    pub spot: Option<f64>,
    pub vix: Option<f64>,
    pub pin: Option<Decimal>,
    pub direction_bias: DirectionBias,
    pub observation: Observation,
    pub strategy_kind: StrategyKind,
    pub action: TradeAction,
    pub primary_reason: String,
    pub checks_count: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            spot: snapshot.market.spot,
            vix: snapshot.market.vix,
            pin: snapshot.gex.pin,
            direction_bias: snapshot.gex.direction_bias,
            observation: snapshot.signals.observation,
            strategy_kind: snapshot.strategy.core.kind,
            action: snapshot.strategy.tradeable.action,
            primary_reason: snapshot.strategy.tradeable.primary_reason.clone(),
            checks_count: snapshot.strategy.checks.len(),
        }
    }
}

/// Where to look for more detail than the in-memory rings hold.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogPointers {
    pub log_file: Option<PathBuf>,
    pub journal_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub index: String,
    pub service: ServiceStatus,
    pub snapshot_summary: Option<SnapshotSummary>,
    pub recent_events: Vec<DebugEvent>,
    pub recent_errors: Vec<DebugEvent>,
    pub rule_stats: RuleStats,
    pub log_files: LogPointers,
}
