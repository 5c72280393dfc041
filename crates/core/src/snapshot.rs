//! The immutable per-refresh snapshot served to readers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

use crate::chain::{FlattenedOptionRow, OptionType};
use crate::gex::{GexStructure, SignalSummary};
use crate::strategy::StrategySection;

/// Quote inputs the snapshot was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSection {
    pub spot: Option<f64>,
    pub vix: Option<f64>,
    /// Upstream quote timestamp, if the provider reported one.
    pub quote_time: Option<DateTime<Utc>>,
}

/// Chain-wide aggregates shown next to the GEX profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsSummary {
    /// Raw contract records received, before filtering.
    pub raw_contract_count: usize,
    /// Flattened rows that survived filtering.
    pub row_count: usize,
    pub call_open_interest: f64,
    pub put_open_interest: f64,
    pub call_volume: f64,
    pub put_volume: f64,
    pub put_call_oi_ratio: Option<f64>,
    pub put_call_volume_ratio: Option<f64>,
    /// Mean implied volatility (percent points) across rows that carry one.
    pub avg_implied_vol: Option<f64>,
    /// Mean |delta| over rows with a non-zero delta.
    pub avg_abs_delta: Option<f64>,
    /// Mean |gamma| over rows with a non-zero gamma.
    pub avg_abs_gamma: Option<f64>,
    /// Up to five nearest expirations, ascending.
    pub nearest_expiries: Vec<NaiveDate>,
    pub top_volume_contracts: Vec<ContractCard>,
    pub top_open_interest_contracts: Vec<ContractCard>,
}

/// One contract in the most-traded and most-held lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCard {
    pub symbol: Option<String>,
    pub option_type: OptionType,
    pub expiry: Option<NaiveDate>,
    pub strike: Decimal,
    pub volume: f64,
    pub open_interest: f64,
    pub implied_vol: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub mark: Option<f64>,
}

impl From<&FlattenedOptionRow> for ContractCard {
    fn from(row: &FlattenedOptionRow) -> Self {
        Self {
            symbol: row.symbol.clone(),
            option_type: row.option_type,
            expiry: row.expiry,
            strike: row.strike,
            volume: row.volume,
            open_interest: row.open_interest,
            implied_vol: row.implied_vol,
            delta: row.delta,
            gamma: row.gamma,
            mark: row.mark,
        }
    }
}

/// Freshness metadata. `stale` and `age_seconds` are recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub source: String,
    pub refresh_seconds: u64,
    pub stale: bool,
    pub age_seconds: Option<f64>,
    pub last_success_ts: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Wall time the producing refresh cycle took.
    pub refresh_duration_ms: Option<f64>,
}

/// One complete pipeline output for an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub index: String,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub market: MarketSection,
    pub options: OptionsSummary,
    pub gex: GexStructure,
    pub signals: SignalSummary,
    pub strategy: StrategySection,
    pub system: SystemStatus,
}
