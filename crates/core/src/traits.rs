use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::RawOptionChain;
use crate::error::RefreshError;
use crate::profile::IndexProfile;

/// Spot and volatility quote for one index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub symbol: String,
    pub spot: Option<f64>,
    pub vix: Option<f64>,
    pub quote_time: Option<DateTime<Utc>>,
}

/// Daily momentum readings for the ETF proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumInputs {
    pub rsi: f64,
    pub consecutive_down_days: u32,
    pub gap_pct: f64,
}

impl Default for MomentumInputs {
    /// Neutral readings used when the provider has none.
    fn default() -> Self {
        Self {
            rsi: 50.0,
            consecutive_down_days: 0,
            gap_pct: 0.0,
        }
    }
}

/// OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Everything one refresh cycle needs from upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketData {
    pub quote: MarketQuote,
    pub chain: RawOptionChain,
    /// `None` when the provider could not compute momentum inputs.
    pub momentum: Option<MomentumInputs>,
    /// Non-fatal provider notes, surfaced in the strategy meta.
    pub warnings: Vec<String>,
}

/// Recent versus baseline mean bar range of the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeReading {
    pub recent_range: f64,
    pub baseline_range: f64,
}

impl RangeReading {
    /// `recent / baseline`, `None` when the baseline is flat.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        (self.baseline_range > 0.0).then(|| self.recent_range / self.baseline_range)
    }
}

/// Upstream quote and chain source.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch(&self, profile: &IndexProfile) -> Result<MarketData, RefreshError>;

    fn name(&self) -> &str;
}

/// Intraday volatility lookups used by the external checks.
///
/// `Ok(None)` means the upstream answered but had too few bars to judge.
#[async_trait]
pub trait VolatilityOracle: Send + Sync {
    /// Percent change of VIX over the last completed 5-minute bar.
    async fn vix_change_pct(&self) -> Result<Option<f64>, RefreshError>;

    async fn realized_range(
        &self,
        profile: &IndexProfile,
        lookback_minutes: u32,
    ) -> Result<Option<RangeReading>, RefreshError>;
}
