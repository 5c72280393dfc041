//! Option-chain schema: the raw nested payload and the flattened per-strike row.
//!
//! The raw types mirror what an upstream provider delivers, grouped by
//! expiration → strike → {call, put}. Every numeric field is optional; the
//! provider adapter is responsible for turning loosely-typed JSON into these
//! structs without failing, and the flattener decides which records are usable.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// A single contract record as delivered upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    pub symbol: Option<String>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mark: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    /// Implied volatility in percent points (upstream `volatility`).
    pub implied_vol: Option<f64>,
    pub open_interest: Option<f64>,
    pub volume: Option<f64>,
}

impl RawContract {
    /// Creates a contract carrying only the fields needed for exposure math.
    #[must_use]
    pub fn with_greeks(gamma: f64, open_interest: f64) -> Self {
        Self {
            gamma: Some(gamma),
            open_interest: Some(open_interest),
            ..Self::default()
        }
    }

    /// Sets the traded volume.
    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the implied volatility.
    #[must_use]
    pub fn with_implied_vol(mut self, iv: f64) -> Self {
        self.implied_vol = Some(iv);
        self
    }

    /// Mark price, or the bid/ask midpoint when no positive mark is quoted.
    #[must_use]
    pub fn mark_price(&self) -> Option<f64> {
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        positive(self.mark).or_else(|| match (positive(self.bid), positive(self.ask)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        })
    }
}

/// Calls and puts quoted at one strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStrike {
    /// Strike as keyed upstream (e.g. `"6000.0"`).
    pub strike_key: String,
    pub calls: Vec<RawContract>,
    pub puts: Vec<RawContract>,
}

impl RawStrike {
    #[must_use]
    pub fn new(strike_key: impl Into<String>) -> Self {
        Self {
            strike_key: strike_key.into(),
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_call(mut self, contract: RawContract) -> Self {
        self.calls.push(contract);
        self
    }

    #[must_use]
    pub fn with_put(mut self, contract: RawContract) -> Self {
        self.puts.push(contract);
        self
    }
}

/// All strikes for one expiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExpiration {
    /// Upstream expiration key, `"YYYY-MM-DD:dte"` or a bare date.
    pub key: String,
    pub strikes: Vec<RawStrike>,
}

impl RawExpiration {
    #[must_use]
    pub fn new(key: impl Into<String>, strikes: Vec<RawStrike>) -> Self {
        Self {
            key: key.into(),
            strikes,
        }
    }

    /// Expiration date parsed from the key, if it has one.
    #[must_use]
    pub fn expiry(&self) -> Option<NaiveDate> {
        let date_part = self.key.split(':').next().unwrap_or_default();
        NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d").ok()
    }

    /// Days to expiration parsed from the key suffix. Defaults to 0 when absent.
    #[must_use]
    pub fn dte(&self) -> i64 {
        self.key
            .split_once(':')
            .and_then(|(_, dte)| dte.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite())
            .map_or(0, |d| d as i64)
    }
}

/// Raw option chain for one underlying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOptionChain {
    pub symbol: Option<String>,
    pub expirations: Vec<RawExpiration>,
}

impl RawOptionChain {
    /// A chain with no expirations.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(symbol: impl Into<String>, expirations: Vec<RawExpiration>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            expirations,
        }
    }

    /// True when no contract records are present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contract_count() == 0
    }

    /// Total number of raw contract records across all expirations and sides.
    #[must_use]
    pub fn contract_count(&self) -> usize {
        self.expirations
            .iter()
            .flat_map(|e| e.strikes.iter())
            .map(|s| s.calls.len() + s.puts.len())
            .sum()
    }
}

/// Normalized row, one per `(expiration, strike, option_type)` with usable data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedOptionRow {
    pub strike: Decimal,
    pub option_type: OptionType,
    pub open_interest: f64,
    pub volume: f64,
    pub implied_vol: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    pub mark: Option<f64>,
    pub symbol: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub dte: i64,
}
