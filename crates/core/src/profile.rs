//! Static per-index scaling profiles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Index codes with a compiled-in profile.
pub const SUPPORTED_INDICES: [&str; 2] = ["SPX", "NDX"];

/// Strike geometry and thresholds for one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProfile {
    /// Short code used across the API (e.g. "SPX").
    pub code: String,
    /// Upstream quote symbol (e.g. "$SPX").
    pub index_symbol: String,
    /// ETF proxy used for momentum inputs (e.g. "SPY").
    pub etf_symbol: String,
    /// Listed strike spacing.
    pub strike_increment: Decimal,
    /// Width between short and long legs of a spread.
    pub base_spread_width: Decimal,
    /// Short-strike offset from the reference price, in multiples of the spread width.
    pub offset_multiplier: Decimal,
    /// |spot - pin| above which a directional spread replaces the iron condor.
    pub distance_threshold: f64,
    /// Contract multiplier used in exposure scaling.
    pub contract_multiplier: f64,
}

impl IndexProfile {
    /// S&P 500 index options.
    #[must_use]
    pub fn spx() -> Self {
        Self {
            code: "SPX".to_string(),
            index_symbol: "$SPX".to_string(),
            etf_symbol: "SPY".to_string(),
            strike_increment: Decimal::from(5),
            base_spread_width: Decimal::from(5),
            offset_multiplier: Decimal::ONE,
            distance_threshold: 5.0,
            contract_multiplier: 100.0,
        }
    }

    /// Nasdaq-100 index options.
    #[must_use]
    pub fn ndx() -> Self {
        Self {
            code: "NDX".to_string(),
            index_symbol: "$NDX".to_string(),
            etf_symbol: "QQQ".to_string(),
            strike_increment: Decimal::from(10),
            base_spread_width: Decimal::from(20),
            offset_multiplier: Decimal::ONE,
            distance_threshold: 20.0,
            contract_multiplier: 100.0,
        }
    }

    /// Looks up a profile by case-insensitive code.
    #[must_use]
    pub fn for_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "SPX" => Some(Self::spx()),
            "NDX" => Some(Self::ndx()),
            _ => None,
        }
    }

    /// Distance from the reference price to the short strike.
    #[must_use]
    pub fn short_offset(&self) -> Decimal {
        self.base_spread_width * self.offset_multiplier
    }

    /// Rounds a price up to the next listed strike (inclusive).
    #[must_use]
    pub fn strike_at_or_above(&self, price: Decimal) -> Decimal {
        (price / self.strike_increment).ceil() * self.strike_increment
    }

    /// Rounds a price down to the previous listed strike (inclusive).
    #[must_use]
    pub fn strike_at_or_below(&self, price: Decimal) -> Decimal {
        (price / self.strike_increment).floor() * self.strike_increment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(IndexProfile::for_code("spx"), Some(IndexProfile::spx()));
        assert_eq!(IndexProfile::for_code(" NDX "), Some(IndexProfile::ndx()));
        assert_eq!(IndexProfile::for_code("RUT"), None);
    }

    #[test]
    fn every_supported_code_resolves() {
        for code in SUPPORTED_INDICES {
            assert!(IndexProfile::for_code(code).is_some(), "{code} missing");
        }
    }

    #[test]
    fn strike_rounding() {
        let spx = IndexProfile::spx();
        assert_eq!(spx.strike_at_or_above(dec!(6011.2)), dec!(6015));
        assert_eq!(spx.strike_at_or_above(dec!(6015)), dec!(6015));
        assert_eq!(spx.strike_at_or_below(dec!(6013.9)), dec!(6010));
    }

    #[test]
    fn short_offset_scales_with_width() {
        let mut ndx = IndexProfile::ndx();
        assert_eq!(ndx.short_offset(), dec!(20));
        ndx.offset_multiplier = dec!(1.5);
        assert_eq!(ndx.short_offset(), dec!(30));
    }
}
