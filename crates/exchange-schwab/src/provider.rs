//! [`MarketDataProvider`] and [`VolatilityOracle`] backed by the Schwab API.

use std::sync::Arc;

use async_trait::async_trait;
use gamma_core::{
    IndexProfile, MarketData, MarketDataProvider, MarketQuote, RangeReading, RefreshError,
    VolatilityOracle,
};
use gamma_analytics::indicators::{last_bar_change_pct, momentum_from_daily, realized_range};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{PriceHistoryQuery, SchwabClient};
use crate::parse;

pub const VIX_SYMBOL: &str = "$VIX";
/// Intraday bar width used for the volatility readings.
pub const INTRADAY_BAR_MINUTES: u32 = 5;
/// Months of daily ETF bars fetched for momentum inputs.
pub const DAILY_HISTORY_MONTHS: u32 = 2;

/// Quote, VIX, option chain and daily momentum for one index per fetch.
#[derive(Debug, Clone)]
pub struct SchwabMarketData {
    client: Arc<SchwabClient>,
}

impl SchwabMarketData {
    #[must_use]
    pub fn new(client: Arc<SchwabClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketDataProvider for SchwabMarketData {
    async fn fetch(&self, profile: &IndexProfile) -> Result<MarketData, RefreshError> {
        let symbol = profile.index_symbol.as_str();
        let quotes = self.client.get_quotes(&[symbol, VIX_SYMBOL]).await?;
        let quote = market_quote(&quotes, symbol);

        let chain_payload = self.client.get_option_chain_with_fallback(symbol).await?;
        let chain = parse::option_chain(&chain_payload);

        let mut warnings = Vec::new();
        if quote.spot.is_none() {
            warnings.push(format!("no usable price in {symbol} quote"));
        }
        if quote.vix.is_none() {
            warnings.push("no usable VIX quote".to_string());
        }

        // Momentum is optional; a failure here only downgrades to defaults.
        let momentum = match self
            .client
            .get_price_history(&profile.etf_symbol, PriceHistoryQuery::daily(DAILY_HISTORY_MONTHS))
            .await
        {
            Ok(candles) => {
                let momentum = momentum_from_daily(&candles);
                if momentum.is_none() {
                    warnings.push(format!(
                        "{} daily history too short ({} bars)",
                        profile.etf_symbol,
                        candles.len()
                    ));
                }
                momentum
            }
            Err(e) => {
                warn!(index = %profile.code, etf = %profile.etf_symbol, error = %e, "Daily history unavailable");
                warnings.push(format!("{} daily history unavailable: {e}", profile.etf_symbol));
                None
            }
        };

        debug!(
            index = %profile.code,
            spot = ?quote.spot,
            vix = ?quote.vix,
            contracts = chain.contract_count(),
            "Schwab fetch complete"
        );

        Ok(MarketData {
            quote,
            chain,
            momentum,
            warnings,
        })
    }

    fn name(&self) -> &str {
        "schwab"
    }
}

fn market_quote(quotes: &Value, symbol: &str) -> MarketQuote {
    let index_bucket = parse::quote_bucket(quotes, symbol);
    let vix_bucket = parse::quote_bucket(quotes, VIX_SYMBOL);

    MarketQuote {
        symbol: symbol.to_string(),
        spot: index_bucket.and_then(parse::quote_price),
        vix: vix_bucket.and_then(parse::quote_price),
        quote_time: index_bucket.and_then(parse::quote_time),
    }
}

/// VIX spike and realized-range readings from 5-minute bars.
#[derive(Debug, Clone)]
pub struct SchwabVolatilityOracle {
    client: Arc<SchwabClient>,
}

impl SchwabVolatilityOracle {
    #[must_use]
    pub fn new(client: Arc<SchwabClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VolatilityOracle for SchwabVolatilityOracle {
    async fn vix_change_pct(&self) -> Result<Option<f64>, RefreshError> {
        let candles = self
            .client
            .get_price_history(VIX_SYMBOL, PriceHistoryQuery::intraday(INTRADAY_BAR_MINUTES, 1))
            .await?;
        Ok(last_bar_change_pct(&candles))
    }

    async fn realized_range(
        &self,
        profile: &IndexProfile,
        lookback_minutes: u32,
    ) -> Result<Option<RangeReading>, RefreshError> {
        let candles = self
            .client
            .get_price_history(
                &profile.index_symbol,
                PriceHistoryQuery::intraday(INTRADAY_BAR_MINUTES, 1),
            )
            .await?;
        Ok(realized_range(&candles, lookback_minutes, INTRADAY_BAR_MINUTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_quote_reads_index_and_vix() {
        let quotes = json!({
            "$SPX": {"quote": {"lastPrice": 6010.0, "quoteTime": 1_770_735_600_000_i64}},
            "$VIX": {"quote": {"closePrice": 18.5}}
        });
        let quote = market_quote(&quotes, "$SPX");
        assert_eq!(quote.spot, Some(6010.0));
        assert_eq!(quote.vix, Some(18.5));
        assert!(quote.quote_time.is_some());
    }

    #[test]
    fn test_market_quote_missing_buckets() {
        let quote = market_quote(&json!({}), "$NDX");
        assert_eq!(quote.symbol, "$NDX");
        assert!(quote.spot.is_none());
        assert!(quote.vix.is_none());
    }
}
