//! Schwab market-data REST client.
//!
//! Every request carries a bearer token from [`SchwabAuth`]. A 401 triggers
//! exactly one forced token refresh and a retry of the same request.

use std::time::Duration;

use gamma_core::{Candle, SchwabConfig};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SchwabAuth, SchwabCredentials};
use crate::error::{Result, SchwabError};
use crate::parse;

pub const QUOTES_PATH: &str = "/marketdata/v1/quotes";
pub const CHAINS_PATH: &str = "/marketdata/v1/chains";
pub const PRICE_HISTORY_PATH: &str = "/marketdata/v1/pricehistory";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct SchwabClientConfig {
    pub base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
    pub strike_count: u32,
}

impl Default for SchwabClientConfig {
    fn default() -> Self {
        Self::from(&SchwabConfig::default())
    }
}

impl From<&SchwabConfig> for SchwabClientConfig {
    fn from(config: &SchwabConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            token_url: config.token_url.clone(),
            timeout_secs: config.timeout_secs,
            strike_count: config.strike_count,
        }
    }
}

impl SchwabClientConfig {
    /// Points both the API and token endpoint at `url` (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.token_url = format!("{}/v1/oauth/token", url.trim_end_matches('/'));
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Bar layout for a price-history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceHistoryQuery {
    pub period_type: &'static str,
    pub period: u32,
    pub frequency_type: &'static str,
    pub frequency: u32,
}

impl PriceHistoryQuery {
    /// Daily bars covering the last `months` months.
    #[must_use]
    pub fn daily(months: u32) -> Self {
        Self {
            period_type: "month",
            period: months,
            frequency_type: "daily",
            frequency: 1,
        }
    }

    /// Intraday bars of `minutes` width over the last `days` sessions.
    #[must_use]
    pub fn intraday(minutes: u32, days: u32) -> Self {
        Self {
            period_type: "day",
            period: days,
            frequency_type: "minute",
            frequency: minutes,
        }
    }
}

// =============================================================================
// SchwabClient
// =============================================================================

pub struct SchwabClient {
    config: SchwabClientConfig,
    http: Client,
    auth: SchwabAuth,
}

impl std::fmt::Debug for SchwabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchwabClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl SchwabClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: SchwabClientConfig, credentials: SchwabCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SchwabError::Network(format!("failed to build HTTP client: {e}")))?;
        let auth = SchwabAuth::new(http.clone(), config.token_url.clone(), credentials);

        Ok(Self { config, http, auth })
    }

    /// Client for the configured endpoints with credentials from the environment.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &SchwabConfig) -> Result<Self> {
        Self::new(
            SchwabClientConfig::from(config),
            SchwabCredentials::from_env(config),
        )
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "GET");

        let token = self.auth.access_token(false).await?;
        let response = self.send(&url, query, &token).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Schwab returned 401, forcing token refresh");
            let token = self.auth.access_token(true).await?;
            self.send(&url, query, &token).await?
        } else {
            response
        };

        Self::handle_response(response).await
    }

    async fn send(&self, url: &str, query: &[(&str, String)], token: &str) -> Result<Response> {
        Ok(self
            .http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?)
    }

    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(SchwabError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SchwabError::api(status.as_u16(), text));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    // =========================================================================
    // Market data endpoints
    // =========================================================================

    /// Quotes keyed by symbol.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_quotes(&self, symbols: &[&str]) -> Result<Value> {
        if symbols.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        self.get(QUOTES_PATH, &[("symbols", symbols.join(","))]).await
    }

    /// Single-leg option chain around the money.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_option_chain(&self, symbol: &str) -> Result<Value> {
        let query = [
            ("symbol", symbol.to_string()),
            ("contractType", "ALL".to_string()),
            ("strikeCount", self.config.strike_count.to_string()),
            ("includeQuotes", "true".to_string()),
            ("strategy", "SINGLE".to_string()),
        ];
        self.get(CHAINS_PATH, &query).await
    }

    /// Option chain for `symbol`, retrying without the `$` index prefix when
    /// the first response has no contracts.
    ///
    /// # Errors
    /// Returns error if an API call fails.
    pub async fn get_option_chain_with_fallback(&self, symbol: &str) -> Result<Value> {
        let chain = self.get_option_chain(symbol).await?;
        if parse::chain_has_contracts(&chain) {
            return Ok(chain);
        }
        match symbol.strip_prefix('$') {
            Some(bare) => {
                debug!(symbol, bare, "Empty chain, retrying without index prefix");
                self.get_option_chain(bare).await
            }
            None => Ok(chain),
        }
    }

    /// Price-history candles, oldest first.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_price_history(
        &self,
        symbol: &str,
        query: PriceHistoryQuery,
    ) -> Result<Vec<Candle>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("periodType", query.period_type.to_string()),
            ("period", query.period.to_string()),
            ("frequencyType", query.frequency_type.to_string()),
            ("frequency", query.frequency.to_string()),
        ];
        let body = self.get(PRICE_HISTORY_PATH, &params).await?;
        Ok(parse::candles(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_schwab_config() {
        let config = SchwabClientConfig::from(&SchwabConfig::default());
        assert_eq!(config.base_url, "https://api.schwabapi.com");
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.strike_count, 60);
    }

    #[test]
    fn test_with_base_url_moves_token_endpoint() {
        let config = SchwabClientConfig::default().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000/");
        assert_eq!(config.token_url, "http://127.0.0.1:9000/v1/oauth/token");
    }

    #[test]
    fn test_price_history_query_shapes() {
        let daily = PriceHistoryQuery::daily(2);
        assert_eq!(daily.period_type, "month");
        assert_eq!(daily.frequency_type, "daily");

        let intraday = PriceHistoryQuery::intraday(5, 1);
        assert_eq!(intraday.frequency, 5);
        assert_eq!(intraday.frequency_type, "minute");
    }
}
