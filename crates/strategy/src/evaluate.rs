//! Strategy evaluation assembly: setup, external readings, check chain and
//! decision folded into one [`StrategySection`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::US::Eastern;
use gamma_analytics::indicators::expected_move_2h;
use gamma_core::{
    FilterConfig, IndexProfile, MarketInputs, MarketQuote, MomentumInputs, RangeReading,
    StrategyMeta, StrategySection, VolatilityOracle,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::checks::{decide, run_checks, CheckContext, External};
use crate::setup::build_setup;

pub const METRICS_SOURCE_PROVIDER: &str = "provider";
pub const METRICS_SOURCE_DEFAULTS: &str = "defaults";

const ET_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Inputs for one evaluation.
#[derive(Debug, Clone)]
pub struct StrategyInputs<'a> {
    pub profile: &'a IndexProfile,
    pub quote: &'a MarketQuote,
    pub pin: Option<Decimal>,
    pub momentum: Option<MomentumInputs>,
    /// Provider notes carried into `meta.warnings`.
    pub warnings: Vec<String>,
    pub now: DateTime<Utc>,
}

/// Runs the setup builder and the check chain with a fixed filter set.
#[derive(Clone)]
pub struct StrategyEvaluator {
    filters: FilterConfig,
    fast_mode: bool,
    warn_penalty: f64,
    oracle: Option<Arc<dyn VolatilityOracle>>,
}

impl StrategyEvaluator {
    #[must_use]
    pub fn new(filters: FilterConfig) -> Self {
        Self {
            filters,
            fast_mode: true,
            warn_penalty: 0.05,
            oracle: None,
        }
    }

    #[must_use]
    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    #[must_use]
    pub fn with_warn_penalty(mut self, warn_penalty: f64) -> Self {
        self.warn_penalty = warn_penalty;
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn VolatilityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    #[must_use]
    pub fn filters(&self) -> &FilterConfig {
        &self.filters
    }

    /// Produces the full strategy block for a snapshot.
    ///
    /// Never fails: missing inputs surface as a `Skip` setup and blocking
    /// checks, failed external lookups as warnings.
    pub async fn evaluate_strategy(&self, input: StrategyInputs<'_>) -> StrategySection {
        let StrategyInputs {
            profile,
            quote,
            pin,
            momentum,
            mut warnings,
            now,
        } = input;
        let now_et = now.with_timezone(&Eastern);
        let generated_at_et = now_et.format(ET_FORMAT).to_string();

        let (momentum, metrics_source) = match momentum {
            Some(m) => (m, METRICS_SOURCE_PROVIDER),
            None => {
                warnings.push("Momentum inputs unavailable; using neutral defaults".to_string());
                (MomentumInputs::default(), METRICS_SOURCE_DEFAULTS)
            }
        };

        let core = build_setup(profile, quote.spot, pin, quote.vix);
        let inputs = MarketInputs {
            index_code: profile.code.clone(),
            index_symbol: profile.index_symbol.clone(),
            index_price: quote.spot,
            pin_price: pin.and_then(|p| p.to_f64()),
            vix: quote.vix.map(|v| (v * 100.0).round() / 100.0),
            rsi: momentum.rsi,
            consecutive_down_days: momentum.consecutive_down_days,
            gap_pct: momentum.gap_pct,
            expected_move_2h: expected_move_2h(quote.spot, quote.vix),
            quote_age_seconds: quote
                .quote_time
                .map(|t| (now - t).num_milliseconds() as f64 / 1000.0),
        };

        let (vix_change, realized_range) = self.external_readings(profile).await;

        let checks = run_checks(&CheckContext {
            profile,
            filters: &self.filters,
            now_et,
            core: &core,
            inputs: &inputs,
            vix_change,
            realized_range,
        });
        let tradeable = decide(&core, checks, self.warn_penalty, generated_at_et.clone());

        debug!(
            index = %profile.code,
            kind = %core.kind,
            action = ?tradeable.action,
            primary_reason = %tradeable.primary_reason,
            score = tradeable.decision_score,
            "Strategy evaluated"
        );

        StrategySection {
            checks: tradeable.checks.clone(),
            core,
            tradeable,
            market_inputs: inputs,
            meta: StrategyMeta {
                index_code: profile.code.clone(),
                generated_at_utc: now,
                generated_at_et,
                fast_mode: self.fast_mode,
                metrics_source: metrics_source.to_string(),
                warnings,
            },
        }
    }

    async fn external_readings(
        &self,
        profile: &IndexProfile,
    ) -> (External<Option<f64>>, External<Option<RangeReading>>) {
        if self.fast_mode {
            return (External::Skipped, External::Skipped);
        }
        let Some(oracle) = &self.oracle else {
            let reason = "Volatility lookups not configured".to_string();
            return (External::Unavailable(reason.clone()), External::Unavailable(reason));
        };

        let lookback = self.filters.realized_vol_lookback_minutes;
        let (vix, range) = tokio::join!(
            oracle.vix_change_pct(),
            oracle.realized_range(profile, lookback)
        );

        let vix = match vix {
            Ok(value) => External::Value(value),
            Err(e) => {
                warn!(index = %profile.code, error = %e, "VIX spike lookup failed");
                External::Unavailable(format!("VIX spike lookup failed: {e}"))
            }
        };
        let range = match range {
            Ok(value) => External::Value(value),
            Err(e) => {
                warn!(index = %profile.code, error = %e, "Realized volatility lookup failed");
                External::Unavailable(format!("Realized volatility lookup failed: {e}"))
            }
        };
        (vix, range)
    }
}
