//! One refresh cycle's computation: flatten → GEX → setup → checks.

use chrono::{DateTime, Utc};
use gamma_analytics::{build_signal_summary, flatten_chain, summarize_options, GexCalculator};
use gamma_core::{IndexProfile, MarketData, MarketSection, Snapshot, SystemStatus};
use gamma_strategy::{StrategyEvaluator, StrategyInputs};
use tracing::debug;

/// Pure computation stage shared by the coordinator and the CLI signal command.
#[derive(Clone)]
pub struct SnapshotPipeline {
    evaluator: StrategyEvaluator,
    top_levels: usize,
}

impl SnapshotPipeline {
    #[must_use]
    pub fn new(evaluator: StrategyEvaluator, top_levels: usize) -> Self {
        Self {
            evaluator,
            top_levels,
        }
    }

    #[must_use]
    pub fn evaluator(&self) -> &StrategyEvaluator {
        &self.evaluator
    }

    /// Builds a snapshot from freshly fetched data. `system` is left for the
    /// caller to fill.
    pub async fn build(
        &self,
        profile: &IndexProfile,
        data: MarketData,
        now: DateTime<Utc>,
    ) -> Snapshot {
        let MarketData {
            quote,
            chain,
            momentum,
            warnings,
        } = data;

        let rows = flatten_chain(&chain);
        let gex = GexCalculator::new(profile)
            .with_top_levels(self.top_levels)
            .compute(&rows, quote.spot);
        let options = summarize_options(&chain, &rows);
        let signals = build_signal_summary(&gex, &options, quote.spot);

        debug!(
            index = %profile.code,
            raw_contracts = options.raw_contract_count,
            rows = rows.len(),
            pin = ?gex.pin,
            observation = %signals.observation,
            "Chain analysed"
        );

        let strategy = self
            .evaluator
            .evaluate_strategy(StrategyInputs {
                profile,
                quote: &quote,
                pin: gex.pin,
                momentum,
                warnings,
                now,
            })
            .await;

        Snapshot {
            index: profile.code.clone(),
            symbol: profile.index_symbol.clone(),
            timestamp: now,
            market: MarketSection {
                spot: quote.spot,
                vix: quote.vix,
                quote_time: quote.quote_time,
            },
            options,
            gex,
            signals,
            strategy,
            system: SystemStatus::default(),
        }
    }
}
