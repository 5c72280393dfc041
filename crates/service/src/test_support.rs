use chrono::{TimeZone, Utc};
use gamma_core::{
    GexStructure, MarketInputs, MarketSection, OptionsSummary, SignalSummary, Snapshot,
    StrategyCore, StrategyMeta, StrategySection, SystemStatus, TradeAction, TradeableDecision,
};

/// Minimal snapshot stamped `2026-02-10T03:00:<second>Z`.
pub(crate) fn snapshot_at(index: &str, second: u32) -> Snapshot {
    let timestamp = Utc.with_ymd_and_hms(2026, 2, 10, 3, 0, second).unwrap();
    let core = StrategyCore::skip("no_option_data");
    Snapshot {
        index: index.to_string(),
        symbol: format!("${index}"),
        timestamp,
        market: MarketSection::default(),
        options: OptionsSummary::default(),
        gex: GexStructure::unavailable(),
        signals: SignalSummary::default(),
        strategy: StrategySection {
            core,
            tradeable: TradeableDecision {
                action: TradeAction::NoTrade,
                primary_reason: "no_option_data".into(),
                decision_score: 0.0,
                checks: Vec::new(),
                evaluated_at_et: String::new(),
            },
            checks: Vec::new(),
            market_inputs: MarketInputs {
                index_code: index.to_string(),
                index_symbol: format!("${index}"),
                index_price: None,
                pin_price: None,
                vix: None,
                rsi: 50.0,
                consecutive_down_days: 0,
                gap_pct: 0.0,
                expected_move_2h: None,
                quote_age_seconds: None,
            },
            meta: StrategyMeta {
                index_code: index.to_string(),
                generated_at_utc: timestamp,
                generated_at_et: String::new(),
                fast_mode: true,
                metrics_source: "defaults".into(),
                warnings: Vec::new(),
            },
        },
        system: SystemStatus::default(),
    }
}
