//! Trade-setup and tradeability decision types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Setup
// ============================================================================

/// Candidate credit structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    IronCondor,
    CallSpread,
    PutSpread,
    Skip,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::IronCondor => "IRON_CONDOR",
            Self::CallSpread => "CALL_SPREAD",
            Self::PutSpread => "PUT_SPREAD",
            Self::Skip => "SKIP",
        };
        f.write_str(label)
    }
}

/// Output of the setup builder.
///
/// Strike layout by kind:
/// - `CallSpread`: `[short_call, long_call]`
/// - `PutSpread`: `[short_put, long_put]`
/// - `IronCondor`: `[short_call, long_call, short_put, long_put]`
/// - `Skip`: empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCore {
    pub kind: StrategyKind,
    pub strikes: Vec<Decimal>,
    /// In `[0, 1]`; 0 for `Skip`.
    pub confidence: f64,
    /// `spot - pin` when both are known.
    pub distance: Option<f64>,
    pub spread_width: Decimal,
    /// Machine-readable reason, `"ok"` unless the setup was skipped.
    pub reason: String,
}

impl StrategyCore {
    /// A skipped setup with zero confidence.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            kind: StrategyKind::Skip,
            strikes: Vec::new(),
            confidence: 0.0,
            distance: None,
            spread_width: Decimal::ZERO,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.kind == StrategyKind::Skip
    }

    /// Short strikes of the structure (one per side).
    #[must_use]
    pub fn short_strikes(&self) -> Vec<Decimal> {
        match self.kind {
            StrategyKind::CallSpread | StrategyKind::PutSpread => {
                self.strikes.first().copied().into_iter().collect()
            }
            StrategyKind::IronCondor => [self.strikes.first(), self.strikes.get(2)]
                .into_iter()
                .flatten()
                .copied()
                .collect(),
            StrategyKind::Skip => Vec::new(),
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    FailBlocking,
    WarnNonblocking,
}

/// One named rule result. The chain always reports every configured rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeabilityCheck {
    pub name: String,
    pub status: CheckStatus,
    pub reason: String,
}

impl TradeabilityCheck {
    pub fn pass(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, reason)
    }

    pub fn fail(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::FailBlocking, reason)
    }

    pub fn warn(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::WarnNonblocking, reason)
    }

    fn new(name: impl Into<String>, status: CheckStatus, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.status == CheckStatus::FailBlocking
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.status == CheckStatus::WarnNonblocking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Trade,
    NoTrade,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trade => f.write_str("TRADE"),
            Self::NoTrade => f.write_str("NO_TRADE"),
        }
    }
}

/// Final verdict of the check chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeableDecision {
    pub action: TradeAction,
    pub primary_reason: String,
    /// In `[0, 1]`, non-increasing in the number of warnings.
    pub decision_score: f64,
    pub checks: Vec<TradeabilityCheck>,
    /// Evaluation time in US/Eastern, `YYYY-MM-DD HH:MM:SS TZ`.
    pub evaluated_at_et: String,
}

impl TradeableDecision {
    #[must_use]
    pub fn is_trade(&self) -> bool {
        self.action == TradeAction::Trade
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_warning()).count()
    }

    /// Reasons of every blocking check, chain order.
    #[must_use]
    pub fn blocking_reasons(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.is_blocking())
            .map(|c| c.reason.as_str())
            .collect()
    }
}

// ============================================================================
// Evaluation envelope
// ============================================================================

/// Inputs the strategy was evaluated against, echoed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    pub index_code: String,
    pub index_symbol: String,
    pub index_price: Option<f64>,
    pub pin_price: Option<f64>,
    pub vix: Option<f64>,
    pub rsi: f64,
    pub consecutive_down_days: u32,
    pub gap_pct: f64,
    pub expected_move_2h: Option<f64>,
    pub quote_age_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMeta {
    pub index_code: String,
    pub generated_at_utc: DateTime<Utc>,
    pub generated_at_et: String,
    pub fast_mode: bool,
    /// `"provider"` when momentum inputs came upstream, `"defaults"` otherwise.
    pub metrics_source: String,
    pub warnings: Vec<String>,
}

/// Strategy block of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub core: StrategyCore,
    pub tradeable: TradeableDecision,
    pub checks: Vec<TradeabilityCheck>,
    pub market_inputs: MarketInputs,
    pub meta: StrategyMeta,
}
