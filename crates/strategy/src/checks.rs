//! Ordered tradeability rule chain.
//!
//! Every rule in [`CHECK_NAMES`] is evaluated and reported on every run, so
//! the check list has the same length and order regardless of inputs. Rules
//! backed by extra upstream lookups receive their readings pre-fetched as
//! [`External`] values; the chain itself is a pure function.

use chrono::{DateTime, Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use gamma_core::{
    FilterConfig, IndexProfile, MarketInputs, RangeReading, StrategyCore, StrategyKind,
    TradeAction, TradeabilityCheck, TradeableDecision,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::setup::REASON_NO_OPTION_DATA;

pub const REASON_SKIPPED_FAST_MODE: &str = "skipped-fast-mode";
pub const REASON_OK: &str = "ok";

/// Rule names in evaluation order.
pub const CHECK_NAMES: [&str; 16] = [
    "gex_pin",
    "data_freshness",
    "vix_available",
    "market_open_day",
    "entry_cutoff",
    "absolute_cutoff",
    "timing_blackout",
    "vix_floor",
    "vix_spike",
    "realized_volatility",
    "expected_move",
    "rsi",
    "consecutive_down_days",
    "gap_size",
    "friday_policy",
    "short_strike_proximity",
];

/// Reading from an external lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum External<T> {
    /// Not looked up because fast mode is on.
    Skipped,
    /// Lookup not possible or failed; the reason is reported as a warning.
    Unavailable(String),
    Value(T),
}

/// Everything the chain reads.
#[derive(Debug, Clone)]
pub struct CheckContext<'a> {
    pub profile: &'a IndexProfile,
    pub filters: &'a FilterConfig,
    pub now_et: DateTime<Tz>,
    pub core: &'a StrategyCore,
    pub inputs: &'a MarketInputs,
    /// VIX percent change over the last bar; `Value(None)` when too few bars.
    pub vix_change: External<Option<f64>>,
    pub realized_range: External<Option<RangeReading>>,
}

/// Runs every rule in order.
#[must_use]
pub fn run_checks(ctx: &CheckContext<'_>) -> Vec<TradeabilityCheck> {
    let checks = vec![
        check_gex_pin(ctx),
        check_data_freshness(ctx),
        check_vix_available(ctx),
        check_market_open_day(ctx),
        check_entry_cutoff(ctx),
        check_absolute_cutoff(ctx),
        check_timing_blackout(ctx),
        check_vix_floor(ctx),
        check_vix_spike(ctx),
        check_realized_volatility(ctx),
        check_expected_move(ctx),
        check_rsi(ctx),
        check_consecutive_down_days(ctx),
        check_gap_size(ctx),
        check_friday_policy(ctx),
        check_short_strike_proximity(ctx),
    ];
    debug_assert_eq!(checks.len(), CHECK_NAMES.len());
    checks
}

/// Folds the check results and the setup into the final decision.
///
/// `NO_TRADE` when any rule blocks or the setup is `Skip`. The score is the
/// setup confidence minus `warn_penalty` per warning, clipped to `[0, 1]`.
#[must_use]
pub fn decide(
    core: &StrategyCore,
    checks: Vec<TradeabilityCheck>,
    warn_penalty: f64,
    evaluated_at_et: String,
) -> TradeableDecision {
    let first_blocking = checks.iter().find(|c| c.is_blocking()).map(|c| c.reason.clone());
    let warnings = checks.iter().filter(|c| c.is_warning()).count();

    let (action, primary_reason) = match first_blocking {
        Some(reason) => (TradeAction::NoTrade, reason),
        None if core.is_skip() => (TradeAction::NoTrade, core.reason.clone()),
        None => (TradeAction::Trade, REASON_OK.to_string()),
    };

    let penalty = warn_penalty.max(0.0) * warnings as f64;
    let decision_score = (core.confidence - penalty).clamp(0.0, 1.0);

    TradeableDecision {
        action,
        primary_reason,
        decision_score,
        checks,
        evaluated_at_et,
    }
}

// ============================================================================
// Data availability
// ============================================================================

fn check_gex_pin(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    match ctx.inputs.pin_price {
        Some(pin) => TradeabilityCheck::pass("gex_pin", format!("GEX pin {pin:.0} available")),
        None => TradeabilityCheck::fail("gex_pin", REASON_NO_OPTION_DATA),
    }
}

fn check_data_freshness(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let max_age = ctx.filters.max_quote_age_seconds;
    match ctx.inputs.quote_age_seconds {
        Some(age) if age > max_age => TradeabilityCheck::fail(
            "data_freshness",
            format!("Quote is {age:.0}s old (max {max_age:.0}s)"),
        ),
        Some(age) => TradeabilityCheck::pass("data_freshness", format!("Quote is {age:.0}s old")),
        None => TradeabilityCheck::warn("data_freshness", "Quote time unknown"),
    }
}

fn check_vix_available(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    match ctx.inputs.vix {
        Some(_) => TradeabilityCheck::pass("vix_available", "VIX available"),
        None => TradeabilityCheck::fail("vix_available", "VIX unavailable"),
    }
}

// ============================================================================
// Session timing
// ============================================================================

fn check_market_open_day(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    match ctx.now_et.weekday() {
        Weekday::Sat | Weekday::Sun => {
            TradeabilityCheck::fail("market_open_day", "Weekend - no 0DTE trading")
        }
        _ => TradeabilityCheck::pass("market_open_day", "Weekday session"),
    }
}

fn check_entry_cutoff(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let cutoff = ctx.filters.entry_cutoff_hour;
    if ctx.now_et.hour() < cutoff {
        TradeabilityCheck::pass("entry_cutoff", format!("Before {cutoff:02}:00 ET entry cutoff"))
    } else {
        TradeabilityCheck::fail("entry_cutoff", format!("Past {cutoff:02}:00 ET entry cutoff"))
    }
}

fn check_absolute_cutoff(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let cutoff = ctx.filters.absolute_cutoff_hour;
    if ctx.now_et.hour() < cutoff {
        TradeabilityCheck::pass(
            "absolute_cutoff",
            format!("Before {cutoff:02}:00 ET absolute cutoff"),
        )
    } else {
        TradeabilityCheck::fail(
            "absolute_cutoff",
            format!("In last hour before expiration ({cutoff:02}:00 ET+)"),
        )
    }
}

fn check_timing_blackout(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let hour = ctx.now_et.hour();
    let start = ctx.filters.window_start_hour;
    let end = ctx.filters.window_end_hour;
    if hour < start {
        TradeabilityCheck::fail(
            "timing_blackout",
            format!("Before {start:02}:00 ET - early volatility blocked"),
        )
    } else if hour >= end {
        TradeabilityCheck::fail(
            "timing_blackout",
            format!("After {end:02}:00 ET - low performance period blocked"),
        )
    } else {
        TradeabilityCheck::pass("timing_blackout", "Allowed entry window")
    }
}

fn check_friday_policy(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    if ctx.filters.skip_friday && ctx.now_et.weekday() == Weekday::Fri {
        TradeabilityCheck::fail("friday_policy", "Friday trading disabled by policy")
    } else {
        TradeabilityCheck::pass("friday_policy", "Friday trading allowed")
    }
}

// ============================================================================
// Volatility
// ============================================================================

fn check_vix_floor(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let floor = ctx.filters.vix_floor;
    match ctx.inputs.vix {
        Some(vix) if vix >= floor => {
            TradeabilityCheck::pass("vix_floor", format!("VIX {vix:.2} >= floor {floor:.1}"))
        }
        Some(vix) => {
            TradeabilityCheck::fail("vix_floor", format!("VIX {vix:.2} below floor {floor:.1}"))
        }
        None => TradeabilityCheck::fail("vix_floor", "VIX unavailable"),
    }
}

fn check_vix_spike(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let threshold = ctx.filters.vix_spike_pct;
    match &ctx.vix_change {
        External::Skipped => TradeabilityCheck::warn("vix_spike", REASON_SKIPPED_FAST_MODE),
        External::Unavailable(reason) => TradeabilityCheck::warn("vix_spike", reason.clone()),
        External::Value(None) => {
            TradeabilityCheck::pass("vix_spike", "Not enough VIX bars to detect a spike")
        }
        External::Value(Some(change)) if *change > threshold => TradeabilityCheck::fail(
            "vix_spike",
            format!("VIX spiked {change:.1}% in the last bar (max {threshold:.1}%)"),
        ),
        External::Value(Some(_)) => TradeabilityCheck::pass("vix_spike", "No VIX spike detected"),
    }
}

fn check_realized_volatility(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let max_ratio = ctx.filters.realized_vol_ratio;
    match &ctx.realized_range {
        External::Skipped => {
            TradeabilityCheck::warn("realized_volatility", REASON_SKIPPED_FAST_MODE)
        }
        External::Unavailable(reason) => {
            TradeabilityCheck::warn("realized_volatility", reason.clone())
        }
        External::Value(reading) => match (*reading).and_then(|r| r.ratio().map(|ratio| (r, ratio))) {
            Some((r, ratio)) if ratio > max_ratio => TradeabilityCheck::fail(
                "realized_volatility",
                format!(
                    "Intraday volatility {:.1}pts is {ratio:.1}x baseline ({:.1}pts)",
                    r.recent_range, r.baseline_range
                ),
            ),
            Some(_) => {
                TradeabilityCheck::pass("realized_volatility", "Realized volatility acceptable")
            }
            None => TradeabilityCheck::pass(
                "realized_volatility",
                "Not enough intraday bars to judge realized volatility",
            ),
        },
    }
}

fn check_expected_move(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let width = ctx.profile.base_spread_width.to_f64().unwrap_or(5.0);
    let minimum = ctx.filters.min_expected_move_base * (width / 5.0);
    match ctx.inputs.expected_move_2h {
        Some(em) if em >= minimum => TradeabilityCheck::pass(
            "expected_move",
            format!("Expected move {em:.1}pts >= {minimum:.1}pts threshold"),
        ),
        Some(em) => TradeabilityCheck::fail(
            "expected_move",
            format!("Expected move {em:.1}pts < {minimum:.1}pts threshold"),
        ),
        None => TradeabilityCheck::fail(
            "expected_move",
            "Expected move unavailable (missing spot/VIX)",
        ),
    }
}

// ============================================================================
// Momentum
// ============================================================================

fn check_rsi(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let rsi = ctx.inputs.rsi;
    let (min, max) = (ctx.filters.rsi_min, ctx.filters.rsi_max);
    if (min..=max).contains(&rsi) {
        TradeabilityCheck::pass("rsi", format!("RSI {rsi:.1} in range {min:.0}-{max:.0}"))
    } else {
        TradeabilityCheck::fail("rsi", format!("RSI {rsi:.1} outside {min:.0}-{max:.0}"))
    }
}

fn check_consecutive_down_days(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let days = ctx.inputs.consecutive_down_days;
    let max = ctx.filters.max_consecutive_down_days;
    if days <= max {
        TradeabilityCheck::pass(
            "consecutive_down_days",
            format!("{days} consecutive down days <= {max}"),
        )
    } else {
        TradeabilityCheck::fail(
            "consecutive_down_days",
            format!("{days} consecutive down days > {max}"),
        )
    }
}

fn check_gap_size(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    let gap = ctx.inputs.gap_pct;
    let max = ctx.filters.max_gap_pct;
    if gap <= max {
        TradeabilityCheck::pass("gap_size", format!("Gap {gap:.2}% <= {max:.2}%"))
    } else {
        TradeabilityCheck::fail("gap_size", format!("Gap {gap:.2}% > {max:.2}%"))
    }
}

// ============================================================================
// Structure
// ============================================================================

fn check_short_strike_proximity(ctx: &CheckContext<'_>) -> TradeabilityCheck {
    const NAME: &str = "short_strike_proximity";
    if ctx.core.is_skip() {
        return TradeabilityCheck::pass(NAME, "No strikes to check");
    }
    let Some(spot) = ctx.inputs.index_price else {
        return TradeabilityCheck::pass(NAME, "No strikes to check");
    };
    let min_distance = ctx.profile.strike_increment.to_f64().unwrap_or(0.0);
    let as_f64 = |d: Decimal| d.to_f64().unwrap_or(f64::NAN);

    let sides: &[&str] = match ctx.core.kind {
        StrategyKind::CallSpread => &["call"],
        StrategyKind::PutSpread => &["put"],
        StrategyKind::IronCondor => &["call", "put"],
        StrategyKind::Skip => &[],
    };
    let shorts = ctx.core.short_strikes();
    if shorts.is_empty() || shorts.len() != sides.len() {
        return TradeabilityCheck::fail(NAME, format!("{} strikes incomplete", ctx.core.kind));
    }

    let distances = sides.iter().zip(shorts).map(|(side, strike)| {
        let strike = as_f64(strike);
        let distance = if *side == "call" { strike - spot } else { spot - strike };
        (*side, distance)
    });
    for (side, distance) in distances {
        if distance.is_nan() || distance < min_distance {
            return TradeabilityCheck::fail(
                NAME,
                format!("Short {side} only {distance:.1}pts from spot ({spot:.1})"),
            );
        }
    }
    TradeabilityCheck::pass(NAME, "Short strike distance acceptable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::US::Eastern;
    use gamma_core::CheckStatus;
    use rust_decimal_macros::dec;

    fn inputs() -> MarketInputs {
        MarketInputs {
            index_code: "SPX".into(),
            index_symbol: "$SPX".into(),
            index_price: Some(6010.0),
            pin_price: Some(6000.0),
            vix: Some(20.0),
            rsi: 55.0,
            consecutive_down_days: 1,
            gap_pct: 0.1,
            expected_move_2h: Some(42.0),
            quote_age_seconds: Some(3.0),
        }
    }

    fn call_spread() -> StrategyCore {
        StrategyCore {
            kind: StrategyKind::CallSpread,
            strikes: vec![dec!(6015), dec!(6020)],
            confidence: 0.3,
            distance: Some(10.0),
            spread_width: dec!(5),
            reason: "ok".into(),
        }
    }

    // Tuesday 2026-02-10 11:00 ET
    fn tuesday_11() -> DateTime<Tz> {
        Eastern.with_ymd_and_hms(2026, 2, 10, 11, 0, 0).unwrap()
    }

    fn run(
        core: &StrategyCore,
        inputs: &MarketInputs,
        now_et: DateTime<Tz>,
        external: External<Option<f64>>,
    ) -> Vec<TradeabilityCheck> {
        let profile = IndexProfile::spx();
        let filters = FilterConfig::default();
        let realized = match &external {
            External::Skipped => External::Skipped,
            External::Unavailable(r) => External::Unavailable(r.clone()),
            External::Value(_) => External::Value(None),
        };
        run_checks(&CheckContext {
            profile: &profile,
            filters: &filters,
            now_et,
            core,
            inputs,
            vix_change: external,
            realized_range: realized,
        })
    }

    fn status_of(checks: &[TradeabilityCheck], name: &str) -> CheckStatus {
        checks.iter().find(|c| c.name == name).map(|c| c.status).unwrap()
    }

    #[test]
    fn all_rules_reported_in_order() {
        let checks = run(&call_spread(), &inputs(), tuesday_11(), External::Value(Some(0.5)));
        let names: Vec<_> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, CHECK_NAMES);
        assert!(checks.iter().all(|c| c.status == CheckStatus::Pass), "{checks:?}");
    }

    #[test]
    fn fast_mode_keeps_check_count_and_warns() {
        let full = run(&call_spread(), &inputs(), tuesday_11(), External::Value(Some(0.5)));
        let fast = run(&call_spread(), &inputs(), tuesday_11(), External::Skipped);
        assert_eq!(full.len(), fast.len());

        for name in ["vix_spike", "realized_volatility"] {
            let check = fast.iter().find(|c| c.name == name).unwrap();
            assert_eq!(check.status, CheckStatus::WarnNonblocking);
            assert_eq!(check.reason, REASON_SKIPPED_FAST_MODE);
        }
    }

    #[test]
    fn missing_pin_blocks_with_no_option_data_first() {
        let mut inputs = inputs();
        inputs.pin_price = None;
        let core = StrategyCore::skip(REASON_NO_OPTION_DATA);
        // Saturday evening: timing rules also fail, but the pin rule comes first.
        let now = Eastern.with_ymd_and_hms(2026, 2, 14, 18, 0, 0).unwrap();
        let checks = run(&core, &inputs, now, External::Skipped);
        let decision = decide(&core, checks, 0.05, String::new());

        assert_eq!(decision.action, TradeAction::NoTrade);
        assert_eq!(decision.primary_reason, REASON_NO_OPTION_DATA);
        assert_eq!(decision.checks.len(), CHECK_NAMES.len());
    }

    #[test]
    fn timing_rules() {
        let early = Eastern.with_ymd_and_hms(2026, 2, 10, 9, 45, 0).unwrap();
        let checks = run(&call_spread(), &inputs(), early, External::Skipped);
        assert_eq!(status_of(&checks, "timing_blackout"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "entry_cutoff"), CheckStatus::Pass);

        let late = Eastern.with_ymd_and_hms(2026, 2, 10, 13, 30, 0).unwrap();
        let checks = run(&call_spread(), &inputs(), late, External::Skipped);
        assert_eq!(status_of(&checks, "entry_cutoff"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "absolute_cutoff"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "timing_blackout"), CheckStatus::FailBlocking);
    }

    #[test]
    fn stale_quote_blocks_unknown_age_warns() {
        let mut stale = inputs();
        stale.quote_age_seconds = Some(301.0);
        let checks = run(&call_spread(), &stale, tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "data_freshness"), CheckStatus::FailBlocking);

        stale.quote_age_seconds = None;
        let checks = run(&call_spread(), &stale, tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "data_freshness"), CheckStatus::WarnNonblocking);
    }

    #[test]
    fn volatility_rules() {
        let mut low = inputs();
        low.vix = Some(12.0);
        let checks = run(&call_spread(), &low, tuesday_11(), External::Value(Some(6.0)));
        assert_eq!(status_of(&checks, "vix_floor"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "vix_spike"), CheckStatus::FailBlocking);

        let checks = run(
            &call_spread(),
            &inputs(),
            tuesday_11(),
            External::Unavailable("lookup failed".into()),
        );
        assert_eq!(status_of(&checks, "vix_spike"), CheckStatus::WarnNonblocking);
    }

    #[test]
    fn realized_volatility_ratio_blocks() {
        let profile = IndexProfile::spx();
        let filters = FilterConfig::default();
        let core = call_spread();
        let inputs = inputs();
        let checks = run_checks(&CheckContext {
            profile: &profile,
            filters: &filters,
            now_et: tuesday_11(),
            core: &core,
            inputs: &inputs,
            vix_change: External::Value(None),
            realized_range: External::Value(Some(RangeReading {
                recent_range: 9.0,
                baseline_range: 3.0,
            })),
        });
        assert_eq!(status_of(&checks, "realized_volatility"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "vix_spike"), CheckStatus::Pass);
    }

    #[test]
    fn momentum_rules() {
        let mut inputs = inputs();
        inputs.rsi = 85.0;
        inputs.consecutive_down_days = 6;
        inputs.gap_pct = 0.6;
        let checks = run(&call_spread(), &inputs, tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "rsi"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "consecutive_down_days"), CheckStatus::FailBlocking);
        assert_eq!(status_of(&checks, "gap_size"), CheckStatus::FailBlocking);
    }

    #[test]
    fn short_strike_too_close_blocks() {
        let mut core = call_spread();
        core.strikes = vec![dec!(6012), dec!(6017)];
        let checks = run(&core, &inputs(), tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "short_strike_proximity"), CheckStatus::FailBlocking);
    }

    #[test]
    fn iron_condor_checks_both_short_strikes() {
        let condor = StrategyCore {
            kind: StrategyKind::IronCondor,
            strikes: vec![dec!(6025), dec!(6030), dec!(5995), dec!(5990)],
            ..call_spread()
        };
        let checks = run(&condor, &inputs(), tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "short_strike_proximity"), CheckStatus::Pass);

        // Put short 3pts under spot 6010.
        let tight_put = StrategyCore {
            strikes: vec![dec!(6025), dec!(6030), dec!(6007), dec!(6002)],
            ..condor.clone()
        };
        let checks = run(&tight_put, &inputs(), tuesday_11(), External::Skipped);
        let check = checks.iter().find(|c| c.name == "short_strike_proximity").unwrap();
        assert_eq!(check.status, CheckStatus::FailBlocking);
        assert!(check.reason.starts_with("Short put"), "{}", check.reason);

        let incomplete = StrategyCore {
            strikes: vec![dec!(6025)],
            ..condor
        };
        let checks = run(&incomplete, &inputs(), tuesday_11(), External::Skipped);
        assert_eq!(status_of(&checks, "short_strike_proximity"), CheckStatus::FailBlocking);
    }

    #[test]
    fn any_blocking_check_forces_no_trade() {
        let mut core = call_spread();
        core.confidence = 1.0;
        let checks = vec![
            TradeabilityCheck::pass("a", "fine"),
            TradeabilityCheck::fail("b", "first problem"),
            TradeabilityCheck::fail("c", "second problem"),
        ];
        let decision = decide(&core, checks, 0.05, String::new());
        assert_eq!(decision.action, TradeAction::NoTrade);
        assert_eq!(decision.primary_reason, "first problem");
        assert_eq!(decision.decision_score, 1.0);
    }

    #[test]
    fn score_non_increasing_in_warnings() {
        let core = call_spread();
        let mut previous = f64::INFINITY;
        for warns in 0..10 {
            let checks = (0..warns)
                .map(|i| TradeabilityCheck::warn(format!("w{i}"), "meh"))
                .collect();
            let decision = decide(&core, checks, 0.05, String::new());
            assert!(decision.decision_score <= previous);
            assert!((0.0..=1.0).contains(&decision.decision_score));
            previous = decision.decision_score;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn skip_without_blocking_uses_skip_reason() {
        let core = StrategyCore::skip("no_volatility_data");
        let decision = decide(&core, vec![TradeabilityCheck::pass("a", "ok")], 0.05, String::new());
        assert_eq!(decision.action, TradeAction::NoTrade);
        assert_eq!(decision.primary_reason, "no_volatility_data");
    }

    #[test]
    fn clean_run_trades_with_ok_reason() {
        let core = call_spread();
        let checks = run(&core, &inputs(), tuesday_11(), External::Value(Some(0.0)));
        let decision = decide(&core, checks, 0.05, String::new());
        assert_eq!(decision.action, TradeAction::Trade);
        assert_eq!(decision.primary_reason, REASON_OK);
        assert!((decision.decision_score - 0.3).abs() < 1e-12);
    }
}
