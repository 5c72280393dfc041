//! Market indicators used by the entry filters.
//!
//! All functions are pure and return `None` when the input series is too
//! short or degenerate, leaving the defaulting policy to the caller.

use gamma_core::{Candle, MomentumInputs, RangeReading};

pub const RSI_PERIOD: usize = 14;

/// Minimum intraday bars before realized range is judged.
pub const MIN_RANGE_BARS: usize = 20;

/// Trading hours per session used to scale annualized volatility.
const SESSION_HOURS: f64 = 6.5;
const TRADING_DAYS: f64 = 252.0;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// RSI over the last `period` close-to-close changes using simple means.
///
/// Flat losses read as 100, flat gains as 0.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let window = &closes[closes.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    if avg_gain == 0.0 {
        return Some(0.0);
    }
    let rs = avg_gain / avg_loss;
    Some(round_to(100.0 - 100.0 / (1.0 + rs), 1))
}

/// Number of trailing closes that were lower than the close before.
#[must_use]
pub fn consecutive_down_closes(closes: &[f64]) -> u32 {
    closes
        .windows(2)
        .rev()
        .take_while(|w| w[1] < w[0])
        .count() as u32
}

/// Absolute opening gap in percent of the previous close.
#[must_use]
pub fn gap_pct(previous_close: f64, today_open: f64) -> Option<f64> {
    if previous_close <= 0.0 || !previous_close.is_finite() || !today_open.is_finite() {
        return None;
    }
    Some(round_to(
        ((today_open - previous_close) / previous_close).abs() * 100.0,
        4,
    ))
}

/// Momentum readings from daily bars, oldest first.
///
/// RSI needs at least 15 bars; a shorter series falls back to a neutral 50.
/// Fewer than two bars yields `None`.
#[must_use]
pub fn momentum_from_daily(candles: &[Candle]) -> Option<MomentumInputs> {
    if candles.len() < 2 {
        return None;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let last = candles[candles.len() - 1];
    let previous = candles[candles.len() - 2];

    Some(MomentumInputs {
        rsi: rsi(&closes, RSI_PERIOD).unwrap_or(50.0),
        consecutive_down_days: consecutive_down_closes(&closes),
        gap_pct: gap_pct(previous.close, last.open).unwrap_or(0.0),
    })
}

/// One-sigma expected move over the next two trading hours, in index points.
#[must_use]
pub fn expected_move_2h(spot: Option<f64>, vix: Option<f64>) -> Option<f64> {
    let spot = spot.filter(|s| s.is_finite() && *s > 0.0)?;
    let vix = vix.filter(|v| v.is_finite() && *v > 0.0)?;
    let move_pts = spot * (vix / 100.0) * (2.0 / (TRADING_DAYS * SESSION_HOURS)).sqrt();
    Some(round_to(move_pts, 2))
}

/// Percent change between the last two closes.
#[must_use]
pub fn last_bar_change_pct(candles: &[Candle]) -> Option<f64> {
    let [.., previous, current] = candles else {
        return None;
    };
    if previous.close <= 0.0 {
        return None;
    }
    Some((current.close - previous.close) / previous.close * 100.0)
}

/// Mean bar range of the trailing `lookback_minutes` versus the bars before.
#[must_use]
pub fn realized_range(
    candles: &[Candle],
    lookback_minutes: u32,
    bar_minutes: u32,
) -> Option<RangeReading> {
    if candles.len() < MIN_RANGE_BARS || bar_minutes == 0 {
        return None;
    }
    let recent_bars = ((lookback_minutes / bar_minutes) as usize).max(1);
    if recent_bars >= candles.len() {
        return None;
    }
    let (baseline, recent) = candles.split_at(candles.len() - recent_bars);
    let mean_range = |bars: &[Candle]| bars.iter().map(Candle::range).sum::<f64>() / bars.len() as f64;

    Some(RangeReading {
        recent_range: mean_range(recent),
        baseline_range: mean_range(baseline),
    })
}
