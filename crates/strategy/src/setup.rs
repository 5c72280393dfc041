//! Candidate trade structure from the GEX pin.
//!
//! Spot stretched at least `distance_threshold` away from the pin fades the
//! excursion with a directional credit spread: call spread above the pin,
//! put spread below. Otherwise an iron condor brackets pin and spot.

use gamma_analytics::indicators::expected_move_2h;
use gamma_core::{IndexProfile, StrategyCore, StrategyKind};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

pub const REASON_NO_OPTION_DATA: &str = "no_option_data";
pub const REASON_NO_SPOT: &str = "no_spot_price";
pub const REASON_NO_VOLATILITY: &str = "no_volatility_data";

/// Builds the candidate setup.
///
/// Returns a `Skip` with zero confidence when the pin, spot or volatility
/// reading is missing, checked in that order.
#[must_use]
pub fn build_setup(
    profile: &IndexProfile,
    spot: Option<f64>,
    pin: Option<Decimal>,
    vix: Option<f64>,
) -> StrategyCore {
    let Some(pin) = pin else {
        return StrategyCore::skip(REASON_NO_OPTION_DATA);
    };
    let Some((spot, spot_dec)) = spot
        .filter(|s| s.is_finite() && *s > 0.0)
        .and_then(|s| Decimal::from_f64(s).map(|d| (s, d)))
    else {
        return StrategyCore::skip(REASON_NO_SPOT);
    };
    let Some(vix) = vix.filter(|v| v.is_finite() && *v > 0.0) else {
        return StrategyCore::skip(REASON_NO_VOLATILITY);
    };
    let Some(pin_f) = pin.to_f64() else {
        return StrategyCore::skip(REASON_NO_OPTION_DATA);
    };

    let distance = spot - pin_f;
    let width = profile.base_spread_width;
    let offset = profile.short_offset();

    let (kind, strikes) = if distance.abs() >= profile.distance_threshold {
        if distance > 0.0 {
            let short = profile.strike_at_or_above(spot_dec + offset);
            (StrategyKind::CallSpread, vec![short, short + width])
        } else {
            let short = profile.strike_at_or_below(spot_dec - offset);
            (StrategyKind::PutSpread, vec![short, short - width])
        }
    } else {
        let call_short = profile.strike_at_or_above(pin.max(spot_dec) + offset);
        let put_short = profile.strike_at_or_below(pin.min(spot_dec) - offset);
        (
            StrategyKind::IronCondor,
            vec![call_short, call_short + width, put_short, put_short - width],
        )
    };

    StrategyCore {
        kind,
        strikes,
        confidence: confidence(distance, spot, vix),
        distance: Some(distance),
        spread_width: width,
        reason: "ok".to_string(),
    }
}

/// `|distance|` in units of the two-hour expected move, clipped to `[0, 1]`.
#[must_use]
pub fn confidence(distance: f64, spot: f64, vix: f64) -> f64 {
    match expected_move_2h(Some(spot), Some(vix)) {
        Some(em) if em > 0.0 => (distance.abs() / em).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
