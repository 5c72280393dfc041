//! Dealer gamma-exposure profile.
//!
//! Per row: `gamma × open_interest × contract_multiplier × spot²`, positive
//! for calls and negative for puts. Rows are aggregated per strike in a
//! `BTreeMap`, so every derived field depends only on the set of input rows.
//!
//! Derived levels:
//! - **pin**: strike nearest spot where the cumulative signed exposure,
//!   walked in ascending strike order, changes sign or touches zero. Without
//!   any crossing, the strike with the largest |exposure|.
//! - **call wall**: strike above spot with the largest positive exposure.
//! - **put wall**: strike below spot with the most negative exposure.
//! - **top levels**: largest |exposure| strikes.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use gamma_core::{
    DirectionBias, FlattenedOptionRow, GexLevel, GexStructure, IndexProfile, OptionType,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

pub const DEFAULT_TOP_LEVELS: usize = 8;

/// Stateless calculator configured for one index.
#[derive(Debug, Clone)]
pub struct GexCalculator {
    contract_multiplier: f64,
    distance_threshold: f64,
    top_levels: usize,
}

impl GexCalculator {
    #[must_use]
    pub fn new(profile: &IndexProfile) -> Self {
        Self {
            contract_multiplier: profile.contract_multiplier,
            distance_threshold: profile.distance_threshold,
            top_levels: DEFAULT_TOP_LEVELS,
        }
    }

    #[must_use]
    pub fn with_top_levels(mut self, top_levels: usize) -> Self {
        self.top_levels = top_levels;
        self
    }

    /// Net signed exposure per strike, ascending.
    #[must_use]
    pub fn exposure_by_strike(&self, rows: &[FlattenedOptionRow], spot: f64) -> BTreeMap<Decimal, f64> {
        let scale = self.contract_multiplier * spot * spot;
        let mut by_strike: BTreeMap<Decimal, f64> = BTreeMap::new();

        for row in rows {
            let Some(gamma) = row.gamma.filter(|g| g.is_finite()) else {
                continue;
            };
            let magnitude = gamma * row.open_interest * scale;
            if !magnitude.is_finite() {
                continue;
            }
            let signed = match row.option_type {
                OptionType::Call => magnitude,
                OptionType::Put => -magnitude,
            };
            *by_strike.entry(row.strike).or_insert(0.0) += signed;
        }

        by_strike
    }

    /// Computes the full structure. Empty rows or a missing/invalid spot
    /// yield [`GexStructure::unavailable`].
    #[must_use]
    pub fn compute(&self, rows: &[FlattenedOptionRow], spot: Option<f64>) -> GexStructure {
        let Some(spot) = spot.filter(|s| s.is_finite() && *s > 0.0) else {
            return GexStructure::unavailable();
        };
        let Some(spot_dec) = Decimal::from_f64(spot) else {
            return GexStructure::unavailable();
        };

        let by_strike = self.exposure_by_strike(rows, spot);
        if by_strike.is_empty() {
            return GexStructure::unavailable();
        }

        let levels: Vec<GexLevel> = by_strike
            .iter()
            .map(|(strike, gex)| GexLevel::new(*strike, *gex))
            .collect();

        let pin = zero_cross_pin(&levels, spot_dec).or_else(|| max_magnitude_pin(&levels, spot_dec));
        let distance_to_pin = pin.and_then(|p| p.to_f64()).map(|p| spot - p);

        GexStructure {
            pin,
            call_wall: call_wall(&levels, spot_dec),
            put_wall: put_wall(&levels, spot_dec),
            top_levels: top_levels(&levels, self.top_levels),
            total_gex: Some(levels.iter().map(|l| l.signed_gex).sum()),
            distance_to_pin,
            direction_bias: direction_bias(distance_to_pin, self.distance_threshold),
        }
    }
}

/// Classifies `spot - pin` against the index threshold.
#[must_use]
pub fn direction_bias(distance_to_pin: Option<f64>, threshold: f64) -> DirectionBias {
    match distance_to_pin {
        Some(d) if d.abs() <= threshold => DirectionBias::NeutralPin,
        Some(d) if d > 0.0 => DirectionBias::BearishPullback,
        Some(_) => DirectionBias::BullishReversion,
        None => DirectionBias::Unknown,
    }
}

// ============================================================================
// Level selection
// ============================================================================

/// Orders strikes by distance to spot, then by strike ascending.
fn nearer(a: Decimal, b: Decimal, spot: Decimal) -> Ordering {
    (a - spot).abs().cmp(&(b - spot).abs()).then(a.cmp(&b))
}

fn zero_cross_pin(levels: &[GexLevel], spot: Decimal) -> Option<Decimal> {
    let mut candidates = Vec::new();
    let mut previous: Option<f64> = None;
    let mut cumulative = 0.0;

    for level in levels {
        cumulative += level.signed_gex;
        let sign_flip = previous
            .is_some_and(|prev| (prev < 0.0 && cumulative > 0.0) || (prev > 0.0 && cumulative < 0.0));
        if sign_flip || cumulative == 0.0 {
            candidates.push(level.strike);
        }
        previous = Some(cumulative);
    }

    candidates.into_iter().min_by(|a, b| nearer(*a, *b, spot))
}

fn max_magnitude_pin(levels: &[GexLevel], spot: Decimal) -> Option<Decimal> {
    levels
        .iter()
        .min_by(|a, b| {
            b.signed_gex
                .abs()
                .total_cmp(&a.signed_gex.abs())
                .then_with(|| nearer(a.strike, b.strike, spot))
        })
        .map(|l| l.strike)
}

fn call_wall(levels: &[GexLevel], spot: Decimal) -> Option<Decimal> {
    levels
        .iter()
        .filter(|l| l.strike > spot && l.signed_gex > 0.0)
        .min_by(|a, b| {
            b.signed_gex
                .total_cmp(&a.signed_gex)
                .then_with(|| nearer(a.strike, b.strike, spot))
        })
        .map(|l| l.strike)
}

fn put_wall(levels: &[GexLevel], spot: Decimal) -> Option<Decimal> {
    levels
        .iter()
        .filter(|l| l.strike < spot && l.signed_gex < 0.0)
        .min_by(|a, b| {
            a.signed_gex
                .total_cmp(&b.signed_gex)
                .then_with(|| nearer(a.strike, b.strike, spot))
        })
        .map(|l| l.strike)
}

fn top_levels(levels: &[GexLevel], n: usize) -> Vec<GexLevel> {
    let mut ranked = levels.to_vec();
    ranked.sort_by(|a, b| {
        b.signed_gex
            .abs()
            .total_cmp(&a.signed_gex.abs())
            .then(a.strike.cmp(&b.strike))
    });
    ranked.truncate(n);
    ranked
}
