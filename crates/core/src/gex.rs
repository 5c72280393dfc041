//! Gamma-exposure structure types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sign of a strike's net exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GexSide {
    Positive,
    Negative,
}

/// Aggregate signed exposure at one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexLevel {
    pub strike: Decimal,
    pub signed_gex: f64,
    /// `signed_gex` in billions, 3 decimals.
    pub gex_billion: f64,
    /// Zero counts as positive.
    pub side: GexSide,
}

impl GexLevel {
    #[must_use]
    pub fn new(strike: Decimal, signed_gex: f64) -> Self {
        Self {
            strike,
            signed_gex,
            gex_billion: (signed_gex / 1_000_000.0).round() / 1000.0,
            side: if signed_gex >= 0.0 {
                GexSide::Positive
            } else {
                GexSide::Negative
            },
        }
    }
}

/// Where spot sits relative to the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionBias {
    /// Spot within the index distance threshold of the pin.
    NeutralPin,
    /// Spot stretched above the pin.
    BearishPullback,
    /// Spot stretched below the pin.
    BullishReversion,
    Unknown,
}

/// Dealer gamma-exposure profile derived from one option chain.
///
/// Invariant: `pin`, `call_wall` and `put_wall` are strikes present in the
/// input chain, or all `None` when the chain had no usable rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexStructure {
    pub pin: Option<Decimal>,
    pub call_wall: Option<Decimal>,
    pub put_wall: Option<Decimal>,
    /// Largest |signed_gex| strikes, magnitude descending, ties by ascending strike.
    pub top_levels: Vec<GexLevel>,
    pub total_gex: Option<f64>,
    /// `spot - pin`.
    pub distance_to_pin: Option<f64>,
    pub direction_bias: DirectionBias,
}

impl GexStructure {
    /// Structure for a chain with no usable data.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            pin: None,
            call_wall: None,
            put_wall: None,
            top_levels: Vec::new(),
            total_gex: None,
            distance_to_pin: None,
            direction_bias: DirectionBias::Unknown,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.pin.is_some()
    }
}

impl Default for GexStructure {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Read of the GEX profile for display: what the spot/pin relation suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Observation {
    PinningRisk,
    UpsideStretched,
    DownsideStretched,
    Inconclusive,
}

impl From<DirectionBias> for Observation {
    fn from(bias: DirectionBias) -> Self {
        match bias {
            DirectionBias::NeutralPin => Self::PinningRisk,
            DirectionBias::BearishPullback => Self::UpsideStretched,
            DirectionBias::BullishReversion => Self::DownsideStretched,
            DirectionBias::Unknown => Self::Inconclusive,
        }
    }
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::PinningRisk => "PINNING_RISK",
            Self::UpsideStretched => "UPSIDE_STRETCHED",
            Self::DownsideStretched => "DOWNSIDE_STRETCHED",
            Self::Inconclusive => "INCONCLUSIVE",
        };
        f.write_str(label)
    }
}

/// Human-facing signal block: observation plus the facts behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub observation: Observation,
    pub direction_bias: DirectionBias,
    pub reasons: Vec<String>,
}

impl Default for SignalSummary {
    fn default() -> Self {
        Self {
            observation: Observation::Inconclusive,
            direction_bias: DirectionBias::Unknown,
            reasons: Vec::new(),
        }
    }
}
