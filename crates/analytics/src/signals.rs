//! Display-level read of the GEX profile.

use gamma_core::{GexStructure, Observation, OptionsSummary, SignalSummary};
use rust_decimal::prelude::ToPrimitive;

/// Maps the direction bias to an observation and lists the facts behind it:
/// spot against pin, then put/call ratios when available.
#[must_use]
pub fn build_signal_summary(
    gex: &GexStructure,
    options: &OptionsSummary,
    spot: Option<f64>,
) -> SignalSummary {
    let mut reasons = Vec::new();

    if let (Some(spot), Some(pin), Some(distance)) =
        (spot, gex.pin.and_then(|p| p.to_f64()), gex.distance_to_pin)
    {
        reasons.push(format!(
            "Spot {spot:.2} vs Pin {pin:.2} (distance {distance:+.2})"
        ));
    }
    if let Some(pcr) = options.put_call_oi_ratio {
        reasons.push(format!("PCR(OI)={pcr:.3}"));
    }
    if let Some(pcr) = options.put_call_volume_ratio {
        reasons.push(format!("PCR(Volume)={pcr:.3}"));
    }

    SignalSummary {
        observation: Observation::from(gex.direction_bias),
        direction_bias: gex.direction_bias,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamma_core::DirectionBias;
    use rust_decimal_macros::dec;

    #[test]
    fn stretched_spot_with_ratios() {
        let gex = GexStructure {
            pin: Some(dec!(6000)),
            distance_to_pin: Some(10.0),
            direction_bias: DirectionBias::BearishPullback,
            ..GexStructure::unavailable()
        };
        let options = OptionsSummary {
            put_call_oi_ratio: Some(1.25),
            put_call_volume_ratio: Some(0.8),
            ..OptionsSummary::default()
        };

        let signals = build_signal_summary(&gex, &options, Some(6010.0));
        assert_eq!(signals.observation, Observation::UpsideStretched);
        assert_eq!(
            signals.reasons,
            vec![
                "Spot 6010.00 vs Pin 6000.00 (distance +10.00)".to_string(),
                "PCR(OI)=1.250".to_string(),
                "PCR(Volume)=0.800".to_string(),
            ]
        );
    }

    #[test]
    fn no_structure_is_inconclusive() {
        let signals = build_signal_summary(
            &GexStructure::unavailable(),
            &OptionsSummary::default(),
            Some(6010.0),
        );
        assert_eq!(signals.observation, Observation::Inconclusive);
        assert!(signals.reasons.is_empty());
    }
}
