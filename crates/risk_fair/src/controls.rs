//! Security control effectiveness and vulnerability scoring.

use serde::{Deserialize, Serialize};

use crate::error::FairError;

/// Combined effectiveness is capped here: no control stack is perfect.
const EFFECTIVENESS_CAP: f64 = 0.99;

/// Kind of security control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    /// Stops threat events before they occur.
    Preventive,
    /// Detects events in progress.
    Detective,
    /// Limits damage after detection.
    Responsive,
    /// Covers gaps left by other controls.
    Compensating,
}

/// Effectiveness parameters of a single security control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlEffectiveness {
    /// Kind of control.
    pub control_type: ControlType,
    /// Base effectiveness in [0, 1].
    pub effectiveness: f64,
    /// Confidence in the effectiveness estimate, in [0, 1].
    pub confidence: f64,
    /// Annual degradation rate in [0, 1].
    pub degradation_rate: f64,
    /// Implementation quality factor in [0, 1].
    pub implementation_quality: f64,
}

impl ControlEffectiveness {
    /// Create a control with full confidence and quality and no
    /// degradation.
    ///
    /// # Errors
    ///
    /// [`FairError::InvalidParameter`] if `effectiveness` is outside
    /// `[0, 1]`.
    pub fn new(control_type: ControlType, effectiveness: f64) -> Result<Self, FairError> {
        if !(0.0..=1.0).contains(&effectiveness) {
            return Err(FairError::InvalidParameter(format!(
                "control effectiveness must be in [0, 1], got {}",
                effectiveness
            )));
        }
        Ok(Self {
            control_type,
            effectiveness,
            confidence: 1.0,
            degradation_rate: 0.0,
            implementation_quality: 1.0,
        })
    }

    /// Set the confidence factor.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the annual degradation rate.
    pub fn with_degradation(mut self, rate: f64) -> Self {
        self.degradation_rate = rate;
        self
    }

    /// Set the implementation quality factor.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.implementation_quality = quality;
        self
    }

    /// Effectiveness after quality, one year of degradation, and
    /// confidence adjustments.
    pub fn adjusted(&self) -> f64 {
        let quality_adjusted = self.effectiveness * self.implementation_quality;
        let degraded = if self.degradation_rate > 0.0 {
            quality_adjusted * (1.0 - self.degradation_rate)
        } else {
            quality_adjusted
        };
        (degraded * self.confidence).clamp(0.0, 1.0)
    }
}

/// Combined effectiveness of independent controls.
///
/// Controls overlap, so effectiveness does not add: the combined failure
/// rate is the product of individual failure rates,
/// `1 - prod(1 - e_i)`, capped at 0.99.
pub fn combined_effectiveness(controls: &[ControlEffectiveness]) -> f64 {
    if controls.is_empty() {
        return 0.0;
    }
    let combined_failure: f64 = controls.iter().map(|c| 1.0 - c.adjusted()).product();
    (1.0 - combined_failure).min(EFFECTIVENESS_CAP)
}

/// Vulnerability score from threat capability versus organisational
/// resilience, adjusted by control effectiveness. Normalised to [0, 1].
pub fn vulnerability_score(
    threat_capability: f64,
    organizational_resilience: f64,
    control_effectiveness: f64,
) -> f64 {
    // Small constant keeps a zero-resilience organisation finite
    let base = threat_capability / (organizational_resilience + 0.1);
    let adjusted = base * (1.0 - control_effectiveness);
    (adjusted / 2.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(ControlEffectiveness::new(ControlType::Preventive, 1.5).is_err());
        assert!(ControlEffectiveness::new(ControlType::Preventive, -0.1).is_err());
        assert!(ControlEffectiveness::new(ControlType::Preventive, 0.8).is_ok());
    }

    #[test]
    fn test_adjusted_applies_all_factors() {
        let control = ControlEffectiveness::new(ControlType::Detective, 0.8)
            .unwrap()
            .with_quality(0.9)
            .with_degradation(0.1)
            .with_confidence(0.95);
        // 0.8 * 0.9 * 0.9 * 0.95
        assert_relative_eq!(control.adjusted(), 0.8 * 0.9 * 0.9 * 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_combined_two_half_controls() {
        let controls = vec![
            ControlEffectiveness::new(ControlType::Preventive, 0.5).unwrap(),
            ControlEffectiveness::new(ControlType::Detective, 0.5).unwrap(),
        ];
        assert_relative_eq!(combined_effectiveness(&controls), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_combined_caps_below_one() {
        let controls = vec![
            ControlEffectiveness::new(ControlType::Preventive, 0.9).unwrap(),
            ControlEffectiveness::new(ControlType::Detective, 0.9).unwrap(),
            ControlEffectiveness::new(ControlType::Responsive, 0.9).unwrap(),
        ];
        assert_relative_eq!(combined_effectiveness(&controls), 0.99, epsilon = 1e-12);
    }

    #[test]
    fn test_combined_empty_is_zero() {
        assert_eq!(combined_effectiveness(&[]), 0.0);
    }

    #[test]
    fn test_combined_single_control() {
        let controls = vec![ControlEffectiveness::new(ControlType::Preventive, 0.6).unwrap()];
        assert_relative_eq!(combined_effectiveness(&controls), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_vulnerability_known_value() {
        // capability 0.7, resilience 0.5, controls 0.4:
        // base = 0.7 / 0.6, adjusted = base * 0.6, score = adjusted / 2
        let score = vulnerability_score(0.7, 0.5, 0.4);
        assert_relative_eq!(score, (0.7 / 0.6) * 0.6 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vulnerability_caps_at_one() {
        let score = vulnerability_score(1.0, 0.0, 0.0);
        assert!(score <= 1.0);
    }

    #[test]
    fn test_stronger_controls_reduce_vulnerability() {
        let weak = vulnerability_score(0.7, 0.5, 0.2);
        let strong = vulnerability_score(0.7, 0.5, 0.8);
        assert!(strong < weak);
    }
}
