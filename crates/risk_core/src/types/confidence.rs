//! Validated confidence levels for tail-risk metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A confidence level in the open interval (0, 1).
///
/// Used for VaR, expected shortfall, and hypothesis-test thresholds.
/// Construction validates the range once so downstream code can rely on
/// `0 < level < 1` without re-checking.
///
/// # Examples
/// ```
/// use risk_core::types::ConfidenceLevel;
///
/// let level = ConfidenceLevel::new(0.95).unwrap();
/// assert_eq!(level.value(), 0.95);
/// assert!((level.tail() - 0.05).abs() < 1e-12);
///
/// assert!(ConfidenceLevel::new(1.0).is_none());
/// assert!(ConfidenceLevel::new(0.0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl TryFrom<f64> for ConfidenceLevel {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        ConfidenceLevel::new(value)
            .ok_or_else(|| format!("confidence level must be in (0, 1), got {}", value))
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> f64 {
        level.0
    }
}

impl ConfidenceLevel {
    /// 90% confidence.
    pub const C90: ConfidenceLevel = ConfidenceLevel(0.90);
    /// 95% confidence.
    pub const C95: ConfidenceLevel = ConfidenceLevel(0.95);
    /// 99% confidence.
    pub const C99: ConfidenceLevel = ConfidenceLevel(0.99);
    /// 99.9% confidence.
    pub const C999: ConfidenceLevel = ConfidenceLevel(0.999);

    /// Create a confidence level, returning `None` unless `0 < level < 1`
    /// and the value is finite.
    pub fn new(level: f64) -> Option<Self> {
        if level.is_finite() && level > 0.0 && level < 1.0 {
            Some(Self(level))
        } else {
            None
        }
    }

    /// The confidence level itself, e.g. `0.95`.
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The tail probability `1 - level`, e.g. `0.05`.
    #[inline]
    pub fn tail(&self) -> f64 {
        1.0 - self.0
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}
