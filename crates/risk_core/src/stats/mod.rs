//! Descriptive statistics over return and sample series.
//!
//! Provides the moment calculations and percentile logic shared by the
//! simulation, metrics, and validation layers. Conventions:
//!
//! - Variance and standard deviation are **population** statistics
//!   (divide by `n`), matching the simulation layer's usage.
//! - `kurtosis` is the raw fourth standardised moment (normal = 3);
//!   `excess_kurtosis` subtracts 3 (normal = 0).
//! - `percentile` uses linear interpolation between closest ranks.
//!
//! The low-level helpers assume non-empty input and propagate NaN if that
//! precondition is violated; [`moments`] is the validating entry point.

use serde::{Deserialize, Serialize};

use crate::types::InsufficientDataError;

/// Statistical moments of a sample distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalMoments {
    /// Sample mean.
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Third standardised moment (0 for a degenerate sample).
    pub skewness: f64,
    /// Fourth standardised moment (0 for a degenerate sample, 3 for normal).
    pub kurtosis: f64,
    /// Sample median.
    pub median: f64,
}

/// Arithmetic mean.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[inline]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Third standardised moment. Returns 0 when the standard deviation is 0.
pub fn skewness(values: &[f64]) -> f64 {
    let m = mean(values);
    let s = std_dev(values);
    if s == 0.0 {
        return 0.0;
    }
    let n = values.len() as f64;
    values.iter().map(|v| ((v - m) / s).powi(3)).sum::<f64>() / n
}

/// Fourth standardised moment (raw, normal = 3). Returns 0 when the
/// standard deviation is 0.
pub fn kurtosis(values: &[f64]) -> f64 {
    let m = mean(values);
    let s = std_dev(values);
    if s == 0.0 {
        return 0.0;
    }
    let n = values.len() as f64;
    values.iter().map(|v| ((v - m) / s).powi(4)).sum::<f64>() / n
}

/// Excess kurtosis (normal = 0).
#[inline]
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let k = kurtosis(values);
    if k == 0.0 {
        0.0
    } else {
        k - 3.0
    }
}

/// Sample median.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Percentile in `[0, 100]` with linear interpolation between closest ranks.
///
/// Matches the interpolation convention used throughout the engine for
/// empirical VaR and loss-exceedance work.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    debug_assert!((0.0..=100.0).contains(&pct), "percentile out of range");
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}

/// Population covariance of two equal-length series.
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len(), "covariance requires equal lengths");
    let mx = mean(x);
    let my = mean(y);
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / x.len() as f64
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0 when either series is constant (zero variance), so callers
/// never see a NaN from a degenerate pair.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let sx = std_dev(x);
    let sy = std_dev(y);
    if sx == 0.0 || sy == 0.0 {
        return 0.0;
    }
    covariance(x, y) / (sx * sy)
}

/// Compute the full set of statistical moments for a sample.
///
/// # Errors
///
/// Returns [`InsufficientDataError`] for an empty sample.
pub fn moments(values: &[f64]) -> Result<StatisticalMoments, InsufficientDataError> {
    if values.is_empty() {
        return Err(InsufficientDataError { got: 0, need: 1 });
    }
    Ok(StatisticalMoments {
        mean: mean(values),
        variance: variance(values),
        std_dev: std_dev(values),
        skewness: skewness(values),
        kurtosis: kurtosis(values),
        median: median(values),
    })
}
