//! Distributional diagnostics on residual series.
//!
//! Jarque–Bera and Kolmogorov–Smirnov normality tests, the Ljung–Box
//! autocorrelation test, and the ARCH-LM volatility-clustering test.
//! All verdicts use a 5% significance level.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use std::collections::BTreeMap;

use risk_core::stats;
use risk_core::types::InsufficientDataError;

use crate::backtest::{TestKind, TestVerdict, ValidationTestResult};
use crate::error::ValidationError;

/// Significance level for all diagnostic verdicts.
const SIGNIFICANCE: f64 = 0.05;
/// Minimum sample for the normality tests.
const MIN_NORMALITY_SAMPLE: usize = 8;

fn chi_squared(df: f64) -> Result<ChiSquared, ValidationError> {
    ChiSquared::new(df).map_err(|e| ValidationError::Numerical(e.to_string()))
}

fn verdict_from_p(p_value: f64) -> TestVerdict {
    if p_value > SIGNIFICANCE {
        TestVerdict::Pass
    } else {
        TestVerdict::Fail
    }
}

/// Jarque–Bera normality test.
///
/// `JB = n/6 * (S^2 + K^2/4)` with `S` the skewness and `K` the excess
/// kurtosis, chi-square(2) under normality.
///
/// # Errors
///
/// [`ValidationError::InsufficientData`] below 8 observations;
/// [`ValidationError::Numerical`] on a zero-variance sample.
pub fn jarque_bera(data: &[f64]) -> Result<ValidationTestResult, ValidationError> {
    if data.len() < MIN_NORMALITY_SAMPLE {
        return Err(InsufficientDataError {
            got: data.len(),
            need: MIN_NORMALITY_SAMPLE,
        }
        .into());
    }
    if stats::std_dev(data) == 0.0 {
        return Err(ValidationError::Numerical(
            "sample has zero variance; normality is undefined".to_string(),
        ));
    }

    let n = data.len() as f64;
    let skewness = stats::skewness(data);
    let excess_kurtosis = stats::excess_kurtosis(data);
    let statistic = n / 6.0 * (skewness * skewness + excess_kurtosis * excess_kurtosis / 4.0);

    let chi2 = chi_squared(2.0)?;
    let p_value = 1.0 - chi2.cdf(statistic);
    let critical_value = chi2.inverse_cdf(1.0 - SIGNIFICANCE);

    let mut details = BTreeMap::new();
    details.insert("skewness".to_string(), skewness);
    details.insert("excess_kurtosis".to_string(), excess_kurtosis);

    Ok(ValidationTestResult {
        test_name: "Jarque-Bera Normality Test".to_string(),
        kind: TestKind::JarqueBera,
        verdict: verdict_from_p(p_value),
        statistic,
        p_value,
        critical_value,
        confidence_level: 1.0 - SIGNIFICANCE,
        description: "Tests for normality using skewness and kurtosis".to_string(),
        details,
    })
}

/// Kolmogorov–Smirnov normality test against `N(mean, std)` fitted to the
/// sample, with the asymptotic Kolmogorov p-value.
pub fn kolmogorov_smirnov(data: &[f64]) -> Result<ValidationTestResult, ValidationError> {
    if data.len() < MIN_NORMALITY_SAMPLE {
        return Err(InsufficientDataError {
            got: data.len(),
            need: MIN_NORMALITY_SAMPLE,
        }
        .into());
    }
    let mean = stats::mean(data);
    let std = stats::std_dev(data);
    if std == 0.0 {
        return Err(ValidationError::Numerical(
            "sample has zero variance; normality is undefined".to_string(),
        ));
    }

    let normal = Normal::new(mean, std).map_err(|e| ValidationError::Numerical(e.to_string()))?;

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len() as f64;
    let mut statistic = 0.0_f64;
    for (i, &x) in sorted.iter().enumerate() {
        let cdf = normal.cdf(x);
        let above = (i as f64 + 1.0) / n - cdf;
        let below = cdf - i as f64 / n;
        statistic = statistic.max(above.max(below));
    }

    let p_value = kolmogorov_p(statistic, n);
    // Asymptotic 5% critical value
    let critical_value = 1.36 / n.sqrt();

    let mut details = BTreeMap::new();
    details.insert("fitted_mean".to_string(), mean);
    details.insert("fitted_std".to_string(), std);

    Ok(ValidationTestResult {
        test_name: "Kolmogorov-Smirnov Test".to_string(),
        kind: TestKind::KolmogorovSmirnov,
        verdict: verdict_from_p(p_value),
        statistic,
        p_value,
        critical_value,
        confidence_level: 1.0 - SIGNIFICANCE,
        description: "Tests for normality using the empirical distribution function".to_string(),
        details,
    })
}

/// Asymptotic Kolmogorov distribution tail probability.
fn kolmogorov_p(d: f64, n: f64) -> f64 {
    let lambda = (n.sqrt() + 0.12 + 0.11 / n.sqrt()) * d;
    let mut sum = 0.0;
    for j in 1..=100 {
        let j_f = j as f64;
        let sign = if j % 2 == 1 { 1.0 } else { -1.0 };
        sum += sign * (-2.0 * j_f * j_f * lambda * lambda).exp();
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Ljung–Box autocorrelation test across the given lag count.
///
/// `LB = n(n+2) * sum_k rho_k^2 / (n - k)`, chi-square(lags) under the
/// null of no autocorrelation.
///
/// # Errors
///
/// [`ValidationError::InvalidInput`] for `lags == 0`;
/// [`ValidationError::InsufficientData`] unless `n > lags + 1`.
pub fn ljung_box(data: &[f64], lags: usize) -> Result<ValidationTestResult, ValidationError> {
    if lags == 0 {
        return Err(ValidationError::InvalidInput(
            "lag count must be positive".to_string(),
        ));
    }
    if data.len() <= lags + 1 {
        return Err(InsufficientDataError {
            got: data.len(),
            need: lags + 2,
        }
        .into());
    }

    let n = data.len() as f64;
    let mut statistic = 0.0;
    let mut autocorrelations = Vec::with_capacity(lags);
    for lag in 1..=lags {
        let rho = stats::correlation(&data[..data.len() - lag], &data[lag..]);
        autocorrelations.push(rho);
        statistic += rho * rho / (n - lag as f64);
    }
    statistic *= n * (n + 2.0);

    let chi2 = chi_squared(lags as f64)?;
    let p_value = 1.0 - chi2.cdf(statistic);
    let critical_value = chi2.inverse_cdf(1.0 - SIGNIFICANCE);

    let mut details = BTreeMap::new();
    for (k, rho) in autocorrelations.iter().enumerate().take(5) {
        details.insert(format!("rho_{}", k + 1), *rho);
    }
    details.insert("lags".to_string(), lags as f64);

    Ok(ValidationTestResult {
        test_name: "Ljung-Box Autocorrelation Test".to_string(),
        kind: TestKind::LjungBox,
        verdict: verdict_from_p(p_value),
        statistic,
        p_value,
        critical_value,
        confidence_level: 1.0 - SIGNIFICANCE,
        description: "Tests for autocorrelation in residuals".to_string(),
        details,
    })
}

/// ARCH-LM test for volatility clustering.
///
/// First-order LM statistic: `n * rho^2` where `rho` is the lag-1
/// autocorrelation of the squared demeaned series, chi-square(1) under
/// the null of no ARCH effects.
pub fn arch_lm(data: &[f64]) -> Result<ValidationTestResult, ValidationError> {
    if data.len() < 3 {
        return Err(InsufficientDataError {
            got: data.len(),
            need: 3,
        }
        .into());
    }

    let mean = stats::mean(data);
    let squared: Vec<f64> = data.iter().map(|&x| (x - mean) * (x - mean)).collect();

    let correlation = stats::correlation(&squared[..squared.len() - 1], &squared[1..]);
    let n = (squared.len() - 1) as f64;
    let statistic = n * correlation * correlation;

    let chi2 = chi_squared(1.0)?;
    let p_value = 1.0 - chi2.cdf(statistic);
    let critical_value = chi2.inverse_cdf(1.0 - SIGNIFICANCE);

    let mut details = BTreeMap::new();
    details.insert("arch_correlation".to_string(), correlation);

    Ok(ValidationTestResult {
        test_name: "ARCH-LM Test for Volatility Clustering".to_string(),
        kind: TestKind::ArchLm,
        verdict: verdict_from_p(p_value),
        statistic,
        p_value,
        critical_value,
        confidence_level: 1.0 - SIGNIFICANCE,
        description: "Tests for volatility clustering (ARCH effects)".to_string(),
        details,
    })
}

/// Run the full diagnostic suite on a residual series.
pub fn run_diagnostics(
    data: &[f64],
    lags: usize,
) -> Result<Vec<ValidationTestResult>, ValidationError> {
    Ok(vec![
        jarque_bera(data)?,
        kolmogorov_smirnov(data)?,
        ljung_box(data, lags)?,
        arch_lm(data)?,
    ])
}
