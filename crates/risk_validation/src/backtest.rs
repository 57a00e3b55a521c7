//! VaR backtesting: coverage tests and the Basel traffic light.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;
use tracing::debug;

use risk_core::types::{ConfidenceLevel, InsufficientDataError};

use crate::error::ValidationError;

/// Outcome of a validation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestVerdict {
    /// The null hypothesis stands; the model looks consistent.
    Pass,
    /// The null hypothesis is rejected at the significance level.
    Fail,
    /// Borderline or partially degenerate evidence.
    Warning,
    /// The sample could not support a conclusion.
    Inconclusive,
}

/// Which statistical test produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Kupiec proportion-of-failures coverage test.
    Kupiec,
    /// Christoffersen coverage-and-independence test.
    Christoffersen,
    /// Jarque–Bera normality test.
    JarqueBera,
    /// Kolmogorov–Smirnov normality test.
    KolmogorovSmirnov,
    /// Ljung–Box autocorrelation test.
    LjungBox,
    /// ARCH-LM volatility clustering test.
    ArchLm,
}

/// Result of a single validation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationTestResult {
    /// Human-readable test name.
    pub test_name: String,
    /// Which test ran.
    pub kind: TestKind,
    /// Verdict at the configured significance level.
    pub verdict: TestVerdict,
    /// Test statistic.
    pub statistic: f64,
    /// p-value of the statistic under the null.
    pub p_value: f64,
    /// Critical value at the significance level.
    pub critical_value: f64,
    /// Confidence level the test targeted.
    pub confidence_level: f64,
    /// What the test checks.
    pub description: String,
    /// Supporting numbers (violation counts, transition counts, ...).
    pub details: BTreeMap<String, f64>,
}

/// Basel traffic-light classification of a violation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLight {
    /// Violations within `expected + 4`.
    Green,
    /// Violations within `expected + 9`.
    Yellow,
    /// More violations than `expected + 9`.
    Red,
}

/// Full VaR backtest report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Observations in the backtest window.
    pub observations: usize,
    /// Observed violation count.
    pub violations: usize,
    /// Observed violation rate.
    pub violation_rate: f64,
    /// Expected violation count at the confidence level.
    pub expected_violations: usize,
    /// Basel traffic-light zone.
    pub traffic_light: TrafficLight,
    /// Coverage tests (Kupiec, Christoffersen).
    pub tests: Vec<ValidationTestResult>,
    /// Ratio of violation runs to total violations; low values indicate
    /// clustering.
    pub violation_clustering: f64,
}

fn chi_squared(df: f64) -> Result<ChiSquared, ValidationError> {
    ChiSquared::new(df).map_err(|e| ValidationError::Numerical(e.to_string()))
}

/// Boolean violation series: `realized < -VaR` per observation.
///
/// # Errors
///
/// [`ValidationError::InvalidInput`] on a length mismatch or empty input.
pub fn violation_series(
    returns: &[f64],
    var_estimates: &[f64],
) -> Result<Vec<bool>, ValidationError> {
    if returns.is_empty() {
        return Err(InsufficientDataError { got: 0, need: 1 }.into());
    }
    if returns.len() != var_estimates.len() {
        return Err(ValidationError::InvalidInput(format!(
            "{} returns but {} VaR estimates",
            returns.len(),
            var_estimates.len()
        )));
    }
    Ok(returns
        .iter()
        .zip(var_estimates.iter())
        .map(|(&r, &var)| r < -var)
        .collect())
}

/// Kupiec proportion-of-failures test.
///
/// Likelihood-ratio statistic of the observed violation rate against the
/// expected rate `1 - confidence`, compared to chi-square(1).
///
/// # Errors
///
/// [`ValidationError::InsufficientData`] on an empty series;
/// [`ValidationError::InvalidInput`] for a significance outside (0, 1).
pub fn kupiec_test(
    violations: &[bool],
    confidence: ConfidenceLevel,
    significance: f64,
) -> Result<ValidationTestResult, ValidationError> {
    if violations.is_empty() {
        return Err(InsufficientDataError { got: 0, need: 1 }.into());
    }
    check_significance(significance)?;

    let n = violations.len();
    let x = violations.iter().filter(|&&v| v).count();
    let p = confidence.tail();

    let n_f = n as f64;
    let x_f = x as f64;

    // Log-space likelihood ratio; the x = 0 and x = n boundaries have
    // closed forms
    let statistic = if x == 0 {
        2.0 * n_f * (1.0 / (1.0 - p)).ln()
    } else if x == n {
        2.0 * n_f * (1.0 / p).ln()
    } else {
        let rate = x_f / n_f;
        -2.0 * (x_f * p.ln() + (n_f - x_f) * (1.0 - p).ln()
            - x_f * rate.ln()
            - (n_f - x_f) * (1.0 - rate).ln())
    };

    let chi2 = chi_squared(1.0)?;
    let critical_value = chi2.inverse_cdf(1.0 - significance);
    let p_value = 1.0 - chi2.cdf(statistic);

    let verdict = if p_value > significance {
        TestVerdict::Pass
    } else {
        TestVerdict::Fail
    };
    let description = if verdict == TestVerdict::Pass {
        "Violation rate is statistically consistent with the confidence level".to_string()
    } else if x_f / n_f > p {
        "Violation rate significantly above expected; the model underestimates risk".to_string()
    } else {
        "Violation rate significantly below expected; the model overestimates risk".to_string()
    };

    let mut details = BTreeMap::new();
    details.insert("violations".to_string(), x_f);
    details.insert("observations".to_string(), n_f);
    details.insert("violation_rate".to_string(), x_f / n_f);
    details.insert("expected_rate".to_string(), p);

    debug!(statistic, p_value, ?verdict, "kupiec test");
    Ok(ValidationTestResult {
        test_name: "Kupiec POF Test".to_string(),
        kind: TestKind::Kupiec,
        verdict,
        statistic,
        p_value,
        critical_value,
        confidence_level: confidence.value(),
        description,
        details,
    })
}

/// Christoffersen coverage-and-independence test.
///
/// Adds a Markov-transition independence statistic to the Kupiec
/// statistic; the combined statistic is chi-square(2) under the null of
/// correct coverage with independent violations.
pub fn christoffersen_test(
    violations: &[bool],
    confidence: ConfidenceLevel,
    significance: f64,
) -> Result<ValidationTestResult, ValidationError> {
    if violations.len() < 2 {
        return Err(InsufficientDataError {
            got: violations.len(),
            need: 2,
        }
        .into());
    }
    check_significance(significance)?;

    let mut n00 = 0.0;
    let mut n01 = 0.0;
    let mut n10 = 0.0;
    let mut n11 = 0.0;
    for pair in violations.windows(2) {
        match (pair[0], pair[1]) {
            (false, false) => n00 += 1.0,
            (false, true) => n01 += 1.0,
            (true, false) => n10 += 1.0,
            (true, true) => n11 += 1.0,
        }
    }

    let x = violations.iter().filter(|&&v| v).count() as f64;
    let n = violations.len() as f64;
    let pi_hat = x / n;
    let pi_01 = if n00 + n01 > 0.0 { n01 / (n00 + n01) } else { 0.0 };
    let pi_11 = if n10 + n11 > 0.0 { n11 / (n10 + n11) } else { 0.0 };

    // Independence LR in log space; terms with a zero count contribute 0
    let term = |count: f64, prob: f64| -> f64 {
        if count > 0.0 && prob > 0.0 {
            count * prob.ln()
        } else {
            0.0
        }
    };
    let independence_statistic = if pi_hat > 0.0 && pi_hat < 1.0 {
        let log_null = term(n01 + n11, pi_hat) + term(n00 + n10, 1.0 - pi_hat);
        let log_markov =
            term(n01, pi_01) + term(n00, 1.0 - pi_01) + term(n11, pi_11) + term(n10, 1.0 - pi_11);
        (-2.0 * (log_null - log_markov)).max(0.0)
    } else {
        0.0
    };

    let kupiec = kupiec_test(violations, confidence, significance)?;
    let statistic = kupiec.statistic + independence_statistic;

    let chi2 = chi_squared(2.0)?;
    let critical_value = chi2.inverse_cdf(1.0 - significance);
    let p_value = 1.0 - chi2.cdf(statistic);

    let verdict = if p_value > significance {
        TestVerdict::Pass
    } else {
        TestVerdict::Fail
    };
    let description = if verdict == TestVerdict::Pass {
        "VaR violations show correct coverage and independence".to_string()
    } else {
        "VaR violations show incorrect coverage or clustering".to_string()
    };

    let mut details = BTreeMap::new();
    details.insert("n00".to_string(), n00);
    details.insert("n01".to_string(), n01);
    details.insert("n10".to_string(), n10);
    details.insert("n11".to_string(), n11);
    details.insert("pi_01".to_string(), pi_01);
    details.insert("pi_11".to_string(), pi_11);
    details.insert("independence_statistic".to_string(), independence_statistic);

    Ok(ValidationTestResult {
        test_name: "Christoffersen Coverage and Independence Test".to_string(),
        kind: TestKind::Christoffersen,
        verdict,
        statistic,
        p_value,
        critical_value,
        confidence_level: confidence.value(),
        description,
        details,
    })
}

/// Backtest a VaR model against realized returns.
///
/// Computes the violation series, runs the Kupiec and Christoffersen
/// tests at 5% significance, and classifies the violation count on the
/// Basel traffic light.
pub fn backtest_var_model(
    returns: &[f64],
    var_estimates: &[f64],
    confidence: ConfidenceLevel,
) -> Result<BacktestReport, ValidationError> {
    let violations = violation_series(returns, var_estimates)?;

    let observations = violations.len();
    let violation_count = violations.iter().filter(|&&v| v).count();
    let expected_violations = (observations as f64 * confidence.tail()) as usize;

    let traffic_light = if violation_count <= expected_violations + 4 {
        TrafficLight::Green
    } else if violation_count <= expected_violations + 9 {
        TrafficLight::Yellow
    } else {
        TrafficLight::Red
    };

    let mut tests = vec![kupiec_test(&violations, confidence, 0.05)?];
    if violations.len() >= 2 {
        tests.push(christoffersen_test(&violations, confidence, 0.05)?);
    }

    Ok(BacktestReport {
        observations,
        violations: violation_count,
        violation_rate: violation_count as f64 / observations as f64,
        expected_violations,
        traffic_light,
        tests,
        violation_clustering: clustering_ratio(&violations),
    })
}

/// Ratio of violation runs to total violations; 1 means fully isolated
/// violations, lower values mean clustering.
fn clustering_ratio(violations: &[bool]) -> f64 {
    if violations.len() < 3 {
        return 0.0;
    }
    let mut runs = 0usize;
    let mut in_run = false;
    for &violation in violations {
        if violation && !in_run {
            runs += 1;
            in_run = true;
        } else if !violation {
            in_run = false;
        }
    }
    let total = violations.iter().filter(|&&v| v).count();
    if total == 0 {
        0.0
    } else {
        runs as f64 / total as f64
    }
}

fn check_significance(significance: f64) -> Result<(), ValidationError> {
    if !(significance > 0.0 && significance < 1.0) {
        return Err(ValidationError::InvalidInput(format!(
            "significance must be in (0, 1), got {}",
            significance
        )));
    }
    Ok(())
}
