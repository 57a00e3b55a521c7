//! Comprehensive risk metric set for a return series.

use serde::{Deserialize, Serialize};
use tracing::warn;

use risk_core::stats;
use risk_core::types::{ConfidenceLevel, InsufficientDataError};

use crate::error::MetricsError;
use crate::var::{expected_shortfall, historical_var, EsMethod};

/// Share of the sample treated as the extreme tail for the tail-risk metric.
const TAIL_SHARE: f64 = 0.05;

/// Explicit record of a defaulted or degenerate computation.
///
/// The engine never silently substitutes a safe value: every ratio that
/// fell back to 0 because its denominator was 0, and every empirical tail
/// that was empty, leaves one of these on the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MetricWarning {
    /// A ratio defaulted to 0 because its denominator was 0.
    ZeroDenominator {
        /// Which metric was defaulted, e.g. `"sharpe_ratio"`.
        metric: String,
    },
    /// The empirical tail beyond the VaR threshold was empty; ES fell back
    /// to the VaR value.
    EmptyTail {
        /// Confidence level of the affected estimate.
        level: ConfidenceLevel,
    },
}

/// VaR and expected shortfall at one confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailRiskAtLevel {
    /// Confidence level.
    pub level: ConfidenceLevel,
    /// Value-at-Risk magnitude.
    pub var: f64,
    /// Expected shortfall magnitude. Always `>= var`.
    pub expected_shortfall: f64,
}

/// Comprehensive risk metrics for a return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetricSet {
    /// Tail metrics per requested confidence level, ascending.
    pub tail_metrics: Vec<TailRiskAtLevel>,
    /// Population standard deviation of the series.
    pub volatility: f64,
    /// Mean return.
    pub expected_return: f64,
    /// (mean - risk-free) / volatility.
    pub sharpe_ratio: f64,
    /// (mean - risk-free) / downside deviation.
    pub sortino_ratio: f64,
    /// mean / max drawdown.
    pub calmar_ratio: f64,
    /// Third standardised moment.
    pub skewness: f64,
    /// Excess kurtosis (normal = 0).
    pub kurtosis: f64,
    /// Worst peak-to-trough loss of the cumulative return path (magnitude).
    pub max_drawdown: f64,
    /// Standard deviation of the negative returns only.
    pub downside_deviation: f64,
    /// Fraction of observations below zero.
    pub probability_of_loss: f64,
    /// Mean magnitude of the worst 5% of returns.
    pub tail_risk: f64,
    /// Mean return in benchmark-up periods relative to the benchmark (1 if none).
    pub upside_capture: f64,
    /// Mean return in benchmark-down periods relative to the benchmark (1 if none).
    pub downside_capture: f64,
    /// mean / volatility.
    pub risk_adjusted_return: f64,
    /// Every defaulted or degenerate computation, in occurrence order.
    pub warnings: Vec<MetricWarning>,
}

impl RiskMetricSet {
    /// VaR at a given confidence level, if it was requested.
    pub fn var_at(&self, level: ConfidenceLevel) -> Option<f64> {
        self.tail_metrics
            .iter()
            .find(|t| t.level == level)
            .map(|t| t.var)
    }

    /// Expected shortfall at a given confidence level, if it was requested.
    pub fn es_at(&self, level: ConfidenceLevel) -> Option<f64> {
        self.tail_metrics
            .iter()
            .find(|t| t.level == level)
            .map(|t| t.expected_shortfall)
    }
}

/// Risk metrics calculator.
///
/// Holds the risk-free rate only; every computation is a pure function of
/// its inputs. The risk-free rate must be expressed on the same
/// periodicity as the return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetricsCalculator {
    risk_free_rate: f64,
}

impl Default for RiskMetricsCalculator {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
        }
    }
}

impl RiskMetricsCalculator {
    /// Create a calculator with the given risk-free rate.
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// The configured risk-free rate.
    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Compute the full metric set for a return series.
    ///
    /// `confidence_levels` may arrive in any order; tail metrics are
    /// reported ascending. An optional benchmark of the same length drives
    /// the capture ratios.
    ///
    /// # Errors
    ///
    /// - [`MetricsError::InsufficientData`] on an empty series
    /// - [`MetricsError::InvalidInput`] on an empty level set or a
    ///   benchmark length mismatch
    pub fn compute_metrics(
        &self,
        returns: &[f64],
        confidence_levels: &[ConfidenceLevel],
        benchmark: Option<&[f64]>,
    ) -> Result<RiskMetricSet, MetricsError> {
        if returns.is_empty() {
            return Err(InsufficientDataError { got: 0, need: 1 }.into());
        }
        if confidence_levels.is_empty() {
            return Err(MetricsError::InvalidInput(
                "at least one confidence level is required".to_string(),
            ));
        }
        if let Some(bench) = benchmark {
            if bench.len() != returns.len() {
                return Err(MetricsError::InvalidInput(format!(
                    "benchmark length {} does not match returns length {}",
                    bench.len(),
                    returns.len()
                )));
            }
        }

        let mut warnings = Vec::new();

        let mean_return = stats::mean(returns);
        let volatility = stats::std_dev(returns);
        let skewness = stats::skewness(returns);
        let kurtosis = stats::excess_kurtosis(returns);

        let mut levels: Vec<ConfidenceLevel> = confidence_levels.to_vec();
        levels.sort_by(|a, b| a.value().partial_cmp(&b.value()).unwrap_or(std::cmp::Ordering::Equal));
        levels.dedup();

        let mut tail_metrics = Vec::with_capacity(levels.len());
        for level in levels {
            let var = historical_var(returns, level)?;
            let es = expected_shortfall(returns, level, EsMethod::Historical)?;
            if es.tail_observations == 0 {
                warnings.push(MetricWarning::EmptyTail { level });
            }
            tail_metrics.push(TailRiskAtLevel {
                level,
                var,
                expected_shortfall: es.value,
            });
        }

        let max_drawdown = max_drawdown(returns);

        let negative: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside_deviation = if negative.is_empty() {
            0.0
        } else {
            stats::std_dev(&negative)
        };

        let excess = mean_return - self.risk_free_rate;
        let sharpe_ratio = ratio_or_default(excess, volatility, "sharpe_ratio", &mut warnings);
        let sortino_ratio =
            ratio_or_default(excess, downside_deviation, "sortino_ratio", &mut warnings);
        let calmar_ratio =
            ratio_or_default(mean_return, max_drawdown, "calmar_ratio", &mut warnings);
        let risk_adjusted_return =
            ratio_or_default(mean_return, volatility, "risk_adjusted_return", &mut warnings);

        let probability_of_loss = negative.len() as f64 / returns.len() as f64;

        let tail_risk = {
            let mut sorted = returns.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let count = ((returns.len() as f64 * TAIL_SHARE) as usize).max(1);
            stats::mean(&sorted[..count]).abs()
        };

        let (upside_capture, downside_capture) =
            capture_ratios(returns, benchmark, &mut warnings);

        Ok(RiskMetricSet {
            tail_metrics,
            volatility,
            expected_return: mean_return,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            skewness,
            kurtosis,
            max_drawdown,
            downside_deviation,
            probability_of_loss,
            tail_risk,
            upside_capture,
            downside_capture,
            risk_adjusted_return,
            warnings,
        })
    }
}

/// Maximum drawdown of the cumulative return path, as a magnitude.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut running_max = 1.0_f64;
    let mut worst = 0.0_f64;
    for &r in returns {
        cumulative *= 1.0 + r;
        running_max = running_max.max(cumulative);
        let drawdown = (cumulative - running_max) / running_max;
        worst = worst.min(drawdown);
    }
    worst.abs()
}

/// Divide, defaulting to 0 on a zero denominator with an explicit warning.
fn ratio_or_default(
    numerator: f64,
    denominator: f64,
    metric: &str,
    warnings: &mut Vec<MetricWarning>,
) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        warn!(metric, "zero denominator, ratio defaulted to 0");
        warnings.push(MetricWarning::ZeroDenominator {
            metric: metric.to_string(),
        });
        0.0
    }
}

/// Upside/downside capture against a benchmark; both default to 1.
fn capture_ratios(
    returns: &[f64],
    benchmark: Option<&[f64]>,
    warnings: &mut Vec<MetricWarning>,
) -> (f64, f64) {
    let Some(bench) = benchmark else {
        return (1.0, 1.0);
    };

    let mut upside = 1.0;
    let mut downside = 1.0;

    let up: Vec<usize> = (0..bench.len()).filter(|&i| bench[i] > 0.0).collect();
    if !up.is_empty() {
        let bench_mean = stats::mean(&up.iter().map(|&i| bench[i]).collect::<Vec<_>>());
        let ret_mean = stats::mean(&up.iter().map(|&i| returns[i]).collect::<Vec<_>>());
        upside = ratio_signed(ret_mean, bench_mean, "upside_capture", warnings);
    }

    let down: Vec<usize> = (0..bench.len()).filter(|&i| bench[i] < 0.0).collect();
    if !down.is_empty() {
        let bench_mean = stats::mean(&down.iter().map(|&i| bench[i]).collect::<Vec<_>>());
        let ret_mean = stats::mean(&down.iter().map(|&i| returns[i]).collect::<Vec<_>>());
        downside = ratio_signed(ret_mean, bench_mean, "downside_capture", warnings);
    }

    (upside, downside)
}

/// Signed ratio used by the capture metrics, defaulting to 1 on a zero
/// denominator (a flat benchmark side carries no information).
fn ratio_signed(
    numerator: f64,
    denominator: f64,
    metric: &str,
    warnings: &mut Vec<MetricWarning>,
) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        warnings.push(MetricWarning::ZeroDenominator {
            metric: metric.to_string(),
        });
        1.0
    }
}
