//! Value-at-Risk and expected shortfall calculators.
//!
//! Three methodologies, selected by the caller:
//! - **Historical**: empirical percentile of the observed return series
//! - **Parametric**: closed-form normal or Student-t quantile
//! - **Monte Carlo**: empirical percentile of a simulated return set
//!
//! VaR is the loss magnitude not exceeded at the given confidence level,
//! reported as a non-negative number: `max(0, -quantile)`. An all-gain
//! sample therefore has VaR 0 rather than a spurious positive "loss".

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal, StudentsT};

use risk_core::stats::percentile;
use risk_core::types::{ConfidenceLevel, InsufficientDataError};

use crate::error::MetricsError;

/// Tail distribution for parametric VaR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailDistribution {
    /// Standard normal quantile.
    Normal,
    /// Student-t quantile; fatter tails give more conservative estimates.
    StudentT {
        /// Degrees of freedom (> 0). 6 is a common default for daily returns.
        degrees_of_freedom: f64,
    },
}

/// Method for the expected shortfall calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsMethod {
    /// Conditional mean of the empirical tail.
    Historical,
    /// Closed form under a normal assumption.
    ParametricNormal,
}

/// Expected shortfall with its supporting tail count.
///
/// `tail_observations == 0` means the empirical tail beyond the VaR
/// threshold was empty and the estimate fell back to the VaR itself —
/// callers surface that as a warning rather than hiding it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EsEstimate {
    /// Expected shortfall magnitude.
    pub value: f64,
    /// Number of observations at or beyond the VaR threshold.
    pub tail_observations: usize,
}

fn standard_normal() -> Result<Normal, MetricsError> {
    Normal::new(0.0, 1.0).map_err(|e| MetricsError::Numerical(e.to_string()))
}

/// Historical (empirical percentile) VaR.
///
/// # Errors
///
/// [`MetricsError::InsufficientData`] on an empty series.
pub fn historical_var(returns: &[f64], level: ConfidenceLevel) -> Result<f64, MetricsError> {
    if returns.is_empty() {
        return Err(InsufficientDataError { got: 0, need: 1 }.into());
    }
    let quantile = percentile(returns, level.tail() * 100.0);
    Ok((-quantile).max(0.0))
}

/// Monte Carlo VaR: empirical percentile of simulated returns.
///
/// Identical mechanics to [`historical_var`]; kept distinct so call sites
/// read as the methodology they use.
pub fn monte_carlo_var(
    simulated_returns: &[f64],
    level: ConfidenceLevel,
) -> Result<f64, MetricsError> {
    historical_var(simulated_returns, level)
}

/// Parametric VaR from mean and volatility, scaled to a time horizon.
///
/// # Errors
///
/// [`MetricsError::InvalidInput`] for negative volatility, a non-positive
/// horizon, or non-positive degrees of freedom.
pub fn parametric_var(
    mean_return: f64,
    volatility: f64,
    level: ConfidenceLevel,
    time_horizon: f64,
    distribution: TailDistribution,
) -> Result<f64, MetricsError> {
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(MetricsError::InvalidInput(format!(
            "volatility must be non-negative, got {}",
            volatility
        )));
    }
    if !time_horizon.is_finite() || time_horizon <= 0.0 {
        return Err(MetricsError::InvalidInput(format!(
            "time horizon must be positive, got {}",
            time_horizon
        )));
    }

    let horizon_mean = mean_return * time_horizon;
    let horizon_vol = volatility * time_horizon.sqrt();

    let quantile = match distribution {
        TailDistribution::Normal => standard_normal()?.inverse_cdf(level.tail()),
        TailDistribution::StudentT { degrees_of_freedom } => {
            if degrees_of_freedom <= 0.0 {
                return Err(MetricsError::InvalidInput(format!(
                    "degrees of freedom must be positive, got {}",
                    degrees_of_freedom
                )));
            }
            StudentsT::new(0.0, 1.0, degrees_of_freedom)
                .map_err(|e| MetricsError::Numerical(e.to_string()))?
                .inverse_cdf(level.tail())
        }
    };

    Ok((-(horizon_mean + quantile * horizon_vol)).max(0.0))
}

/// Expected shortfall: mean loss conditional on exceeding the VaR threshold.
///
/// The historical method averages observations at or beyond `-VaR`; if the
/// tail is empty the estimate equals the VaR and `tail_observations` is 0.
/// The parametric method uses the normal closed form
/// `ES = -(mu - sigma * phi(z) / (1 - q))`.
pub fn expected_shortfall(
    returns: &[f64],
    level: ConfidenceLevel,
    method: EsMethod,
) -> Result<EsEstimate, MetricsError> {
    if returns.is_empty() {
        return Err(InsufficientDataError { got: 0, need: 1 }.into());
    }

    match method {
        EsMethod::Historical => {
            let var = historical_var(returns, level)?;
            let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= -var).collect();
            if tail.is_empty() {
                Ok(EsEstimate {
                    value: var,
                    tail_observations: 0,
                })
            } else {
                Ok(EsEstimate {
                    value: risk_core::stats::mean(&tail).abs(),
                    tail_observations: tail.len(),
                })
            }
        }
        EsMethod::ParametricNormal => {
            let mean = risk_core::stats::mean(returns);
            let vol = risk_core::stats::std_dev(returns);
            let normal = standard_normal()?;
            let z = normal.inverse_cdf(level.tail());
            let es = -(mean - vol * normal.pdf(z) / level.tail());
            Ok(EsEstimate {
                value: es.max(0.0),
                tail_observations: returns.len(),
            })
        }
    }
}
