//! Portfolio-level risk metrics from weighted asset return series.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use risk_core::stats;
use risk_core::types::ConfidenceLevel;

use crate::error::MetricsError;
use crate::metrics::MetricWarning;
use crate::var::{expected_shortfall, historical_var, EsMethod};

/// Portfolio-level risk metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskMetrics {
    /// Portfolio VaR at 95%.
    pub var_95: f64,
    /// Portfolio VaR at 99%.
    pub var_99: f64,
    /// Portfolio expected shortfall at 95%.
    pub expected_shortfall_95: f64,
    /// Marginal VaR per asset: correlation with the portfolio times asset
    /// volatility times portfolio VaR.
    pub marginal_var: BTreeMap<String, f64>,
    /// Component VaR per asset: marginal VaR weighted by allocation.
    pub component_var: BTreeMap<String, f64>,
    /// Weighted average asset volatility over portfolio volatility.
    pub diversification_ratio: f64,
    /// Herfindahl index of the weights.
    pub concentration: f64,
    /// Average absolute pairwise correlation between assets.
    pub correlation_risk: f64,
    /// Population standard deviation of the portfolio return series.
    pub portfolio_volatility: f64,
    /// Defaulted computations, if any.
    pub warnings: Vec<MetricWarning>,
}

/// A deterministic shock applied to a return series for stressed VaR.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnShock {
    /// Scale returns' deviation from their mean by this factor.
    pub volatility_multiplier: Option<f64>,
    /// Additive shift applied to every return.
    pub return_shift: Option<f64>,
}

/// VaR of a return series under a named shock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressedVar {
    /// Shock name.
    pub name: String,
    /// VaR after the shock was applied.
    pub var: f64,
}

/// Weighted portfolio return series from per-asset series.
///
/// # Errors
///
/// [`MetricsError::InvalidInput`] if the key sets differ, any series is
/// empty, or the series lengths disagree.
pub fn portfolio_returns(
    asset_returns: &BTreeMap<String, Vec<f64>>,
    weights: &BTreeMap<String, f64>,
) -> Result<Vec<f64>, MetricsError> {
    if asset_returns.is_empty() {
        return Err(MetricsError::InvalidInput(
            "asset returns are required".to_string(),
        ));
    }
    if asset_returns.keys().ne(weights.keys()) {
        return Err(MetricsError::InvalidInput(
            "asset returns and weights must have the same keys".to_string(),
        ));
    }

    let len = asset_returns.values().next().map(Vec::len).unwrap_or(0);
    if len == 0 {
        return Err(MetricsError::InvalidInput(
            "asset return series cannot be empty".to_string(),
        ));
    }
    for (asset, series) in asset_returns {
        if series.len() != len {
            return Err(MetricsError::InvalidInput(format!(
                "return series for {} has length {}, expected {}",
                asset,
                series.len(),
                len
            )));
        }
    }

    let mut portfolio = vec![0.0_f64; len];
    for (asset, series) in asset_returns {
        let w = weights[asset];
        for (p, r) in portfolio.iter_mut().zip(series.iter()) {
            *p += w * r;
        }
    }
    Ok(portfolio)
}

/// Portfolio-level risk metrics from per-asset series and weights.
pub fn portfolio_risk_metrics(
    asset_returns: &BTreeMap<String, Vec<f64>>,
    weights: &BTreeMap<String, f64>,
) -> Result<PortfolioRiskMetrics, MetricsError> {
    let portfolio = portfolio_returns(asset_returns, weights)?;

    let var_95 = historical_var(&portfolio, ConfidenceLevel::C95)?;
    let var_99 = historical_var(&portfolio, ConfidenceLevel::C99)?;
    let es = expected_shortfall(&portfolio, ConfidenceLevel::C95, EsMethod::Historical)?;

    let mut warnings = Vec::new();
    if es.tail_observations == 0 {
        warnings.push(MetricWarning::EmptyTail {
            level: ConfidenceLevel::C95,
        });
    }

    let portfolio_volatility = stats::std_dev(&portfolio);

    let mut marginal_var = BTreeMap::new();
    let mut component_var = BTreeMap::new();
    for (asset, series) in asset_returns {
        let correlation = stats::correlation(series, &portfolio);
        let marginal = correlation * stats::std_dev(series) * var_95;
        marginal_var.insert(asset.clone(), marginal);
        component_var.insert(asset.clone(), marginal * weights[asset]);
    }

    let weighted_avg_vol: f64 = asset_returns
        .iter()
        .map(|(asset, series)| weights[asset] * stats::std_dev(series))
        .sum();
    let diversification_ratio = if portfolio_volatility > 0.0 {
        weighted_avg_vol / portfolio_volatility
    } else {
        warnings.push(MetricWarning::ZeroDenominator {
            metric: "diversification_ratio".to_string(),
        });
        1.0
    };

    let concentration = weights.values().map(|w| w * w).sum();

    let correlation_risk = average_absolute_correlation(asset_returns);

    Ok(PortfolioRiskMetrics {
        var_95,
        var_99,
        expected_shortfall_95: es.value,
        marginal_var,
        component_var,
        diversification_ratio,
        concentration,
        correlation_risk,
        portfolio_volatility,
        warnings,
    })
}

/// Beta of an asset or portfolio against a market series.
///
/// # Errors
///
/// [`MetricsError::InvalidInput`] on length mismatch or fewer than two
/// observations; a zero-variance market is a
/// [`MetricsError::Numerical`] error rather than a silent 1.
pub fn portfolio_beta(returns: &[f64], market_returns: &[f64]) -> Result<f64, MetricsError> {
    if returns.len() != market_returns.len() || returns.len() < 2 {
        return Err(MetricsError::InvalidInput(
            "beta requires two equal-length series of at least 2 observations".to_string(),
        ));
    }
    let market_variance = stats::variance(market_returns);
    if market_variance == 0.0 {
        return Err(MetricsError::Numerical(
            "market return variance is zero".to_string(),
        ));
    }
    Ok(stats::covariance(returns, market_returns) / market_variance)
}

/// VaR of a return series under each of a set of deterministic shocks.
///
/// The base case is always included first under the name `"base_case"`.
pub fn stressed_var(
    returns: &[f64],
    shocks: &[(String, ReturnShock)],
    level: ConfidenceLevel,
) -> Result<Vec<StressedVar>, MetricsError> {
    let base = historical_var(returns, level)?;
    let mut results = vec![StressedVar {
        name: "base_case".to_string(),
        var: base,
    }];

    let mean = stats::mean(returns);
    for (name, shock) in shocks {
        let mut shocked: Vec<f64> = returns.to_vec();
        if let Some(multiplier) = shock.volatility_multiplier {
            for r in shocked.iter_mut() {
                *r = mean + (*r - mean) * multiplier;
            }
        }
        if let Some(shift) = shock.return_shift {
            for r in shocked.iter_mut() {
                *r += shift;
            }
        }
        results.push(StressedVar {
            name: name.clone(),
            var: historical_var(&shocked, level)?,
        });
    }
    Ok(results)
}

/// Average absolute pairwise correlation between the asset series.
fn average_absolute_correlation(asset_returns: &BTreeMap<String, Vec<f64>>) -> f64 {
    let series: Vec<&Vec<f64>> = asset_returns.values().collect();
    if series.len() < 2 {
        return 0.0;
    }
    let mut correlations = Vec::new();
    for i in 0..series.len() {
        for j in (i + 1)..series.len() {
            let corr = stats::correlation(series[i], series[j]);
            if corr.is_finite() {
                correlations.push(corr.abs());
            }
        }
    }
    if correlations.is_empty() {
        0.0
    } else {
        stats::mean(&correlations)
    }
}
