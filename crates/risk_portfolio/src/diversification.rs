//! Diversification diagnostics and portfolio risk decomposition.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::correlation::CorrelationMatrix;
use crate::error::AnalyticsError;

/// Diversification diagnostics for a weighted portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversificationMetrics {
    /// Inverse Herfindahl index of the weights.
    pub effective_number_of_assets: f64,
    /// Weighted average asset volatility over portfolio volatility.
    pub diversification_ratio: f64,
    /// Herfindahl index of the weights.
    pub concentration_ratio: f64,
    /// Total weight per sector (empty when no sector map is supplied).
    pub sector_concentration: BTreeMap<String, f64>,
    /// Fraction of portfolio variance contributed by each asset.
    pub risk_contribution: BTreeMap<String, f64>,
    /// Average absolute off-diagonal correlation.
    pub correlation_risk: f64,
}

/// One asset's contribution to portfolio risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Portfolio weight.
    pub weight: f64,
    /// Marginal contribution to volatility, `(cov w)_i / vol_p`.
    pub marginal: f64,
    /// Component contribution, `w_i * marginal_i`.
    pub component: f64,
    /// Component as a percentage of total volatility.
    pub percentage: f64,
}

/// Full risk decomposition of a weighted portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecomposition {
    /// Expected portfolio return.
    pub expected_return: f64,
    /// Portfolio volatility.
    pub volatility: f64,
    /// Portfolio variance.
    pub variance: f64,
    /// Per-asset contributions.
    pub contributions: BTreeMap<String, RiskContribution>,
}

/// Resolve weights/volatilities maps against the matrix asset order.
///
/// Missing entries default to 0, matching the convention that an asset
/// absent from the weight map simply is not held.
fn aligned(
    map: &BTreeMap<String, f64>,
    correlation: &CorrelationMatrix,
) -> DVector<f64> {
    DVector::from_iterator(
        correlation.dimension(),
        correlation
            .asset_ids
            .iter()
            .map(|id| map.get(id).copied().unwrap_or(0.0)),
    )
}

/// Diversification diagnostics from weights, a correlation matrix, and
/// per-asset volatilities.
///
/// # Errors
///
/// [`AnalyticsError::InvalidInput`] when the weight vector is entirely
/// zero or a volatility is negative.
pub fn diversification_metrics(
    weights: &BTreeMap<String, f64>,
    correlation: &CorrelationMatrix,
    volatilities: &BTreeMap<String, f64>,
    sectors: Option<&BTreeMap<String, String>>,
) -> Result<DiversificationMetrics, AnalyticsError> {
    let w = aligned(weights, correlation);
    let vols = aligned(volatilities, correlation);

    if w.iter().all(|&x| x == 0.0) {
        return Err(AnalyticsError::InvalidInput(
            "weights are all zero".to_string(),
        ));
    }
    if vols.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        return Err(AnalyticsError::InvalidInput(
            "volatilities must be non-negative and finite".to_string(),
        ));
    }

    let herfindahl: f64 = w.iter().map(|&x| x * x).sum();
    let effective_number_of_assets = 1.0 / herfindahl;

    let vol_slice: Vec<f64> = vols.iter().copied().collect();
    let covariance = correlation
        .covariance(&vol_slice)
        .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))?;
    let variance = (&covariance * &w).dot(&w).max(0.0);
    let portfolio_vol = variance.sqrt();

    let weighted_avg_vol: f64 = w.iter().zip(vols.iter()).map(|(wi, vi)| wi * vi).sum();
    let diversification_ratio = if portfolio_vol > 0.0 {
        weighted_avg_vol / portfolio_vol
    } else {
        1.0
    };

    let mut sector_concentration = BTreeMap::new();
    if let Some(sector_map) = sectors {
        for (asset, &weight) in weights {
            let sector = sector_map
                .get(asset)
                .cloned()
                .unwrap_or_else(|| "Other".to_string());
            *sector_concentration.entry(sector).or_insert(0.0) += weight;
        }
    }

    // Variance share per asset: w_i (cov w)_i / variance
    let marginal = &covariance * &w;
    let mut risk_contribution = BTreeMap::new();
    for (i, id) in correlation.asset_ids.iter().enumerate() {
        let share = if variance > 0.0 {
            w[i] * marginal[i] / variance
        } else {
            w[i]
        };
        risk_contribution.insert(id.clone(), share);
    }

    let correlation_risk = average_absolute_off_diagonal(correlation);

    Ok(DiversificationMetrics {
        effective_number_of_assets,
        diversification_ratio,
        concentration_ratio: herfindahl,
        sector_concentration,
        risk_contribution,
        correlation_risk,
    })
}

/// Decompose portfolio risk into marginal and component contributions.
///
/// # Errors
///
/// [`AnalyticsError::Numerical`] when the portfolio volatility is zero
/// (contributions are undefined).
pub fn decompose_risk(
    weights: &BTreeMap<String, f64>,
    correlation: &CorrelationMatrix,
    volatilities: &BTreeMap<String, f64>,
    expected_returns: &BTreeMap<String, f64>,
) -> Result<RiskDecomposition, AnalyticsError> {
    let w = aligned(weights, correlation);
    let vols = aligned(volatilities, correlation);
    let mu = aligned(expected_returns, correlation);

    let vol_slice: Vec<f64> = vols.iter().copied().collect();
    let covariance = correlation
        .covariance(&vol_slice)
        .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))?;

    let expected_return = mu.dot(&w);
    let variance = (&covariance * &w).dot(&w).max(0.0);
    let volatility = variance.sqrt();
    if volatility == 0.0 {
        return Err(AnalyticsError::Numerical(
            "portfolio volatility is zero; risk contributions are undefined".to_string(),
        ));
    }

    let marginal_vector = (&covariance * &w) / volatility;
    let mut contributions = BTreeMap::new();
    for (i, id) in correlation.asset_ids.iter().enumerate() {
        let marginal = marginal_vector[i];
        let component = w[i] * marginal;
        contributions.insert(
            id.clone(),
            RiskContribution {
                weight: w[i],
                marginal,
                component,
                percentage: component / volatility * 100.0,
            },
        );
    }

    Ok(RiskDecomposition {
        expected_return,
        volatility,
        variance,
        contributions,
    })
}

/// Average absolute off-diagonal correlation.
fn average_absolute_off_diagonal(correlation: &CorrelationMatrix) -> f64 {
    let n = correlation.dimension();
    if n < 2 {
        return 0.0;
    }
    let m = correlation.matrix();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += m[(i, j)].abs();
                count += 1;
            }
        }
    }
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationMatrix, CorrelationMethod};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn map(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn identity(ids: &[&str]) -> CorrelationMatrix {
        CorrelationMatrix::from_estimate(
            DMatrix::identity(ids.len(), ids.len()),
            ids.iter().map(|s| s.to_string()).collect(),
            CorrelationMethod::Historical,
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_equal_weights_effective_number() {
        let ids = ["a", "b", "c", "d"];
        let weights = map(&[("a", 0.25), ("b", 0.25), ("c", 0.25), ("d", 0.25)]);
        let vols = map(&[("a", 0.2), ("b", 0.2), ("c", 0.2), ("d", 0.2)]);

        let metrics =
            diversification_metrics(&weights, &identity(&ids), &vols, None).unwrap();
        assert_relative_eq!(metrics.effective_number_of_assets, 4.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.concentration_ratio, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_concentrated_portfolio_low_effective_number() {
        let weights = map(&[("a", 0.97), ("b", 0.01), ("c", 0.01), ("d", 0.01)]);
        let vols = map(&[("a", 0.2), ("b", 0.2), ("c", 0.2), ("d", 0.2)]);

        let metrics =
            diversification_metrics(&weights, &identity(&["a", "b", "c", "d"]), &vols, None)
                .unwrap();
        assert!(metrics.effective_number_of_assets < 1.1);
    }

    #[test]
    fn test_diversification_ratio_identity_two_assets() {
        // Equal weights, equal vols, zero correlation: ratio = sqrt(2)
        let weights = map(&[("a", 0.5), ("b", 0.5)]);
        let vols = map(&[("a", 0.2), ("b", 0.2)]);

        let metrics =
            diversification_metrics(&weights, &identity(&["a", "b"]), &vols, None).unwrap();
        assert_relative_eq!(
            metrics.diversification_ratio,
            2.0_f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_risk_contributions_sum_to_one() {
        let weights = map(&[("a", 0.6), ("b", 0.4)]);
        let vols = map(&[("a", 0.25), ("b", 0.15)]);

        let metrics =
            diversification_metrics(&weights, &identity(&["a", "b"]), &vols, None).unwrap();
        let total: f64 = metrics.risk_contribution.values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sector_concentration_aggregates() {
        let weights = map(&[("a", 0.5), ("b", 0.3), ("c", 0.2)]);
        let vols = map(&[("a", 0.2), ("b", 0.2), ("c", 0.2)]);
        let sectors: BTreeMap<String, String> = [
            ("a".to_string(), "tech".to_string()),
            ("b".to_string(), "tech".to_string()),
        ]
        .into_iter()
        .collect();

        let metrics = diversification_metrics(
            &weights,
            &identity(&["a", "b", "c"]),
            &vols,
            Some(&sectors),
        )
        .unwrap();
        assert_relative_eq!(metrics.sector_concentration["tech"], 0.8, epsilon = 1e-12);
        assert_relative_eq!(metrics.sector_concentration["Other"], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_weights_is_error() {
        let weights = map(&[("a", 0.0), ("b", 0.0)]);
        let vols = map(&[("a", 0.2), ("b", 0.2)]);
        let result = diversification_metrics(&weights, &identity(&["a", "b"]), &vols, None);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn test_decompose_risk_components_sum_to_volatility() {
        let weights = map(&[("a", 0.6), ("b", 0.4)]);
        let vols = map(&[("a", 0.25), ("b", 0.15)]);
        let returns = map(&[("a", 0.1), ("b", 0.05)]);

        let decomposition =
            decompose_risk(&weights, &identity(&["a", "b"]), &vols, &returns).unwrap();

        let component_sum: f64 = decomposition
            .contributions
            .values()
            .map(|c| c.component)
            .sum();
        assert_relative_eq!(component_sum, decomposition.volatility, epsilon = 1e-9);

        let pct_sum: f64 = decomposition
            .contributions
            .values()
            .map(|c| c.percentage)
            .sum();
        assert_relative_eq!(pct_sum, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_decompose_risk_expected_return() {
        let weights = map(&[("a", 0.5), ("b", 0.5)]);
        let vols = map(&[("a", 0.2), ("b", 0.1)]);
        let returns = map(&[("a", 0.1), ("b", 0.06)]);

        let decomposition =
            decompose_risk(&weights, &identity(&["a", "b"]), &vols, &returns).unwrap();
        assert_relative_eq!(decomposition.expected_return, 0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_decompose_risk_zero_volatility_is_error() {
        let weights = map(&[("a", 0.5), ("b", 0.5)]);
        let vols = map(&[("a", 0.0), ("b", 0.0)]);
        let returns = map(&[("a", 0.1), ("b", 0.06)]);

        let result = decompose_risk(&weights, &identity(&["a", "b"]), &vols, &returns);
        assert!(matches!(result, Err(AnalyticsError::Numerical(_))));
    }
}
