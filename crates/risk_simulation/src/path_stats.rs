//! Per-path statistics derived from simulated paths.

use serde::{Deserialize, Serialize};

use crate::result::PathMatrix;

/// Trading days per year used to annualise realised volatility.
const TRADING_DAYS: f64 = 252.0;

/// Statistics computed for each simulated path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStatistics {
    /// Terminal price of each path.
    pub final_prices: Vec<f64>,
    /// Simple return of each path, `S_T / S_0 - 1`.
    pub returns: Vec<f64>,
    /// Log return of each path, `ln(S_T / S_0)`.
    pub log_returns: Vec<f64>,
    /// Maximum drawdown of each path (negative fraction of the running peak).
    pub max_drawdowns: Vec<f64>,
    /// Annualised realised volatility of each path.
    pub realized_volatility: Vec<f64>,
}

impl PathStatistics {
    /// Compute per-path statistics from a path matrix.
    pub fn from_paths(paths: &PathMatrix, initial_price: f64) -> Self {
        let n = paths.num_paths();
        let mut final_prices = Vec::with_capacity(n);
        let mut returns = Vec::with_capacity(n);
        let mut log_returns = Vec::with_capacity(n);
        let mut max_drawdowns = Vec::with_capacity(n);
        let mut realized_volatility = Vec::with_capacity(n);

        for path in paths.iter_paths() {
            let final_price = path[path.len() - 1];
            final_prices.push(final_price);
            returns.push(final_price / initial_price - 1.0);
            log_returns.push((final_price / initial_price).ln());
            max_drawdowns.push(max_drawdown(path));
            realized_volatility.push(realised_vol(path));
        }

        Self {
            final_prices,
            returns,
            log_returns,
            max_drawdowns,
            realized_volatility,
        }
    }
}

/// Worst peak-to-trough drawdown along a path, as a negative fraction.
fn max_drawdown(path: &[f64]) -> f64 {
    let mut running_max = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &price in path {
        running_max = running_max.max(price);
        let drawdown = (price - running_max) / running_max;
        worst = worst.min(drawdown);
    }
    worst
}

/// Annualised standard deviation of a path's log returns.
///
/// Paths with fewer than two return observations report 0.
fn realised_vol(path: &[f64]) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }
    let step_returns: Vec<f64> = path.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    risk_core::stats::std_dev(&step_returns) * TRADING_DAYS.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix(rows: &[&[f64]]) -> PathMatrix {
        let num_points = rows[0].len();
        let data: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        PathMatrix::from_raw(data, rows.len(), num_points)
    }

    #[test]
    fn test_final_prices_and_returns() {
        let paths = matrix(&[&[100.0, 110.0, 121.0], &[100.0, 90.0, 81.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);

        assert_eq!(stats.final_prices, vec![121.0, 81.0]);
        assert_relative_eq!(stats.returns[0], 0.21, epsilon = 1e-12);
        assert_relative_eq!(stats.returns[1], -0.19, epsilon = 1e-12);
        assert_relative_eq!(stats.log_returns[0], (1.21_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_monotone_up_is_zero() {
        let paths = matrix(&[&[100.0, 105.0, 110.0, 120.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);
        assert_eq!(stats.max_drawdowns[0], 0.0);
    }

    #[test]
    fn test_max_drawdown_peak_to_trough() {
        // Peak 120, trough 90: drawdown = (90 - 120) / 120 = -0.25
        let paths = matrix(&[&[100.0, 120.0, 90.0, 110.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);
        assert_relative_eq!(stats.max_drawdowns[0], -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_realised_vol_constant_path_is_zero() {
        let paths = matrix(&[&[100.0, 100.0, 100.0, 100.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);
        assert_eq!(stats.realized_volatility[0], 0.0);
    }

    #[test]
    fn test_realised_vol_short_path_is_zero() {
        let paths = matrix(&[&[100.0, 105.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);
        assert_eq!(stats.realized_volatility[0], 0.0);
    }

    #[test]
    fn test_realised_vol_positive_for_noisy_path() {
        let paths = matrix(&[&[100.0, 104.0, 98.0, 103.0, 97.0, 102.0]]);
        let stats = PathStatistics::from_paths(&paths, 100.0);
        assert!(stats.realized_volatility[0] > 0.0);
    }
}
