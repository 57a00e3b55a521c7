//! Correlation matrix estimation.
//!
//! Three estimation methods over per-asset return series:
//!
//! - **Historical**: pairwise Pearson correlation over the full sample
//! - **Exponentially weighted**: RiskMetrics-style decay weighting, so
//!   recent observations dominate the estimate
//! - **Shrinkage**: Ledoit–Wolf-style blend of the sample matrix with a
//!   structured target (identity or constant correlation)
//!
//! Every returned matrix satisfies the correlation invariants: symmetric,
//! unit diagonal, no eigenvalue below `-1e-8`. Estimates that violate the
//! eigenvalue floor are repaired by clipping the spectrum and rescaling to
//! unit diagonal; the repair is recorded on the result.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use risk_core::types::InsufficientDataError;

use crate::error::CorrelationError;

/// Eigenvalue floor below which an estimate is regularised.
const PSD_TOLERANCE: f64 = -1e-8;
/// Floor the clipped eigenvalues are raised to.
const EIGENVALUE_FLOOR: f64 = 1e-10;

/// Shrinkage target structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkageTarget {
    /// Identity matrix (no cross-correlation).
    Identity,
    /// Constant off-diagonal correlation at the sample average.
    ConstantCorrelation,
}

/// Correlation estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Pairwise Pearson correlation over the full sample.
    Historical,
    /// Exponentially weighted correlation with decay factor in (0, 1).
    ExponentialWeighted {
        /// Decay factor lambda; 0.94 is the classic daily RiskMetrics value.
        decay: f64,
    },
    /// Ledoit–Wolf-style shrinkage toward a structured target.
    Shrinkage {
        /// Target the sample matrix is blended toward.
        target: ShrinkageTarget,
    },
}

/// Record of a positive-semi-definiteness repair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularisationReport {
    /// How many eigenvalues were below the floor and got clipped.
    pub clipped_eigenvalues: usize,
    /// Minimum eigenvalue of the raw estimate.
    pub min_eigenvalue_before: f64,
}

/// A correlation matrix with estimation metadata.
///
/// Invariants (enforced at construction): square, symmetric, unit
/// diagonal, eigenvalues >= `-1e-8`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    matrix: DMatrix<f64>,
    /// Asset identifiers, in matrix row/column order.
    pub asset_ids: Vec<String>,
    /// How the matrix was estimated.
    pub method: CorrelationMethod,
    /// Number of return observations used.
    pub observations: usize,
    /// Eigenvalues of the final matrix, ascending.
    pub eigenvalues: Vec<f64>,
    /// Largest over smallest eigenvalue (floored at 1e-10).
    pub condition_number: f64,
    /// Whether the *raw* estimate already satisfied the eigenvalue floor.
    pub is_positive_semi_definite: bool,
    /// Present when the raw estimate was repaired.
    pub regularisation: Option<RegularisationReport>,
}

impl CorrelationMatrix {
    /// Build a correlation matrix from a raw estimate, running diagnostics
    /// and regularising if the eigenvalue floor is violated.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::InvalidInput`] if the matrix is not square, the
    /// identifier count mismatches, the diagonal is not 1, or any entry is
    /// outside `[-1, 1]` (beyond rounding error).
    pub fn from_estimate(
        mut matrix: DMatrix<f64>,
        asset_ids: Vec<String>,
        method: CorrelationMethod,
        observations: usize,
    ) -> Result<Self, CorrelationError> {
        let n = asset_ids.len();
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(CorrelationError::InvalidInput(format!(
                "matrix is {}x{} but there are {} asset identifiers",
                matrix.nrows(),
                matrix.ncols(),
                n
            )));
        }
        for i in 0..n {
            if (matrix[(i, i)] - 1.0).abs() > 1e-8 {
                return Err(CorrelationError::InvalidInput(format!(
                    "diagonal element {} is {}, expected 1",
                    i,
                    matrix[(i, i)]
                )));
            }
            matrix[(i, i)] = 1.0;
            for j in (i + 1)..n {
                let avg = 0.5 * (matrix[(i, j)] + matrix[(j, i)]);
                if avg.abs() > 1.0 + 1e-8 {
                    return Err(CorrelationError::InvalidInput(format!(
                        "correlation ({}, {}) = {} outside [-1, 1]",
                        i, j, avg
                    )));
                }
                // Exact symmetry; clamp rounding spill past +/-1
                let clamped = avg.clamp(-1.0, 1.0);
                matrix[(i, j)] = clamped;
                matrix[(j, i)] = clamped;
            }
        }

        let raw_eigenvalues = sorted_eigenvalues(&matrix);
        let min_eig = raw_eigenvalues.first().copied().unwrap_or(1.0);
        let is_psd = min_eig >= PSD_TOLERANCE;

        let (matrix, eigenvalues, regularisation) = if is_psd {
            (matrix, raw_eigenvalues, None)
        } else {
            let clipped = raw_eigenvalues.iter().filter(|&&e| e < EIGENVALUE_FLOOR).count();
            warn!(
                min_eigenvalue = min_eig,
                clipped, "correlation estimate not PSD, clipping spectrum"
            );
            let repaired = clip_spectrum(&matrix)?;
            let eigenvalues = sorted_eigenvalues(&repaired);
            (
                repaired,
                eigenvalues,
                Some(RegularisationReport {
                    clipped_eigenvalues: clipped,
                    min_eigenvalue_before: min_eig,
                }),
            )
        };

        let max_eig = eigenvalues.last().copied().unwrap_or(1.0);
        let min_eig_final = eigenvalues.first().copied().unwrap_or(1.0);
        let condition_number = max_eig / min_eig_final.max(1e-10);

        Ok(Self {
            matrix,
            asset_ids,
            method,
            observations,
            eigenvalues,
            condition_number,
            is_positive_semi_definite: is_psd,
            regularisation,
        })
    }

    /// The matrix itself.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Number of assets.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.asset_ids.len()
    }

    /// Covariance matrix implied by this correlation and per-asset
    /// volatilities: `cov_ij = corr_ij * vol_i * vol_j`.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::InvalidInput`] on a length mismatch or a
    /// negative volatility.
    pub fn covariance(&self, volatilities: &[f64]) -> Result<DMatrix<f64>, CorrelationError> {
        let n = self.dimension();
        if volatilities.len() != n {
            return Err(CorrelationError::InvalidInput(format!(
                "{} volatilities supplied for {} assets",
                volatilities.len(),
                n
            )));
        }
        if let Some(&bad) = volatilities.iter().find(|&&v| !v.is_finite() || v < 0.0) {
            return Err(CorrelationError::InvalidInput(format!(
                "volatilities must be non-negative and finite, got {}",
                bad
            )));
        }
        let mut cov = self.matrix.clone();
        for i in 0..n {
            for j in 0..n {
                cov[(i, j)] *= volatilities[i] * volatilities[j];
            }
        }
        Ok(cov)
    }
}

/// Estimate a correlation matrix from per-asset return series.
///
/// All series must have the same length with at least two observations.
///
/// # Errors
///
/// - [`CorrelationError::InvalidInput`] on empty input, mismatched
///   lengths, or a decay factor outside (0, 1)
/// - [`CorrelationError::InsufficientData`] on series shorter than 2
pub fn estimate_correlation(
    returns_by_asset: &BTreeMap<String, Vec<f64>>,
    method: CorrelationMethod,
) -> Result<CorrelationMatrix, CorrelationError> {
    if returns_by_asset.is_empty() {
        return Err(CorrelationError::InvalidInput(
            "at least one asset series is required".to_string(),
        ));
    }
    let asset_ids: Vec<String> = returns_by_asset.keys().cloned().collect();
    let series: Vec<&Vec<f64>> = returns_by_asset.values().collect();

    let n_obs = series[0].len();
    if n_obs < 2 {
        return Err(InsufficientDataError {
            got: n_obs,
            need: 2,
        }
        .into());
    }
    for (id, s) in asset_ids.iter().zip(series.iter()) {
        if s.len() != n_obs {
            return Err(CorrelationError::InvalidInput(format!(
                "series for {} has length {}, expected {}",
                id,
                s.len(),
                n_obs
            )));
        }
    }

    let matrix = match method {
        CorrelationMethod::Historical => pearson_matrix(&series),
        CorrelationMethod::ExponentialWeighted { decay } => {
            if !(0.0..1.0).contains(&decay) || decay <= 0.0 {
                return Err(CorrelationError::InvalidInput(format!(
                    "decay factor must be in (0, 1), got {}",
                    decay
                )));
            }
            ewma_matrix(&series, decay)
        }
        CorrelationMethod::Shrinkage { target } => {
            let sample = pearson_matrix(&series);
            shrink(&sample, target, asset_ids.len(), n_obs)
        }
    };

    CorrelationMatrix::from_estimate(matrix, asset_ids, method, n_obs)
}

/// Pairwise Pearson correlation matrix.
fn pearson_matrix(series: &[&Vec<f64>]) -> DMatrix<f64> {
    let n = series.len();
    let mut matrix = DMatrix::identity(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let corr = risk_core::stats::correlation(series[i], series[j]);
            matrix[(i, j)] = corr;
            matrix[(j, i)] = corr;
        }
    }
    matrix
}

/// Exponentially weighted correlation matrix.
///
/// Observation `t` (0-based, oldest first) carries weight
/// `(1 - lambda) * lambda^(T - 1 - t)`, normalised to sum to 1; the
/// weighted covariance is computed around the weighted means and then
/// rescaled to a correlation.
fn ewma_matrix(series: &[&Vec<f64>], decay: f64) -> DMatrix<f64> {
    let n = series.len();
    let t_len = series[0].len();

    let mut weights: Vec<f64> = (0..t_len)
        .map(|t| (1.0 - decay) * decay.powi((t_len - 1 - t) as i32))
        .collect();
    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total;
    }

    let means: Vec<f64> = series
        .iter()
        .map(|s| s.iter().zip(&weights).map(|(r, w)| r * w).sum())
        .collect();

    let mut cov = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let c: f64 = (0..t_len)
                .map(|t| weights[t] * (series[i][t] - means[i]) * (series[j][t] - means[j]))
                .sum();
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }

    let mut matrix = DMatrix::identity(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let denom = (cov[(i, i)] * cov[(j, j)]).sqrt();
            let corr = if denom > 0.0 { cov[(i, j)] / denom } else { 0.0 };
            matrix[(i, j)] = corr;
            matrix[(j, i)] = corr;
        }
    }
    matrix
}

/// Blend the sample matrix toward the target with intensity
/// `min(1, (n_assets + 1) / n_obs)`.
fn shrink(sample: &DMatrix<f64>, target: ShrinkageTarget, n_assets: usize, n_obs: usize) -> DMatrix<f64> {
    let target_matrix = match target {
        ShrinkageTarget::Identity => DMatrix::identity(n_assets, n_assets),
        ShrinkageTarget::ConstantCorrelation => {
            let mut sum = 0.0;
            let mut count = 0usize;
            for i in 0..n_assets {
                for j in 0..n_assets {
                    if i != j {
                        sum += sample[(i, j)];
                        count += 1;
                    }
                }
            }
            let avg = if count > 0 { sum / count as f64 } else { 0.0 };
            let mut t = DMatrix::from_element(n_assets, n_assets, avg);
            t.fill_diagonal(1.0);
            t
        }
    };

    let intensity = ((n_assets as f64 + 1.0) / n_obs as f64).min(1.0);
    sample * (1.0 - intensity) + target_matrix * intensity
}

/// Eigenvalues of a symmetric matrix, ascending.
fn sorted_eigenvalues(matrix: &DMatrix<f64>) -> Vec<f64> {
    let mut eigenvalues: Vec<f64> = matrix
        .clone()
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .copied()
        .collect();
    eigenvalues.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    eigenvalues
}

/// Clip the spectrum at the eigenvalue floor, reconstruct, and rescale to
/// unit diagonal.
fn clip_spectrum(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, CorrelationError> {
    let eigen = matrix.clone().symmetric_eigen();
    let clipped = eigen.eigenvalues.map(|e| e.max(EIGENVALUE_FLOOR));
    let q = &eigen.eigenvectors;
    let reconstructed = q * DMatrix::from_diagonal(&clipped) * q.transpose();

    let n = matrix.nrows();
    let mut repaired = reconstructed;
    let diag: Vec<f64> = (0..n).map(|i| repaired[(i, i)]).collect();
    if diag.iter().any(|&d| d <= 0.0 || !d.is_finite()) {
        return Err(CorrelationError::Numerical(
            "spectrum clipping produced a non-positive diagonal".to_string(),
        ));
    }
    for i in 0..n {
        for j in 0..n {
            repaired[(i, j)] /= (diag[i] * diag[j]).sqrt();
        }
        repaired[(i, i)] = 1.0;
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series_map(entries: &[(&str, Vec<f64>)]) -> BTreeMap<String, Vec<f64>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn three_asset_sample(n: usize) -> BTreeMap<String, Vec<f64>> {
        let base: Vec<f64> = (0..n).map(|i| ((i as f64) * 0.61).sin() * 0.02).collect();
        let second: Vec<f64> = base
            .iter()
            .enumerate()
            .map(|(i, b)| 0.7 * b + 0.01 * ((i as f64) * 1.37).cos())
            .collect();
        let third: Vec<f64> = (0..n).map(|i| ((i as f64) * 2.23).cos() * 0.015).collect();
        series_map(&[("alpha", base), ("beta", second), ("gamma", third)])
    }

    #[test]
    fn test_historical_matrix_invariants() {
        let returns = three_asset_sample(250);
        let corr = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();

        let m = corr.matrix();
        assert_eq!(corr.dimension(), 3);
        for i in 0..3 {
            assert_relative_eq!(m[(i, i)], 1.0, epsilon = 1e-12);
            for j in 0..3 {
                assert_relative_eq!(m[(i, j)], m[(j, i)], epsilon = 1e-12);
                assert!(m[(i, j)].abs() <= 1.0 + 1e-12);
            }
        }
        assert!(corr.eigenvalues.iter().all(|&e| e >= -1e-8));
        assert!(corr.is_positive_semi_definite);
        assert!(corr.regularisation.is_none());
        assert_eq!(corr.observations, 250);
    }

    #[test]
    fn test_historical_perfectly_correlated_pair() {
        let base: Vec<f64> = (0..100).map(|i| ((i as f64) * 0.5).sin()).collect();
        let scaled: Vec<f64> = base.iter().map(|r| 3.0 * r).collect();
        let returns = series_map(&[("a", base), ("b", scaled)]);

        let corr = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        assert_relative_eq!(corr.matrix()[(0, 1)], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_input_is_error() {
        let result = estimate_correlation(&BTreeMap::new(), CorrelationMethod::Historical);
        assert!(matches!(result, Err(CorrelationError::InvalidInput(_))));
    }

    #[test]
    fn test_short_series_is_error() {
        let returns = series_map(&[("a", vec![0.01]), ("b", vec![0.02])]);
        let result = estimate_correlation(&returns, CorrelationMethod::Historical);
        assert!(matches!(result, Err(CorrelationError::InsufficientData(_))));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let returns = series_map(&[("a", vec![0.01, 0.02]), ("b", vec![0.02])]);
        let result = estimate_correlation(&returns, CorrelationMethod::Historical);
        assert!(matches!(result, Err(CorrelationError::InvalidInput(_))));
    }

    #[test]
    fn test_ewma_rejects_bad_decay() {
        let returns = three_asset_sample(50);
        for decay in [0.0, 1.0, 1.5, -0.1] {
            let result =
                estimate_correlation(&returns, CorrelationMethod::ExponentialWeighted { decay });
            assert!(result.is_err(), "decay {} should be rejected", decay);
        }
    }

    #[test]
    fn test_ewma_matrix_invariants() {
        let returns = three_asset_sample(250);
        let corr = estimate_correlation(
            &returns,
            CorrelationMethod::ExponentialWeighted { decay: 0.94 },
        )
        .unwrap();
        assert!(corr.eigenvalues.iter().all(|&e| e >= -1e-8));
        for i in 0..3 {
            assert_relative_eq!(corr.matrix()[(i, i)], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ewma_tracks_recent_regime() {
        // First half uncorrelated, second half identical: EWMA with strong
        // decay should report far higher correlation than the full-sample
        // historical estimate.
        let mut a = Vec::new();
        let mut b = Vec::new();
        for i in 0..200 {
            let x = ((i as f64) * 0.61).sin() * 0.02;
            let y = ((i as f64) * 1.97).cos() * 0.02;
            if i < 100 {
                a.push(x);
                b.push(y);
            } else {
                a.push(x);
                b.push(x);
            }
        }
        let returns = series_map(&[("a", a), ("b", b)]);

        let hist = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        let ewma = estimate_correlation(
            &returns,
            CorrelationMethod::ExponentialWeighted { decay: 0.9 },
        )
        .unwrap();
        assert!(
            ewma.matrix()[(0, 1)] > hist.matrix()[(0, 1)] + 0.1,
            "ewma {} should exceed historical {}",
            ewma.matrix()[(0, 1)],
            hist.matrix()[(0, 1)]
        );
        assert!(ewma.matrix()[(0, 1)] > 0.9);
    }

    #[test]
    fn test_shrinkage_pulls_toward_identity() {
        let returns = three_asset_sample(40);
        let sample = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        let shrunk = estimate_correlation(
            &returns,
            CorrelationMethod::Shrinkage {
                target: ShrinkageTarget::Identity,
            },
        )
        .unwrap();

        // Off-diagonals move toward zero
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert!(
                        shrunk.matrix()[(i, j)].abs() <= sample.matrix()[(i, j)].abs() + 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_shrinkage_intensity_saturates_on_tiny_samples() {
        // n_obs = 2 < n_assets + 1 so intensity caps at 1: full identity
        let returns = series_map(&[
            ("a", vec![0.01, -0.02]),
            ("b", vec![0.02, 0.01]),
            ("c", vec![-0.01, 0.015]),
        ]);
        let shrunk = estimate_correlation(
            &returns,
            CorrelationMethod::Shrinkage {
                target: ShrinkageTarget::Identity,
            },
        )
        .unwrap();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert_relative_eq!(shrunk.matrix()[(i, j)], 0.0, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_constant_correlation_target() {
        let returns = three_asset_sample(40);
        let shrunk = estimate_correlation(
            &returns,
            CorrelationMethod::Shrinkage {
                target: ShrinkageTarget::ConstantCorrelation,
            },
        );
        assert!(shrunk.is_ok());
    }

    #[test]
    fn test_regularisation_repairs_non_psd_estimate() {
        // rho(a,b) = rho(a,c) = 0.9 with rho(b,c) = -0.9 is not PSD
        let matrix = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.9, 0.9, 0.9, 1.0, -0.9, 0.9, -0.9, 1.0],
        );
        let corr = CorrelationMatrix::from_estimate(
            matrix,
            vec!["a".into(), "b".into(), "c".into()],
            CorrelationMethod::Historical,
            10,
        )
        .unwrap();

        assert!(!corr.is_positive_semi_definite);
        let report = corr.regularisation.expect("repair must be reported");
        assert!(report.min_eigenvalue_before < -1e-8);
        assert!(report.clipped_eigenvalues >= 1);

        // Repaired matrix satisfies all invariants
        assert!(corr.eigenvalues.iter().all(|&e| e >= -1e-8));
        for i in 0..3 {
            assert_relative_eq!(corr.matrix()[(i, i)], 1.0, epsilon = 1e-9);
            for j in 0..3 {
                assert!(corr.matrix()[(i, j)].abs() <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_from_estimate_rejects_bad_diagonal() {
        let matrix = DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.1, 1.0]);
        let result = CorrelationMatrix::from_estimate(
            matrix,
            vec!["a".into(), "b".into()],
            CorrelationMethod::Historical,
            10,
        );
        assert!(matches!(result, Err(CorrelationError::InvalidInput(_))));
    }

    #[test]
    fn test_covariance_from_correlation() {
        let returns = three_asset_sample(100);
        let corr = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        let vols = [0.2, 0.1, 0.3];
        let cov = corr.covariance(&vols).unwrap();

        for i in 0..3 {
            assert_relative_eq!(cov[(i, i)], vols[i] * vols[i], epsilon = 1e-12);
        }
        assert_relative_eq!(
            cov[(0, 1)],
            corr.matrix()[(0, 1)] * 0.2 * 0.1,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_covariance_rejects_bad_volatilities() {
        let returns = three_asset_sample(100);
        let corr = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        assert!(corr.covariance(&[0.2, 0.1]).is_err());
        assert!(corr.covariance(&[0.2, -0.1, 0.3]).is_err());
    }

    #[test]
    fn test_condition_number_identity_is_one() {
        let returns = series_map(&[("a", vec![0.01, -0.02]), ("b", vec![0.02, 0.01])]);
        let shrunk = estimate_correlation(
            &returns,
            CorrelationMethod::Shrinkage {
                target: ShrinkageTarget::Identity,
            },
        )
        .unwrap();
        // Intensity saturates -> identity -> condition number 1
        assert_relative_eq!(shrunk.condition_number, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_serde_roundtrip() {
        let returns = three_asset_sample(50);
        let corr = estimate_correlation(&returns, CorrelationMethod::Historical).unwrap();
        let json = serde_json::to_string(&corr).unwrap();
        let back: CorrelationMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, corr);
    }
}
