//! Simulation result types.

use serde::{Deserialize, Serialize};

use crate::params::SimulationParameters;
use crate::path_stats::PathStatistics;
use risk_core::stats::StatisticalMoments;

/// Contiguous row-major matrix of simulated paths.
///
/// Row `i` is path `i`, with `num_points = time_steps + 1` values starting
/// at the initial price. Contiguous layout keeps the hot loops
/// cache-friendly and makes the whole result a single allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathMatrix {
    data: Vec<f64>,
    num_paths: usize,
    num_points: usize,
}

impl PathMatrix {
    /// Create a matrix from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != num_paths * num_points`; the engine is the
    /// only constructor in practice and always satisfies this.
    pub fn from_raw(data: Vec<f64>, num_paths: usize, num_points: usize) -> Self {
        assert_eq!(data.len(), num_paths * num_points, "path matrix shape mismatch");
        Self {
            data,
            num_paths,
            num_points,
        }
    }

    /// Number of paths (rows).
    #[inline]
    pub fn num_paths(&self) -> usize {
        self.num_paths
    }

    /// Points per path (columns), `time_steps + 1`.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Borrow path `i`.
    #[inline]
    pub fn path(&self, i: usize) -> &[f64] {
        let start = i * self.num_points;
        &self.data[start..start + self.num_points]
    }

    /// Iterate over all paths.
    pub fn iter_paths(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.num_points)
    }

    /// Terminal value of each path.
    pub fn terminal_values(&self) -> Vec<f64> {
        self.iter_paths().map(|p| p[p.len() - 1]).collect()
    }

    /// Raw row-major data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Metadata describing how a simulation was produced.
///
/// Counts and theoretical reference values only; no wall-clock timing, so
/// two runs with the same inputs compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Paths generated.
    pub paths_generated: usize,
    /// Steps per path.
    pub steps_per_path: usize,
    /// Total normal draws consumed.
    pub total_draws: usize,
    /// Whether antithetic pairing was active.
    pub antithetic: bool,
    /// The seed actually used (resolved from entropy when none was given).
    pub seed: u64,
    /// Theoretical expected terminal value `S0 * exp(mu * T)`.
    pub theoretical_expected_terminal: f64,
    /// Theoretical terminal volatility `sigma * sqrt(T)`.
    pub theoretical_volatility: f64,
}

/// Results from a GBM Monte Carlo simulation.
///
/// Owned exclusively by the caller; the engine retains nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// The parameters the simulation was run with.
    pub parameters: SimulationParameters,
    /// Time grid in the configured unit, `time_steps + 1` points.
    pub time_grid: Vec<f64>,
    /// Simulated price paths.
    pub paths: PathMatrix,
    /// Per-path derived statistics.
    pub path_statistics: PathStatistics,
    /// Statistical moments of the terminal price distribution.
    pub terminal_moments: StatisticalMoments,
    /// Generation metadata.
    pub metadata: SimulationMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matrix_accessors() {
        let m = PathMatrix::from_raw(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        assert_eq!(m.num_paths(), 2);
        assert_eq!(m.num_points(), 3);
        assert_eq!(m.path(0), &[1.0, 2.0, 3.0]);
        assert_eq!(m.path(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.terminal_values(), vec![3.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_path_matrix_shape_mismatch_panics() {
        PathMatrix::from_raw(vec![1.0, 2.0, 3.0], 2, 2);
    }

    #[test]
    fn test_iter_paths_count() {
        let m = PathMatrix::from_raw(vec![0.0; 12], 4, 3);
        assert_eq!(m.iter_paths().count(), 4);
    }

    #[test]
    fn test_serde_roundtrip() {
        let m = PathMatrix::from_raw(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let json = serde_json::to_string(&m).unwrap();
        let back: PathMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
