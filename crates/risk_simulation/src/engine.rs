//! Monte Carlo engine: batched GBM path generation.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::SimulationError;
use crate::params::{MonteCarloConfig, SimulationParameters};
use crate::path_stats::PathStatistics;
use crate::result::{PathMatrix, SimulationMetadata, SimulationResult};
use crate::rng::SimRng;

/// Eigenvalue floor below which a correlation matrix is rejected.
const PSD_TOLERANCE: f64 = -1e-8;

/// Monte Carlo simulation engine for geometric Brownian motion.
///
/// Holds configuration only; every run is a pure function of its inputs.
/// Paths are generated in batches, in parallel, from per-path seed
/// substreams, so identical `(parameters, seed)` yield bit-identical output
/// on any thread count.
///
/// # Examples
///
/// ```
/// use risk_simulation::{MonteCarloEngine, SimulationParameters};
///
/// let engine = MonteCarloEngine::with_defaults();
/// let params = SimulationParameters::new(100.0, 0.05, 0.2, 1.0, 12, 500)
///     .unwrap()
///     .with_seed(7);
/// let result = engine.run(&params).unwrap();
/// assert_eq!(result.paths.num_paths(), 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    config: MonteCarloConfig,
}

impl MonteCarloEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// Create an engine with default configuration (antithetic pairing on).
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// The engine configuration.
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Run a complete GBM simulation.
    pub fn run(&self, params: &SimulationParameters) -> Result<SimulationResult, SimulationError> {
        self.run_cancellable(params, &CancelToken::new())
    }

    /// Run a simulation, checking the cancellation token between path batches.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Cancelled`] if the token is tripped
    /// - [`SimulationError::Numerical`] if any path overflows to a
    ///   non-finite value (extreme drift/volatility inputs)
    pub fn run_cancellable(
        &self,
        params: &SimulationParameters,
        token: &CancelToken,
    ) -> Result<SimulationResult, SimulationError> {
        let seed = resolve_seed(params.seed);
        debug!(
            num_paths = params.num_paths,
            time_steps = params.time_steps,
            antithetic = self.config.antithetic,
            seed,
            "running GBM simulation"
        );

        let num_points = params.time_steps + 1;
        let dt = params.dt();
        let drift_term = (params.drift - 0.5 * params.volatility * params.volatility) * dt;
        let vol_sqrt_dt = params.volatility * dt.sqrt();
        let ln_s0 = params.initial_price.ln();

        let batch = self.config.batch_size.max(1);
        let antithetic = self.config.antithetic;

        let mut data = vec![0.0_f64; params.num_paths * num_points];
        data.par_chunks_mut(batch * num_points)
            .enumerate()
            .try_for_each(|(chunk_index, chunk)| {
                if token.is_cancelled() {
                    return Err(SimulationError::Cancelled);
                }
                let first_path = chunk_index * batch;
                for (offset, path) in chunk.chunks_exact_mut(num_points).enumerate() {
                    let path_index = (first_path + offset) as u64;
                    let (stream, sign) = substream_for(path_index, antithetic);
                    let mut rng = SimRng::path_stream(seed, stream);

                    let mut log_price = ln_s0;
                    path[0] = params.initial_price;
                    for point in path.iter_mut().skip(1) {
                        let z = sign * rng.gen_normal();
                        log_price += drift_term + vol_sqrt_dt * z;
                        *point = log_price.exp();
                    }
                }
                Ok(())
            })?;

        let paths = PathMatrix::from_raw(data, params.num_paths, num_points);
        self.finish(params.clone(), paths, seed)
    }

    /// Run a correlated multi-asset simulation.
    ///
    /// Per-step draw vectors are correlated through the Cholesky factor of
    /// `correlation` and shared across all assets for a given path, so the
    /// joint distribution of the asset paths honours the supplied structure.
    ///
    /// All assets must share `time_steps`, `num_paths`, and `time_horizon`;
    /// the seed is taken from the first asset.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidCorrelation`] if the matrix fails
    ///   validation (symmetry, unit diagonal, eigenvalues >= -1e-8) or
    ///   cannot be Cholesky-factorised
    /// - [`SimulationError::InvalidParameter`] on mismatched asset grids
    pub fn run_correlated(
        &self,
        assets: &[SimulationParameters],
        correlation: &DMatrix<f64>,
    ) -> Result<Vec<SimulationResult>, SimulationError> {
        if assets.is_empty() {
            return Err(SimulationError::InvalidParameter(
                "at least one asset is required".to_string(),
            ));
        }
        if correlation.nrows() != assets.len() || correlation.ncols() != assets.len() {
            return Err(SimulationError::InvalidCorrelation(format!(
                "matrix is {}x{} but there are {} assets",
                correlation.nrows(),
                correlation.ncols(),
                assets.len()
            )));
        }
        validate_correlation_matrix(correlation)?;

        let first = &assets[0];
        for asset in &assets[1..] {
            if asset.time_steps != first.time_steps
                || asset.num_paths != first.num_paths
                || asset.time_horizon != first.time_horizon
            {
                return Err(SimulationError::InvalidParameter(
                    "all assets must share time steps, path count, and horizon".to_string(),
                ));
            }
        }

        let chol = nalgebra::Cholesky::new(correlation.clone()).ok_or_else(|| {
            SimulationError::InvalidCorrelation(
                "matrix is not positive definite; regularise it before simulating".to_string(),
            )
        })?;
        let l = chol.l();

        let n_assets = assets.len();
        let num_points = first.time_steps + 1;
        let num_paths = first.num_paths;
        let seed = resolve_seed(first.seed);
        let antithetic = self.config.antithetic;

        let drift_terms: Vec<f64> = assets
            .iter()
            .map(|a| (a.drift - 0.5 * a.volatility * a.volatility) * a.dt())
            .collect();
        let vol_sqrt_dts: Vec<f64> = assets
            .iter()
            .map(|a| a.volatility * a.dt().sqrt())
            .collect();

        // One row per path: [asset 0 path | asset 1 path | ...]
        let rows: Vec<Vec<f64>> = (0..num_paths)
            .into_par_iter()
            .map(|path_index| {
                let (stream, sign) = substream_for(path_index as u64, antithetic);
                let mut rng = SimRng::path_stream(seed, stream);

                let mut row = vec![0.0_f64; n_assets * num_points];
                let mut log_prices: Vec<f64> =
                    assets.iter().map(|a| a.initial_price.ln()).collect();
                for (a, asset) in assets.iter().enumerate() {
                    row[a * num_points] = asset.initial_price;
                }

                let mut eps = vec![0.0_f64; n_assets];
                for t in 1..num_points {
                    rng.fill_normal(&mut eps);
                    for a in 0..n_assets {
                        // Lower-triangular product: correlated draw for asset a
                        let mut z = 0.0;
                        for (k, &e) in eps.iter().enumerate().take(a + 1) {
                            z += l[(a, k)] * e;
                        }
                        log_prices[a] += drift_terms[a] + vol_sqrt_dts[a] * sign * z;
                        row[a * num_points + t] = log_prices[a].exp();
                    }
                }
                row
            })
            .collect();

        let mut results = Vec::with_capacity(n_assets);
        for (a, asset) in assets.iter().enumerate() {
            let mut data = Vec::with_capacity(num_paths * num_points);
            for row in &rows {
                data.extend_from_slice(&row[a * num_points..(a + 1) * num_points]);
            }
            let paths = PathMatrix::from_raw(data, num_paths, num_points);
            results.push(self.finish(asset.clone(), paths, seed)?);
        }
        Ok(results)
    }

    /// Assemble the result bundle and run the non-finite check.
    fn finish(
        &self,
        params: SimulationParameters,
        paths: PathMatrix,
        seed: u64,
    ) -> Result<SimulationResult, SimulationError> {
        let terminal = paths.terminal_values();
        if let Some(bad) = terminal.iter().position(|v| !v.is_finite()) {
            return Err(SimulationError::Numerical(format!(
                "non-finite terminal value in path {}",
                bad
            )));
        }

        let path_statistics = PathStatistics::from_paths(&paths, params.initial_price);
        let terminal_moments = risk_core::stats::moments(&terminal)
            .map_err(|e| SimulationError::Numerical(e.to_string()))?;

        let metadata = SimulationMetadata {
            paths_generated: params.num_paths,
            steps_per_path: params.time_steps,
            total_draws: params.num_paths * params.time_steps,
            antithetic: self.config.antithetic,
            seed,
            theoretical_expected_terminal: params.initial_price
                * (params.drift * params.time_horizon).exp(),
            theoretical_volatility: params.volatility * params.time_horizon.sqrt(),
        };

        Ok(SimulationResult {
            time_grid: params.time_grid(),
            parameters: params,
            paths,
            path_statistics,
            terminal_moments,
            metadata,
        })
    }
}

/// Map a path index onto its draw substream and antithetic sign.
///
/// With antithetic pairing, paths `2k` and `2k+1` share substream `k` with
/// opposite signs; without it every path has its own substream.
#[inline]
fn substream_for(path_index: u64, antithetic: bool) -> (u64, f64) {
    if antithetic {
        let sign = if path_index % 2 == 0 { 1.0 } else { -1.0 };
        (path_index / 2, sign)
    } else {
        (path_index, 1.0)
    }
}

/// Resolve an optional seed, drawing from entropy when absent.
#[inline]
fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Validate a correlation matrix: square, symmetric, unit diagonal,
/// off-diagonal magnitudes at most 1, and no eigenvalue below `-1e-8`.
pub fn validate_correlation_matrix(matrix: &DMatrix<f64>) -> Result<(), SimulationError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(SimulationError::InvalidCorrelation(format!(
            "matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let n = matrix.nrows();
    for i in 0..n {
        if (matrix[(i, i)] - 1.0).abs() > 1e-8 {
            return Err(SimulationError::InvalidCorrelation(format!(
                "diagonal element ({}, {}) is {}, expected 1",
                i,
                i,
                matrix[(i, i)]
            )));
        }
        for j in (i + 1)..n {
            if (matrix[(i, j)] - matrix[(j, i)]).abs() > 1e-8 {
                return Err(SimulationError::InvalidCorrelation(format!(
                    "matrix is not symmetric at ({}, {})",
                    i, j
                )));
            }
            if matrix[(i, j)].abs() > 1.0 + 1e-12 {
                return Err(SimulationError::InvalidCorrelation(format!(
                    "correlation ({}, {}) = {} outside [-1, 1]",
                    i,
                    j,
                    matrix[(i, j)]
                )));
            }
        }
    }

    let eigenvalues = matrix.clone().symmetric_eigen().eigenvalues;
    if let Some(min) = eigenvalues.iter().copied().reduce(f64::min) {
        if min < PSD_TOLERANCE {
            return Err(SimulationError::InvalidCorrelation(format!(
                "matrix is not positive semi-definite (minimum eigenvalue {})",
                min
            )));
        }
    }
    Ok(())
}
