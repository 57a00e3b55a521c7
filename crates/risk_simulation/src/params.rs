//! Simulation parameter types.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Time unit used to scale the reported time grid.
///
/// The simulation itself always works in years; the grid returned to the
/// caller is rescaled so a daily simulation reads in days, a monthly one
/// in months, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Calendar days (365 per year).
    Days,
    /// Weeks (52 per year).
    Weeks,
    /// Months (12 per year).
    Months,
    /// Years.
    Years,
}

impl TimeUnit {
    /// Number of units per year.
    pub fn units_per_year(&self) -> f64 {
        match self {
            TimeUnit::Days => 365.0,
            TimeUnit::Weeks => 52.0,
            TimeUnit::Months => 12.0,
            TimeUnit::Years => 1.0,
        }
    }
}

/// Parameters for a GBM Monte Carlo simulation.
///
/// Immutable once constructed; [`SimulationParameters::new`] validates all
/// ranges so downstream code never re-checks.
///
/// # Examples
/// ```
/// use risk_simulation::SimulationParameters;
///
/// let params = SimulationParameters::new(100.0, 0.05, 0.2, 1.0, 252, 10_000)
///     .unwrap()
///     .with_seed(42);
/// assert_eq!(params.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Initial price/value (> 0).
    pub initial_price: f64,
    /// Annualised drift.
    pub drift: f64,
    /// Annualised volatility (>= 0).
    pub volatility: f64,
    /// Time horizon in years (> 0).
    pub time_horizon: f64,
    /// Number of simulation steps (> 0).
    pub time_steps: usize,
    /// Number of Monte Carlo paths (> 0).
    pub num_paths: usize,
    /// Time unit for the reported grid.
    pub time_unit: TimeUnit,
    /// Optional seed for reproducibility. `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl SimulationParameters {
    /// Create validated simulation parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] if:
    /// - `initial_price <= 0` or non-finite
    /// - `volatility < 0` or non-finite
    /// - `drift` is non-finite
    /// - `time_horizon <= 0` or non-finite
    /// - `time_steps == 0` or `num_paths == 0`
    pub fn new(
        initial_price: f64,
        drift: f64,
        volatility: f64,
        time_horizon: f64,
        time_steps: usize,
        num_paths: usize,
    ) -> Result<Self, SimulationError> {
        if !initial_price.is_finite() || initial_price <= 0.0 {
            return Err(SimulationError::InvalidParameter(format!(
                "initial price must be positive and finite, got {}",
                initial_price
            )));
        }
        if !drift.is_finite() {
            return Err(SimulationError::InvalidParameter(format!(
                "drift must be finite, got {}",
                drift
            )));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(SimulationError::InvalidParameter(format!(
                "volatility must be non-negative and finite, got {}",
                volatility
            )));
        }
        if !time_horizon.is_finite() || time_horizon <= 0.0 {
            return Err(SimulationError::InvalidParameter(format!(
                "time horizon must be positive and finite, got {}",
                time_horizon
            )));
        }
        if time_steps == 0 {
            return Err(SimulationError::InvalidParameter(
                "time steps must be positive".to_string(),
            ));
        }
        if num_paths == 0 {
            return Err(SimulationError::InvalidParameter(
                "path count must be positive".to_string(),
            ));
        }

        Ok(Self {
            initial_price,
            drift,
            volatility,
            time_horizon,
            time_steps,
            num_paths,
            time_unit: TimeUnit::Years,
            seed: None,
        })
    }

    /// Set the reproducibility seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the time unit for the reported grid.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    /// Time increment per step, in years.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.time_horizon / self.time_steps as f64
    }

    /// Time grid in the configured unit, `time_steps + 1` points from 0.
    pub fn time_grid(&self) -> Vec<f64> {
        let dt_scaled = self.dt() * self.time_unit.units_per_year();
        (0..=self.time_steps).map(|i| i as f64 * dt_scaled).collect()
    }
}

/// Monte Carlo engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Pair each path with its antithetic twin for variance reduction.
    pub antithetic: bool,
    /// Paths per work batch; cancellation is checked at batch boundaries.
    pub batch_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            antithetic: true,
            batch_size: 1024,
        }
    }
}
