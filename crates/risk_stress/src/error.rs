//! Stress testing error types.

use risk_core::types::SolverError;
use risk_metrics::MetricsError;
use risk_simulation::SimulationError;
use thiserror::Error;

/// Errors from stress testing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StressError {
    /// A scenario produced invalid shocked parameters (e.g. negative
    /// volatility after an additive shock).
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    /// Malformed portfolio specification.
    #[error("Invalid portfolio: {0}")]
    InvalidPortfolio(String),

    /// Underlying simulation failure.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Underlying metric calculation failure.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Root search failed (no bracket, non-convergence).
    #[error("Numerical instability: {0}")]
    Numerical(String),
}

impl From<SolverError> for StressError {
    fn from(err: SolverError) -> Self {
        StressError::Numerical(err.to_string())
    }
}
