//! FAIR analysis error types.

use risk_simulation::SimulationError;
use thiserror::Error;

/// Errors from FAIR risk quantification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FairError {
    /// Malformed analysis parameter (distribution bounds, score ranges).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Underlying loss-magnitude simulation failure.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// NaN/Inf in the sample pipeline.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}
