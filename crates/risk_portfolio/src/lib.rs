//! # risk_portfolio: Correlation & Portfolio Analytics
//!
//! Estimates multi-asset correlation structures and solves constrained
//! portfolio-optimisation objectives.
//!
//! - [`estimate_correlation`] supports historical sample correlation,
//!   exponentially-weighted correlation, and Ledoit–Wolf-style shrinkage.
//!   Every returned matrix is symmetric with unit diagonal and no
//!   eigenvalue below `-1e-8`; any regularisation applied to get there is
//!   reported on the result, never silent.
//! - [`PortfolioOptimiser`] solves maximise-Sharpe, minimise-variance,
//!   maximise-return, and risk-parity objectives under weight bounds, the
//!   weights-sum-to-one equality, and optional target-return, turnover,
//!   and variance constraints. Solver convergence status is reported
//!   distinctly from the returned allocation.
//! - Diversification diagnostics (effective number of assets, Herfindahl
//!   concentration, risk contributions) derive from the optimised weights
//!   and the covariance implied by the correlation matrix.

mod correlation;
mod diversification;
mod error;
mod optimiser;

pub use correlation::{
    estimate_correlation, CorrelationMatrix, CorrelationMethod, RegularisationReport,
    ShrinkageTarget,
};
pub use diversification::{
    decompose_risk, diversification_metrics, DiversificationMetrics, RiskContribution,
    RiskDecomposition,
};
pub use error::{AnalyticsError, CorrelationError, OptimizationError};
pub use optimiser::{
    AssetParameters, FrontierPoint, OptimizationConstraints, OptimizationObjective,
    OptimizationWarning, PortfolioAllocation, PortfolioOptimiser, SolverStatus,
};
