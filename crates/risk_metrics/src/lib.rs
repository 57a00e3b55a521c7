//! # risk_metrics: Tail-Risk Metrics Calculator
//!
//! Derives Value-at-Risk, expected shortfall, drawdown, and
//! risk-adjusted-return ratios from a return series — historical,
//! simulated, or supplied.
//!
//! ## Conventions
//!
//! - VaR and expected shortfall are reported as **loss magnitudes**
//!   (non-negative numbers).
//! - For confidence levels q1 < q2, `VaR(q2) >= VaR(q1)` and
//!   `ES(q) >= VaR(q)` always hold.
//! - Ratios with a zero denominator default to 0 and record an explicit
//!   [`MetricWarning`] — the default is visible, never silent.

mod error;
mod metrics;
mod portfolio;
mod var;

pub use error::MetricsError;
pub use metrics::{
    max_drawdown, MetricWarning, RiskMetricSet, RiskMetricsCalculator, TailRiskAtLevel,
};
pub use portfolio::{
    portfolio_beta, portfolio_returns, portfolio_risk_metrics, stressed_var,
    PortfolioRiskMetrics, ReturnShock, StressedVar,
};
pub use var::{
    expected_shortfall, historical_var, monte_carlo_var, parametric_var, EsEstimate, EsMethod,
    TailDistribution,
};

pub use risk_core::types::ConfidenceLevel;
