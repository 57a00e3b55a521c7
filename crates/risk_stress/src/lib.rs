//! # risk_stress: Stress Testing Engine
//!
//! Applies deterministic parameter shocks to the simulation core and
//! measures the delta in risk metrics:
//!
//! - [`StressScenario`] describes a named shock set (return shock,
//!   volatility multiplier/shift, rate and spread moves) with a severity
//!   tier and optional annual probability.
//! - [`StressTester::run_scenario`] simulates base and shocked parameter
//!   sets with identical seeds, so the reported impact is the shock alone,
//!   never Monte Carlo noise.
//! - [`StressTester::run_suite`] fans scenarios out one rayon task each
//!   and aggregates losses, breach rates, and the worst-case and
//!   highest-probability scenarios.
//! - [`StressTester::find_breaking_point`] runs the search in reverse: a
//!   Brent root search over a single shock magnitude reproducing a target
//!   loss.
//!
//! Preset historical and severity-tiered scenario definitions live in
//! [`presets`].

mod engine;
mod error;
pub mod presets;
mod reverse;
mod scenario;

pub use engine::{
    BaseMetrics, CapitalImpact, ImpactAnalysis, LimitBreach, MetricDelta, ScenarioSuiteResult,
    StressTester, SuiteAggregate,
};
pub use error::StressError;
pub use reverse::ReverseStressResult;
pub use scenario::{
    RiskLimits, ScenarioSeverity, ShockParameters, StressPortfolio, StressScenario,
};
