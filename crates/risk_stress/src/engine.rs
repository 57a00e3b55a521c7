//! Stress test execution and suite aggregation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use risk_core::types::ConfidenceLevel;
use risk_metrics::{RiskMetricSet, RiskMetricsCalculator};
use risk_simulation::{MonteCarloEngine, SimulationParameters};

use crate::error::StressError;
use crate::scenario::{StressPortfolio, StressScenario};

/// Fraction of regulatory capital treated as a usable buffer when
/// estimating additional capital needs.
const CAPITAL_BUFFER: f64 = 0.5;

/// Portfolio risk metrics in currency terms for one parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseMetrics {
    /// Portfolio value the tail metrics are scaled by.
    pub portfolio_value: f64,
    /// 95% VaR in currency terms.
    pub var_95: f64,
    /// 99% VaR in currency terms.
    pub var_99: f64,
    /// 95% expected shortfall in currency terms.
    pub expected_shortfall: f64,
    /// Volatility of the portfolio return distribution.
    pub volatility: f64,
    /// Sharpe ratio of the portfolio return distribution.
    pub sharpe_ratio: f64,
    /// Maximum drawdown magnitude.
    pub max_drawdown: f64,
}

/// Change in one metric between the base and stressed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Metric name, e.g. `"var_95"`.
    pub metric: String,
    /// Base value.
    pub base: f64,
    /// Stressed value.
    pub stressed: f64,
    /// `stressed - base`.
    pub absolute_change: f64,
    /// Percentage change; `None` when the base value is 0 (explicitly
    /// undefined rather than a fabricated 0).
    pub percent_change: Option<f64>,
}

/// A risk limit exceeded under stress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitBreach {
    /// Which limit, e.g. `"var_95"`.
    pub metric: String,
    /// The configured limit.
    pub limit: f64,
    /// The stressed value that exceeded it.
    pub stressed_value: f64,
}

/// Capital adequacy impact of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalImpact {
    /// Estimated capital depletion (the portfolio loss).
    pub capital_depletion: f64,
    /// Depletion as a percentage of regulatory capital (0 when no capital
    /// figure was supplied).
    pub capital_ratio_change_pct: f64,
    /// Loss beyond the usable capital buffer.
    pub additional_capital_needed: f64,
}

/// Full impact analysis of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// The scenario that was run.
    pub scenario: StressScenario,
    /// Metrics under base parameters.
    pub base_metrics: BaseMetrics,
    /// Metrics under shocked parameters.
    pub stressed_metrics: BaseMetrics,
    /// Per-metric absolute and percentage changes.
    pub deltas: Vec<MetricDelta>,
    /// Estimated portfolio loss: the change in 95% VaR in currency terms.
    pub portfolio_loss: f64,
    /// Loss as a percentage of portfolio value.
    pub portfolio_loss_pct: f64,
    /// Capital adequacy impact.
    pub capital_impact: CapitalImpact,
    /// Risk limits breached by the stressed metrics.
    pub limit_breaches: Vec<LimitBreach>,
}

impl ImpactAnalysis {
    /// Whether any risk limit was breached.
    pub fn has_breaches(&self) -> bool {
        !self.limit_breaches.is_empty()
    }
}

/// Aggregate statistics over a scenario suite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuiteAggregate {
    /// Number of scenarios run.
    pub total_scenarios: usize,
    /// Mean portfolio loss.
    pub mean_loss: f64,
    /// Largest portfolio loss.
    pub max_loss: f64,
    /// Smallest portfolio loss.
    pub min_loss: f64,
    /// Standard deviation of the losses.
    pub loss_std: f64,
    /// Scenarios with at least one limit breach.
    pub scenarios_with_breaches: usize,
    /// Breach rate across the suite, in percent.
    pub breach_rate_pct: f64,
}

/// Results from running a scenario suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSuiteResult {
    /// Per-scenario impact analyses, in input order.
    pub results: Vec<ImpactAnalysis>,
    /// Aggregate loss statistics.
    pub aggregate: SuiteAggregate,
    /// Scenario id with the largest loss.
    pub worst_case_scenario: String,
    /// Scenario id with the highest annual probability, when any scenario
    /// carries one.
    pub most_likely_scenario: Option<String>,
}

/// Stress testing engine.
///
/// Wraps a simulation engine and a metrics calculator; holds no state
/// across calls. Base and shocked runs share per-asset seeds so the
/// reported deltas isolate the shock from sampling noise.
#[derive(Debug, Clone, Default)]
pub struct StressTester {
    engine: MonteCarloEngine,
    metrics: RiskMetricsCalculator,
}

impl StressTester {
    /// Create a stress tester from a simulation engine and metrics
    /// calculator.
    pub fn new(engine: MonteCarloEngine, metrics: RiskMetricsCalculator) -> Self {
        Self { engine, metrics }
    }

    /// Create a tester with default engine and calculator settings.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Run a single stress scenario against a portfolio.
    ///
    /// # Errors
    ///
    /// - [`StressError::InvalidPortfolio`] if a weighted asset has no base
    ///   parameters or path counts differ across assets
    /// - [`StressError::InvalidScenario`] if the shocks produce invalid
    ///   parameters
    /// - simulation and metric errors are passed through
    pub fn run_scenario(
        &self,
        scenario: &StressScenario,
        base_params: &BTreeMap<String, SimulationParameters>,
        portfolio: &StressPortfolio,
    ) -> Result<ImpactAnalysis, StressError> {
        debug!(scenario = %scenario.id, "running stress scenario");
        let seeded = materialise_seeds(base_params);

        let base_metrics = self.portfolio_metrics(&seeded, portfolio)?;

        let mut shocked = BTreeMap::new();
        for (asset, params) in &seeded {
            shocked.insert(asset.clone(), scenario.apply(params)?);
        }
        let stressed_metrics = self.portfolio_metrics(&shocked, portfolio)?;

        Ok(build_impact(
            scenario.clone(),
            base_metrics,
            stressed_metrics,
            portfolio,
        ))
    }

    /// Run a suite of scenarios, one parallel task per scenario.
    ///
    /// # Errors
    ///
    /// Fails on an empty scenario list or the first scenario error.
    pub fn run_suite(
        &self,
        scenarios: &[StressScenario],
        base_params: &BTreeMap<String, SimulationParameters>,
        portfolio: &StressPortfolio,
    ) -> Result<ScenarioSuiteResult, StressError> {
        if scenarios.is_empty() {
            return Err(StressError::InvalidScenario(
                "at least one scenario is required".to_string(),
            ));
        }
        // Seeds fixed once so every scenario compares against the same base
        let seeded = materialise_seeds(base_params);

        let results: Vec<ImpactAnalysis> = scenarios
            .par_iter()
            .map(|scenario| self.run_scenario(scenario, &seeded, portfolio))
            .collect::<Result<_, _>>()?;

        let losses: Vec<f64> = results.iter().map(|r| r.portfolio_loss).collect();
        let scenarios_with_breaches = results.iter().filter(|r| r.has_breaches()).count();

        let aggregate = SuiteAggregate {
            total_scenarios: results.len(),
            mean_loss: risk_core::stats::mean(&losses),
            max_loss: losses.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_loss: losses.iter().copied().fold(f64::INFINITY, f64::min),
            loss_std: risk_core::stats::std_dev(&losses),
            scenarios_with_breaches,
            breach_rate_pct: scenarios_with_breaches as f64 / results.len() as f64 * 100.0,
        };

        let worst_case_scenario = results
            .iter()
            .max_by(|a, b| {
                a.portfolio_loss
                    .partial_cmp(&b.portfolio_loss)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.scenario.id.clone())
            .unwrap_or_default();

        let most_likely_scenario = results
            .iter()
            .filter(|r| r.scenario.annual_probability.is_some())
            .max_by(|a, b| {
                a.scenario
                    .annual_probability
                    .partial_cmp(&b.scenario.annual_probability)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.scenario.id.clone());

        Ok(ScenarioSuiteResult {
            results,
            aggregate,
            worst_case_scenario,
            most_likely_scenario,
        })
    }

    /// Simulate every weighted asset and compute portfolio metrics.
    fn portfolio_metrics(
        &self,
        params: &BTreeMap<String, SimulationParameters>,
        portfolio: &StressPortfolio,
    ) -> Result<BaseMetrics, StressError> {
        let mut portfolio_returns: Option<Vec<f64>> = None;

        for (asset, &weight) in &portfolio.weights {
            if weight == 0.0 {
                continue;
            }
            let asset_params = params.get(asset).ok_or_else(|| {
                StressError::InvalidPortfolio(format!(
                    "no base parameters for weighted asset {}",
                    asset
                ))
            })?;

            let result = self.engine.run(asset_params)?;
            let weighted: Vec<f64> = result
                .path_statistics
                .returns
                .iter()
                .map(|r| r * weight)
                .collect();

            portfolio_returns = Some(match portfolio_returns {
                None => weighted,
                Some(acc) => {
                    if acc.len() != weighted.len() {
                        return Err(StressError::InvalidPortfolio(
                            "all assets must simulate the same number of paths".to_string(),
                        ));
                    }
                    acc.iter().zip(weighted.iter()).map(|(a, b)| a + b).collect()
                }
            });
        }

        let returns = portfolio_returns.ok_or_else(|| {
            StressError::InvalidPortfolio("portfolio has no non-zero weights".to_string())
        })?;

        let metrics = self.metrics.compute_metrics(
            &returns,
            &[ConfidenceLevel::C95, ConfidenceLevel::C99],
            None,
        )?;

        Ok(scale_metrics(&metrics, portfolio.total_value))
    }
}

/// Scale tail metrics into currency terms against the portfolio value.
fn scale_metrics(metrics: &RiskMetricSet, portfolio_value: f64) -> BaseMetrics {
    BaseMetrics {
        portfolio_value,
        var_95: metrics.var_at(ConfidenceLevel::C95).unwrap_or(0.0) * portfolio_value,
        var_99: metrics.var_at(ConfidenceLevel::C99).unwrap_or(0.0) * portfolio_value,
        expected_shortfall: metrics.es_at(ConfidenceLevel::C95).unwrap_or(0.0)
            * portfolio_value,
        volatility: metrics.volatility,
        sharpe_ratio: metrics.sharpe_ratio,
        max_drawdown: metrics.max_drawdown,
    }
}

/// Assign a concrete seed to every parameter set that lacks one, so base
/// and shocked runs draw identical paths.
fn materialise_seeds(
    base_params: &BTreeMap<String, SimulationParameters>,
) -> BTreeMap<String, SimulationParameters> {
    base_params
        .iter()
        .map(|(asset, params)| {
            let mut params = params.clone();
            if params.seed.is_none() {
                params.seed = Some(rand::random());
            }
            (asset.clone(), params)
        })
        .collect()
}

/// Assemble the impact analysis from base and stressed metrics.
fn build_impact(
    scenario: StressScenario,
    base: BaseMetrics,
    stressed: BaseMetrics,
    portfolio: &StressPortfolio,
) -> ImpactAnalysis {
    let pairs = [
        ("var_95", base.var_95, stressed.var_95),
        ("var_99", base.var_99, stressed.var_99),
        (
            "expected_shortfall",
            base.expected_shortfall,
            stressed.expected_shortfall,
        ),
        ("volatility", base.volatility, stressed.volatility),
        ("max_drawdown", base.max_drawdown, stressed.max_drawdown),
    ];
    let deltas: Vec<MetricDelta> = pairs
        .iter()
        .map(|&(metric, b, s)| MetricDelta {
            metric: metric.to_string(),
            base: b,
            stressed: s,
            absolute_change: s - b,
            percent_change: if b != 0.0 {
                Some((s - b) / b.abs() * 100.0)
            } else {
                None
            },
        })
        .collect();

    let portfolio_loss = stressed.var_95 - base.var_95;
    let portfolio_loss_pct = portfolio_loss / portfolio.total_value * 100.0;

    let capital = portfolio.regulatory_capital;
    let capital_impact = CapitalImpact {
        capital_depletion: portfolio_loss,
        capital_ratio_change_pct: if capital > 0.0 {
            portfolio_loss / capital * 100.0
        } else {
            0.0
        },
        additional_capital_needed: (portfolio_loss - capital * CAPITAL_BUFFER).max(0.0),
    };

    let mut limit_breaches = Vec::new();
    let checks = [
        ("var_95", portfolio.limits.var_95, stressed.var_95),
        ("var_99", portfolio.limits.var_99, stressed.var_99),
        (
            "expected_shortfall",
            portfolio.limits.expected_shortfall,
            stressed.expected_shortfall,
        ),
        ("volatility", portfolio.limits.volatility, stressed.volatility),
        (
            "max_drawdown",
            portfolio.limits.max_drawdown,
            stressed.max_drawdown,
        ),
    ];
    for (metric, limit, value) in checks {
        if let Some(limit) = limit {
            if value > limit {
                limit_breaches.push(LimitBreach {
                    metric: metric.to_string(),
                    limit,
                    stressed_value: value,
                });
            }
        }
    }

    ImpactAnalysis {
        scenario,
        base_metrics: base,
        stressed_metrics: stressed,
        deltas,
        portfolio_loss,
        portfolio_loss_pct,
        capital_impact,
        limit_breaches,
    }
}
