//! Reverse stress testing: find the scenario that produces a target loss.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::debug;

use risk_core::math::solvers::{BrentSolver, SolverConfig};
use risk_simulation::SimulationParameters;

use crate::engine::{ImpactAnalysis, StressTester};
use crate::error::StressError;
use crate::scenario::{ScenarioSeverity, ShockParameters, StressPortfolio, StressScenario};

/// Search bounds on the shock magnitude.
const MIN_SHOCK: f64 = 0.01;
const MAX_SHOCK: f64 = 1.0;

/// Result of a reverse stress search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseStressResult {
    /// The loss the search targeted.
    pub target_loss: f64,
    /// The loss the found scenario actually produces.
    pub achieved_loss: f64,
    /// Shock magnitude found by the root search.
    pub shock_magnitude: f64,
    /// Equity return shock of the breaking scenario (`-magnitude`).
    pub required_equity_shock: f64,
    /// Volatility multiplier of the breaking scenario (`1 + magnitude`).
    pub required_volatility_multiplier: f64,
    /// Estimated annual probability of a shock this severe.
    pub estimated_annual_probability: f64,
    /// Full impact analysis of the breaking scenario.
    pub impact: ImpactAnalysis,
}

/// Map a shock magnitude onto the single-parameter breaking scenario.
fn scenario_for_magnitude(magnitude: f64) -> StressScenario {
    StressScenario::new(
        "breaking_point",
        "Portfolio Breaking Point",
        ScenarioSeverity::Extreme,
        1.0,
        ShockParameters::none()
            .with_equity_shock(-magnitude)
            .with_volatility_multiplier(1.0 + magnitude),
    )
}

/// Annual probability of a shock of the given magnitude, from the
/// historical frequency of comparable equity drawdowns.
fn estimate_annual_probability(magnitude: f64) -> f64 {
    if magnitude < 0.1 {
        0.05
    } else if magnitude < 0.2 {
        0.02
    } else if magnitude < 0.4 {
        0.005
    } else {
        0.001
    }
}

impl StressTester {
    /// Find the shock magnitude whose scenario reproduces a target loss.
    ///
    /// Runs a Brent root search on `loss(magnitude) - target_loss` over
    /// magnitudes in `[0.01, 1.0]`, where each magnitude `m` maps to an
    /// equity shock of `-m` combined with a volatility multiplier of
    /// `1 + m`. Seeds are fixed up front so the searched function is
    /// deterministic.
    ///
    /// # Errors
    ///
    /// - [`StressError::InvalidScenario`] for a non-positive target loss
    /// - [`StressError::Numerical`] when the target loss is outside the
    ///   range achievable within the shock bounds, or the search fails to
    ///   converge — the search never reports a guessed scenario
    pub fn find_breaking_point(
        &self,
        target_loss: f64,
        base_params: &BTreeMap<String, SimulationParameters>,
        portfolio: &StressPortfolio,
    ) -> Result<ReverseStressResult, StressError> {
        if !target_loss.is_finite() || target_loss <= 0.0 {
            return Err(StressError::InvalidScenario(format!(
                "target loss must be positive, got {}",
                target_loss
            )));
        }
        debug!(target_loss, "searching for breaking point");

        // Fix seeds once: the objective must be a deterministic function
        // of the shock magnitude
        let seeded: BTreeMap<String, SimulationParameters> = base_params
            .iter()
            .map(|(asset, params)| {
                let mut params = params.clone();
                if params.seed.is_none() {
                    params.seed = Some(rand::random());
                }
                (asset.clone(), params)
            })
            .collect();

        // Brent's closure cannot propagate errors; stash the first one and
        // surface it after the solve
        let inner_error: RefCell<Option<StressError>> = RefCell::new(None);
        let loss_gap = |magnitude: f64| -> f64 {
            match self.run_scenario(&scenario_for_magnitude(magnitude), &seeded, portfolio) {
                Ok(impact) => impact.portfolio_loss - target_loss,
                Err(err) => {
                    inner_error.borrow_mut().get_or_insert(err);
                    f64::NAN
                }
            }
        };

        let solver = BrentSolver::new(SolverConfig::new(1e-6, 100));
        let solve = solver.find_root(&loss_gap, MIN_SHOCK, MAX_SHOCK);

        if let Some(err) = inner_error.into_inner() {
            return Err(err);
        }
        let magnitude = solve.map_err(|e| match e {
            risk_core::types::SolverError::NoBracket { .. } => StressError::Numerical(format!(
                "target loss {} is not achievable with shock magnitudes in [{}, {}]",
                target_loss, MIN_SHOCK, MAX_SHOCK
            )),
            other => other.into(),
        })?;

        let scenario = scenario_for_magnitude(magnitude)
            .with_probability(estimate_annual_probability(magnitude));
        let impact = self.run_scenario(&scenario, &seeded, portfolio)?;

        Ok(ReverseStressResult {
            target_loss,
            achieved_loss: impact.portfolio_loss,
            shock_magnitude: magnitude,
            required_equity_shock: -magnitude,
            required_volatility_multiplier: 1.0 + magnitude,
            estimated_annual_probability: estimate_annual_probability(magnitude),
            impact,
        })
    }
}
