//! FAIR analysis engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use risk_core::stats;
use risk_simulation::{MonteCarloEngine, SimRng, SimulationParameters};

use crate::controls::{combined_effectiveness, vulnerability_score, ControlEffectiveness};
use crate::error::FairError;
use crate::frequency::FrequencyDistribution;

/// Percentile ladder for the loss-exceedance curve.
const EXCEEDANCE_PERCENTILES: [f64; 12] = [
    99.9, 99.5, 99.0, 95.0, 90.0, 75.0, 50.0, 25.0, 10.0, 5.0, 1.0, 0.1,
];

/// Default number of Monte Carlo draws.
const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// Category of threat event under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// External or internal cyber attack.
    CyberAttack,
    /// Loss or exposure of protected data.
    DataBreach,
    /// Process or system failure.
    OperationalError,
    /// Physical/environmental event.
    NaturalDisaster,
    /// Compliance failure.
    RegulatoryViolation,
    /// Internal or external fraud.
    Fraud,
    /// Third-party/supply-chain compromise.
    SupplyChain,
    /// Reputational damage event.
    Reputational,
}

/// Loss-magnitude model: a GBM simulation bounded to a loss range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossMagnitude {
    /// GBM parameters driving the loss distribution; the terminal values
    /// become the per-event loss samples.
    pub gbm: SimulationParameters,
    /// Lower bound on a single-event loss.
    pub min_loss: f64,
    /// Upper bound on a single-event loss.
    pub max_loss: f64,
}

impl LossMagnitude {
    /// Create a bounded loss-magnitude model.
    ///
    /// # Errors
    ///
    /// [`FairError::InvalidParameter`] when `min_loss < 0` or
    /// `min_loss >= max_loss`.
    pub fn new(
        gbm: SimulationParameters,
        min_loss: f64,
        max_loss: f64,
    ) -> Result<Self, FairError> {
        if !min_loss.is_finite() || !max_loss.is_finite() || min_loss < 0.0 || min_loss >= max_loss
        {
            return Err(FairError::InvalidParameter(format!(
                "loss bounds must satisfy 0 <= min < max, got [{}, {}]",
                min_loss, max_loss
            )));
        }
        Ok(Self {
            gbm,
            min_loss,
            max_loss,
        })
    }
}

/// Complete FAIR analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairParameters {
    /// Threat category.
    pub threat: ThreatType,
    /// Threat-event frequency distribution.
    pub frequency: FrequencyDistribution,
    /// Primary loss model.
    pub primary_loss: LossMagnitude,
    /// Optional secondary loss model (reputational, regulatory, ...).
    pub secondary_loss: Option<LossMagnitude>,
    /// Security controls in place.
    pub controls: Vec<ControlEffectiveness>,
    /// Threat actor capability, in [0, 1].
    pub threat_capability: f64,
    /// Organisational resilience, in [0, 1].
    pub organizational_resilience: f64,
    /// Monte Carlo draw count.
    pub sample_count: usize,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
}

impl FairParameters {
    /// Create parameters with no controls, balanced capability/resilience,
    /// and the default sample count.
    pub fn new(
        threat: ThreatType,
        frequency: FrequencyDistribution,
        primary_loss: LossMagnitude,
    ) -> Self {
        Self {
            threat,
            frequency,
            primary_loss,
            secondary_loss: None,
            controls: Vec::new(),
            threat_capability: 0.5,
            organizational_resilience: 0.5,
            sample_count: DEFAULT_SAMPLE_COUNT,
            seed: None,
        }
    }

    /// Set the secondary loss model.
    pub fn with_secondary_loss(mut self, loss: LossMagnitude) -> Self {
        self.secondary_loss = Some(loss);
        self
    }

    /// Set the control stack.
    pub fn with_controls(mut self, controls: Vec<ControlEffectiveness>) -> Self {
        self.controls = controls;
        self
    }

    /// Set the capability/resilience scores.
    pub fn with_threat_profile(mut self, capability: f64, resilience: f64) -> Self {
        self.threat_capability = capability;
        self.organizational_resilience = resilience;
        self
    }

    /// Set the draw count.
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the reproducibility seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), FairError> {
        self.frequency.validate()?;
        if !(0.0..=1.0).contains(&self.threat_capability) {
            return Err(FairError::InvalidParameter(format!(
                "threat capability must be in [0, 1], got {}",
                self.threat_capability
            )));
        }
        if !(0.0..=1.0).contains(&self.organizational_resilience) {
            return Err(FairError::InvalidParameter(format!(
                "organisational resilience must be in [0, 1], got {}",
                self.organizational_resilience
            )));
        }
        if self.sample_count == 0 {
            return Err(FairError::InvalidParameter(
                "sample count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Threat-event frequency model after capability, vulnerability, and
/// control adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEventModel {
    /// Most likely annual frequency before adjustment.
    pub base_frequency: f64,
    /// Frequency after all adjustment factors.
    pub adjusted_frequency: f64,
    /// Vulnerability factor in [0.5, 1.5].
    pub vulnerability_factor: f64,
    /// Threat capability factor in [0.5, 1.5].
    pub threat_capability_factor: f64,
    /// Residual-exposure factor, `1 - combined control effectiveness`.
    pub control_effectiveness_factor: f64,
}

/// One point on the loss-exceedance curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossExceedancePoint {
    /// Annual loss amount.
    pub loss: f64,
    /// Probability of an annual loss at least this large.
    pub exceedance_probability: f64,
}

/// Thresholds for the risk rating step function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Lower bound of the medium band.
    pub medium: f64,
    /// Lower bound of the high band.
    pub high: f64,
    /// Lower bound of the critical band.
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 100_000.0,
            high: 1_000_000.0,
            critical: 10_000_000.0,
        }
    }
}

impl RiskThresholds {
    /// Create validated thresholds.
    ///
    /// # Errors
    ///
    /// [`FairError::InvalidParameter`] unless
    /// `0 < medium < high < critical`.
    pub fn new(medium: f64, high: f64, critical: f64) -> Result<Self, FairError> {
        if !(medium > 0.0 && medium < high && high < critical) {
            return Err(FairError::InvalidParameter(format!(
                "thresholds must satisfy 0 < medium < high < critical, got ({}, {}, {})",
                medium, high, critical
            )));
        }
        Ok(Self {
            medium,
            high,
            critical,
        })
    }
}

/// Qualitative risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    /// Below the medium threshold.
    Low,
    /// At or above the medium threshold.
    Medium,
    /// At or above the high threshold.
    High,
    /// At or above the critical threshold.
    Critical,
}

/// Monotonic step-function rating of a risk value (typically
/// `max(ALE, VaR99)`) against thresholds, with a 1-10 numeric score.
pub fn risk_rating(risk_value: f64, thresholds: &RiskThresholds) -> (RiskBand, f64) {
    if risk_value >= thresholds.critical {
        (
            RiskBand::Critical,
            (7.0 + 3.0 * risk_value / thresholds.critical).min(10.0),
        )
    } else if risk_value >= thresholds.high {
        (
            RiskBand::High,
            (5.0 + 2.0 * risk_value / thresholds.high).min(7.0),
        )
    } else if risk_value >= thresholds.medium {
        (
            RiskBand::Medium,
            (3.0 + 2.0 * risk_value / thresholds.medium).min(5.0),
        )
    } else {
        (
            RiskBand::Low,
            (1.0 + 2.0 * risk_value / thresholds.medium).min(3.0),
        )
    }
}

/// FAIR analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairResult {
    /// Threat category analysed.
    pub threat: ThreatType,
    /// Expected annual loss, the mean of the ALE sample set.
    pub annual_loss_expectancy: f64,
    /// 95th percentile of the ALE samples.
    pub var_95: f64,
    /// 99th percentile of the ALE samples.
    pub var_99: f64,
    /// Mean of the ALE samples at or beyond the 95th percentile.
    pub expected_shortfall: f64,
    /// Qualitative band of `max(ALE, VaR99)`.
    pub risk_band: RiskBand,
    /// Numeric score on a 1-10 scale.
    pub risk_rating: f64,
    /// 5th-95th percentile interval of the ALE samples.
    pub confidence_interval: (f64, f64),
    /// Loss-exceedance curve, ascending in loss.
    pub loss_exceedance_curve: Vec<LossExceedancePoint>,
    /// Share of expected per-event loss from the primary model, percent.
    pub primary_loss_contribution_pct: f64,
    /// Share of expected per-event loss from the secondary model, percent.
    pub secondary_loss_contribution_pct: f64,
    /// Combined control effectiveness used in the threat model.
    pub combined_control_effectiveness: f64,
    /// The adjusted threat-event frequency model.
    pub threat_model: ThreatEventModel,
    /// Monte Carlo draws behind the estimates.
    pub sample_count: usize,
    /// When the analysis ran.
    pub created_at: DateTime<Utc>,
}

/// FAIR risk quantification engine.
///
/// Wraps the Monte Carlo engine for loss-magnitude simulation; stateless
/// across calls.
#[derive(Debug, Clone, Default)]
pub struct FairEngine {
    engine: MonteCarloEngine,
    thresholds: RiskThresholds,
}

impl FairEngine {
    /// Create an engine with the given rating thresholds.
    pub fn new(engine: MonteCarloEngine, thresholds: RiskThresholds) -> Self {
        Self { engine, thresholds }
    }

    /// Create an engine with default configuration and thresholds.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Run a complete FAIR analysis.
    ///
    /// # Errors
    ///
    /// Parameter validation failures and loss-simulation errors propagate;
    /// no partial result is fabricated.
    pub fn run_analysis(&self, params: &FairParameters) -> Result<FairResult, FairError> {
        params.validate()?;
        let seed = params.seed.unwrap_or_else(rand::random);
        debug!(threat = ?params.threat, samples = params.sample_count, "running FAIR analysis");

        let control_effectiveness = combined_effectiveness(&params.controls);
        let vulnerability = vulnerability_score(
            params.threat_capability,
            params.organizational_resilience,
            control_effectiveness,
        );

        let base_frequency = params.frequency.most_likely();
        let threat_capability_factor = 0.5 + params.threat_capability;
        let vulnerability_factor = 0.5 + vulnerability;
        let control_effectiveness_factor = 1.0 - control_effectiveness;
        // The 0.1 floor keeps a fully controlled threat from vanishing
        let adjusted_frequency = base_frequency
            * threat_capability_factor
            * vulnerability_factor
            * (0.1 + control_effectiveness_factor);

        let threat_model = ThreatEventModel {
            base_frequency,
            adjusted_frequency,
            vulnerability_factor,
            threat_capability_factor,
            control_effectiveness_factor,
        };

        let n = params.sample_count;
        let mut frequency_samples = vec![0.0_f64; n];
        let mut rng = SimRng::from_seed(seed);
        params
            .frequency
            .sample_into(&mut rng, &mut frequency_samples)?;
        let frequency_scale = adjusted_frequency / base_frequency;
        for f in frequency_samples.iter_mut() {
            *f *= frequency_scale;
        }

        let primary_samples =
            self.loss_samples(&params.primary_loss, n, seed.wrapping_add(1))?;
        let secondary_samples = match &params.secondary_loss {
            Some(loss) => Some(self.loss_samples(loss, n, seed.wrapping_add(2))?),
            None => None,
        };

        let mut ale_samples = Vec::with_capacity(n);
        for i in 0..n {
            let event_loss = primary_samples[i]
                + secondary_samples.as_ref().map_or(0.0, |s| s[i]);
            ale_samples.push(frequency_samples[i] * event_loss);
        }
        if ale_samples.iter().any(|v| !v.is_finite()) {
            return Err(FairError::Numerical(
                "non-finite value in the ALE sample set".to_string(),
            ));
        }

        let ale = stats::mean(&ale_samples);
        let var_95 = stats::percentile(&ale_samples, 95.0);
        let var_99 = stats::percentile(&ale_samples, 99.0);
        let tail: Vec<f64> = ale_samples.iter().copied().filter(|&v| v >= var_95).collect();
        let expected_shortfall = if tail.is_empty() {
            var_95
        } else {
            stats::mean(&tail)
        };
        let confidence_interval = (
            stats::percentile(&ale_samples, 5.0),
            stats::percentile(&ale_samples, 95.0),
        );

        let mut loss_exceedance_curve: Vec<LossExceedancePoint> = EXCEEDANCE_PERCENTILES
            .iter()
            .map(|&p| LossExceedancePoint {
                loss: stats::percentile(&ale_samples, p),
                exceedance_probability: (100.0 - p) / 100.0,
            })
            .collect();
        loss_exceedance_curve.sort_by(|a, b| {
            a.loss
                .partial_cmp(&b.loss)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let primary_mean = stats::mean(&primary_samples);
        let secondary_mean = secondary_samples
            .as_ref()
            .map(|s| stats::mean(s))
            .unwrap_or(0.0);
        let primary_loss_contribution_pct =
            primary_mean / (primary_mean + secondary_mean) * 100.0;
        let secondary_loss_contribution_pct = 100.0 - primary_loss_contribution_pct;

        let (risk_band, rating) = risk_rating(ale.max(var_99), &self.thresholds);

        Ok(FairResult {
            threat: params.threat,
            annual_loss_expectancy: ale,
            var_95,
            var_99,
            expected_shortfall,
            risk_band,
            risk_rating: rating,
            confidence_interval,
            loss_exceedance_curve,
            primary_loss_contribution_pct,
            secondary_loss_contribution_pct: if params.secondary_loss.is_some() {
                secondary_loss_contribution_pct
            } else {
                0.0
            },
            combined_control_effectiveness: control_effectiveness,
            threat_model,
            sample_count: n,
            created_at: Utc::now(),
        })
    }

    /// Simulate per-event loss samples: GBM terminal values clipped to the
    /// loss bounds.
    fn loss_samples(
        &self,
        loss: &LossMagnitude,
        n: usize,
        seed: u64,
    ) -> Result<Vec<f64>, FairError> {
        let mut gbm = SimulationParameters::new(
            loss.gbm.initial_price,
            loss.gbm.drift,
            loss.gbm.volatility,
            loss.gbm.time_horizon,
            loss.gbm.time_steps,
            n,
        )
        .map_err(FairError::Simulation)?;
        gbm.time_unit = loss.gbm.time_unit;
        gbm.seed = Some(loss.gbm.seed.unwrap_or(seed));

        let result = self.engine.run(&gbm)?;
        Ok(result
            .path_statistics
            .final_prices
            .iter()
            .map(|&p| p.clamp(loss.min_loss, loss.max_loss))
            .collect())
    }
}
