//! # risk_fair: FAIR Risk Quantification
//!
//! Factor Analysis of Information Risk: composes a threat-event-frequency
//! distribution with a simulation-driven loss-magnitude distribution to
//! produce annualised loss exposure.
//!
//! Per Monte Carlo draw:
//!
//! ```text
//! ALE = frequency x (primary loss + optional secondary loss)
//! ```
//!
//! Outputs include the expected ALE, VaR and expected shortfall on the
//! ALE sample set, a loss-exceedance curve, per-source loss contribution
//! percentages, and a threshold-based risk rating.
//!
//! Frequency distributions are a tagged variant ([`FrequencyDistribution`])
//! with a shared sampling contract — no inheritance hierarchies.

mod controls;
mod engine;
mod error;
mod frequency;

pub use controls::{combined_effectiveness, vulnerability_score, ControlEffectiveness, ControlType};
pub use engine::{
    risk_rating, FairEngine, FairParameters, FairResult, LossExceedancePoint, LossMagnitude,
    RiskBand, RiskThresholds, ThreatEventModel, ThreatType,
};
pub use error::FairError;
pub use frequency::FrequencyDistribution;
