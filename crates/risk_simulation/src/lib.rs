//! # risk_simulation: Monte Carlo Simulation Core
//!
//! Generates stochastic price/loss paths from a geometric Brownian motion
//! process using batched Monte Carlo sampling with antithetic variance
//! reduction.
//!
//! The exact log-space solution is used for numerical stability:
//!
//! ```text
//! S(t+dt) = S(t) * exp((mu - 0.5*sigma^2)*dt + sigma*sqrt(dt)*Z)
//! ```
//!
//! ## Determinism
//!
//! Identical `(parameters, seed)` produce bit-identical paths regardless of
//! thread count: each path draws from its own substream derived from the
//! base seed, so rayon scheduling never affects the output.
//!
//! ## Statelessness
//!
//! The engine holds configuration only. Results are owned by the caller;
//! nothing is cached or retained between runs.

mod cancel;
mod engine;
mod error;
mod params;
mod path_stats;
mod result;
mod rng;

pub use cancel::CancelToken;
pub use engine::{validate_correlation_matrix, MonteCarloEngine};
pub use error::SimulationError;
pub use params::{MonteCarloConfig, SimulationParameters, TimeUnit};
pub use path_stats::PathStatistics;
pub use result::{PathMatrix, SimulationMetadata, SimulationResult};
pub use rng::SimRng;

pub use risk_core::stats::StatisticalMoments;
