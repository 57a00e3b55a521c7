//! Threat-event frequency distributions.

use rand_distr::{LogNormal, Poisson, Triangular};
use serde::{Deserialize, Serialize};

use risk_simulation::SimRng;

use crate::error::FairError;

/// Threat-event frequency distribution (events per year).
///
/// A tagged variant with a shared sampling contract: every kind validates
/// its parameters and fills a sample buffer from a seeded RNG.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FrequencyDistribution {
    /// Triangular over `[min, max]` peaking at `mode`.
    Triangular {
        /// Minimum events per year.
        min: f64,
        /// Most likely events per year.
        mode: f64,
        /// Maximum events per year.
        max: f64,
    },
    /// Lognormal fitted to min/mode/max: `mu = ln(mode)`,
    /// `sigma = (ln(max) - ln(min)) / 4`.
    LogNormal {
        /// Minimum events per year (> 0).
        min: f64,
        /// Most likely events per year.
        mode: f64,
        /// Maximum events per year.
        max: f64,
    },
    /// Poisson with the given annual rate.
    Poisson {
        /// Mean events per year (> 0).
        rate: f64,
    },
}

impl FrequencyDistribution {
    /// Validate the distribution parameters.
    ///
    /// # Errors
    ///
    /// [`FairError::InvalidParameter`] for non-finite, negative, or
    /// mis-ordered parameters.
    pub fn validate(&self) -> Result<(), FairError> {
        match *self {
            FrequencyDistribution::Triangular { min, mode, max } => {
                if !min.is_finite() || !mode.is_finite() || !max.is_finite() {
                    return Err(FairError::InvalidParameter(
                        "triangular parameters must be finite".to_string(),
                    ));
                }
                if min < 0.0 || !(min <= mode && mode <= max) || min >= max {
                    return Err(FairError::InvalidParameter(format!(
                        "triangular requires 0 <= min <= mode <= max with min < max, got ({}, {}, {})",
                        min, mode, max
                    )));
                }
                Ok(())
            }
            FrequencyDistribution::LogNormal { min, mode, max } => {
                if min <= 0.0 || !(min <= mode && mode <= max) || min >= max {
                    return Err(FairError::InvalidParameter(format!(
                        "lognormal requires 0 < min <= mode <= max with min < max, got ({}, {}, {})",
                        min, mode, max
                    )));
                }
                Ok(())
            }
            FrequencyDistribution::Poisson { rate } => {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(FairError::InvalidParameter(format!(
                        "poisson rate must be positive, got {}",
                        rate
                    )));
                }
                Ok(())
            }
        }
    }

    /// Most likely annual event count: the distribution's central
    /// parameter.
    pub fn most_likely(&self) -> f64 {
        match *self {
            FrequencyDistribution::Triangular { mode, .. } => mode,
            FrequencyDistribution::LogNormal { mode, .. } => mode,
            FrequencyDistribution::Poisson { rate } => rate,
        }
    }

    /// Fill `out` with frequency samples.
    ///
    /// # Errors
    ///
    /// [`FairError::InvalidParameter`] if the parameters fail validation.
    pub fn sample_into(&self, rng: &mut SimRng, out: &mut [f64]) -> Result<(), FairError> {
        self.validate()?;
        match *self {
            FrequencyDistribution::Triangular { min, mode, max } => {
                let dist = Triangular::new(min, max, mode)
                    .map_err(|e| FairError::InvalidParameter(e.to_string()))?;
                for value in out.iter_mut() {
                    *value = rng.sample(&dist);
                }
            }
            FrequencyDistribution::LogNormal { min, mode, max } => {
                let mu = mode.ln();
                let sigma = (max.ln() - min.ln()) / 4.0;
                let dist = LogNormal::new(mu, sigma)
                    .map_err(|e| FairError::InvalidParameter(e.to_string()))?;
                for value in out.iter_mut() {
                    *value = rng.sample(&dist);
                }
            }
            FrequencyDistribution::Poisson { rate } => {
                let dist = Poisson::new(rate)
                    .map_err(|e| FairError::InvalidParameter(e.to_string()))?;
                for value in out.iter_mut() {
                    *value = rng.sample(&dist);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dist: FrequencyDistribution, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = SimRng::from_seed(seed);
        let mut out = vec![0.0; n];
        dist.sample_into(&mut rng, &mut out).unwrap();
        out
    }

    #[test]
    fn test_triangular_validation() {
        assert!(FrequencyDistribution::Triangular {
            min: 0.5,
            mode: 2.0,
            max: 8.0
        }
        .validate()
        .is_ok());
        assert!(FrequencyDistribution::Triangular {
            min: 2.0,
            mode: 1.0,
            max: 8.0
        }
        .validate()
        .is_err());
        assert!(FrequencyDistribution::Triangular {
            min: -1.0,
            mode: 1.0,
            max: 2.0
        }
        .validate()
        .is_err());
        assert!(FrequencyDistribution::Triangular {
            min: 2.0,
            mode: 2.0,
            max: 2.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_lognormal_validation() {
        assert!(FrequencyDistribution::LogNormal {
            min: 0.1,
            mode: 0.5,
            max: 3.0
        }
        .validate()
        .is_ok());
        assert!(FrequencyDistribution::LogNormal {
            min: 0.0,
            mode: 0.5,
            max: 3.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_poisson_validation() {
        assert!(FrequencyDistribution::Poisson { rate: 2.0 }.validate().is_ok());
        assert!(FrequencyDistribution::Poisson { rate: 0.0 }.validate().is_err());
        assert!(FrequencyDistribution::Poisson { rate: -1.0 }.validate().is_err());
    }

    #[test]
    fn test_triangular_samples_within_bounds() {
        let samples = sample(
            FrequencyDistribution::Triangular {
                min: 0.5,
                mode: 2.0,
                max: 8.0,
            },
            5_000,
            42,
        );
        assert!(samples.iter().all(|&s| (0.5..=8.0).contains(&s)));
        // Triangular mean = (min + mode + max) / 3 = 3.5
        let mean = risk_core::stats::mean(&samples);
        assert!((mean - 3.5).abs() < 0.1, "mean = {}", mean);
    }

    #[test]
    fn test_poisson_sample_mean_near_rate() {
        let samples = sample(FrequencyDistribution::Poisson { rate: 4.0 }, 10_000, 7);
        let mean = risk_core::stats::mean(&samples);
        assert!((mean - 4.0).abs() < 0.1, "mean = {}", mean);
        assert!(samples.iter().all(|&s| s >= 0.0 && s.fract() == 0.0));
    }

    #[test]
    fn test_lognormal_median_near_mode() {
        // mu = ln(mode), so the lognormal median equals the mode
        let samples = sample(
            FrequencyDistribution::LogNormal {
                min: 0.5,
                mode: 2.0,
                max: 8.0,
            },
            10_000,
            11,
        );
        let median = risk_core::stats::median(&samples);
        assert!((median - 2.0).abs() < 0.15, "median = {}", median);
        assert!(samples.iter().all(|&s| s > 0.0));
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let dist = FrequencyDistribution::Triangular {
            min: 0.5,
            mode: 2.0,
            max: 8.0,
        };
        assert_eq!(sample(dist, 100, 5), sample(dist, 100, 5));
    }

    #[test]
    fn test_most_likely() {
        assert_eq!(
            FrequencyDistribution::Triangular {
                min: 0.5,
                mode: 2.0,
                max: 8.0
            }
            .most_likely(),
            2.0
        );
        assert_eq!(FrequencyDistribution::Poisson { rate: 3.0 }.most_likely(), 3.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let dist = FrequencyDistribution::LogNormal {
            min: 0.1,
            mode: 0.5,
            max: 3.0,
        };
        let json = serde_json::to_string(&dist).unwrap();
        let back: FrequencyDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dist);
    }
}
