//! Seeded random number generation for Monte Carlo simulations.
//!
//! [`SimRng`] wraps a seeded [`StdRng`] with batch fill operations, and
//! derives independent per-path substreams from a base seed so that
//! parallel path generation is schedule-independent: path `i` always sees
//! the same draws no matter which thread generates it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// SplitMix64 finaliser, used to decorrelate per-path substream seeds.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Monte Carlo simulation random number generator.
///
/// Provides seeded, reproducible random number generation with batch
/// operations for standard normal variates.
///
/// # Examples
///
/// ```
/// use risk_simulation::SimRng;
///
/// let mut rng1 = SimRng::from_seed(42);
/// let mut rng2 = SimRng::from_seed(42);
/// assert_eq!(rng1.gen_normal(), rng2.gen_normal());
/// ```
pub struct SimRng {
    inner: StdRng,
    seed: u64,
}

impl SimRng {
    /// Create an RNG initialised with the given seed.
    ///
    /// The same seed always produces the same sequence, enabling
    /// reproducible simulations.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Derive the substream for path `index` from a base seed.
    ///
    /// Substream seeds are decorrelated with a SplitMix64 mix so that
    /// adjacent path indices do not produce correlated draws. This is what
    /// makes parallel generation deterministic: the draws for a path depend
    /// only on `(base_seed, index)`, never on thread scheduling.
    #[inline]
    pub fn path_stream(base_seed: u64, index: u64) -> Self {
        Self::from_seed(splitmix64(
            base_seed ^ index.wrapping_mul(0xD6E8_FEB8_6659_FD93),
        ))
    }

    /// The seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a single uniform value in [0, 1).
    #[inline]
    pub fn gen_uniform(&mut self) -> f64 {
        self.inner.gen()
    }

    /// Generate a single standard normal variate.
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Fill the buffer with standard normal variates.
    ///
    /// Zero-allocation; the buffer is pre-allocated by the caller.
    #[inline]
    pub fn fill_normal(&mut self, buffer: &mut [f64]) {
        for value in buffer.iter_mut() {
            *value = StandardNormal.sample(&mut self.inner);
        }
    }

    /// Sample from an arbitrary `rand_distr` distribution.
    #[inline]
    pub fn sample<D: Distribution<f64>>(&mut self, dist: &D) -> f64 {
        dist.sample(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut rng1 = SimRng::from_seed(12345);
        let mut rng2 = SimRng::from_seed(12345);

        for _ in 0..100 {
            assert_eq!(rng1.gen_normal(), rng2.gen_normal());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut rng1 = SimRng::from_seed(1);
        let mut rng2 = SimRng::from_seed(2);

        let a: Vec<f64> = (0..10).map(|_| rng1.gen_normal()).collect();
        let b: Vec<f64> = (0..10).map(|_| rng2.gen_normal()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_accessor() {
        let rng = SimRng::from_seed(42);
        assert_eq!(rng.seed(), 42);
    }

    #[test]
    fn test_gen_uniform_range() {
        let mut rng = SimRng::from_seed(7);
        for _ in 0..1000 {
            let u = rng.gen_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_fill_normal_reproducible() {
        let mut rng1 = SimRng::from_seed(99);
        let mut rng2 = SimRng::from_seed(99);

        let mut buf1 = vec![0.0; 256];
        let mut buf2 = vec![0.0; 256];
        rng1.fill_normal(&mut buf1);
        rng2.fill_normal(&mut buf2);
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn test_fill_normal_empty_buffer() {
        let mut rng = SimRng::from_seed(1);
        let mut buf: Vec<f64> = vec![];
        rng.fill_normal(&mut buf);
    }

    #[test]
    fn test_path_streams_are_independent() {
        let mut s0 = SimRng::path_stream(42, 0);
        let mut s1 = SimRng::path_stream(42, 1);

        let a: Vec<f64> = (0..10).map(|_| s0.gen_normal()).collect();
        let b: Vec<f64> = (0..10).map(|_| s1.gen_normal()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_path_stream_deterministic() {
        let mut s1 = SimRng::path_stream(42, 17);
        let mut s2 = SimRng::path_stream(42, 17);
        assert_eq!(s1.gen_normal(), s2.gen_normal());
    }

    #[test]
    fn test_normal_sample_statistics() {
        let mut rng = SimRng::from_seed(2024);
        let mut buf = vec![0.0; 100_000];
        rng.fill_normal(&mut buf);

        let mean = risk_core::stats::mean(&buf);
        let std = risk_core::stats::std_dev(&buf);
        assert!(mean.abs() < 0.02, "mean = {}", mean);
        assert!((std - 1.0).abs() < 0.02, "std = {}", std);
    }
}
