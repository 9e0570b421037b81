//! Tools to generate seeded, clamped noise for stimulus schedules.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Normal, Distribution};


/// Calculates the normal distribution at the given mean and standard deviation and clamps
/// the output value between the given minimum and maximum, if standard deviation is `0.` the
/// mean is always returned, draws from the given generator so schedules stay reproducible
pub fn limited_distr<R: Rng>(
    rng: &mut R,
    mean: f64,
    std: f64,
    minimum: f64,
    maximum: f64,
) -> f64 {
    if std == 0.0 {
        return mean;
    }

    let normal = Normal::new(mean, std).unwrap();
    let output: f64 = normal.sample(rng);

    output.max(minimum).min(maximum)
}

/// Draws `n` uniform values within `[low, high)`, the spread used for synaptic
/// pool delays, seeded so that repeated runs produce the same schedule
pub fn uniform_jitter(seed: u64, low: f64, high: f64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);

    if high <= low {
        return vec![low; n];
    }

    (0..n).map(|_| rng.gen_range(low..high)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_std_returns_mean() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(limited_distr(&mut rng, 1.5, 0., 0., 2.), 1.5);
    }

    #[test]
    fn jitter_is_reproducible_and_bounded() {
        let a = uniform_jitter(42, 10., 20., 16);
        let b = uniform_jitter(42, 10., 20., 16);
        let c = uniform_jitter(43, 10., 20., 16);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|i| *i >= 10. && *i < 20.));
    }

    #[test]
    fn degenerate_range_collapses_to_low() {
        assert_eq!(uniform_jitter(1, 5., 5., 3), vec![5., 5., 5.]);
    }
}
