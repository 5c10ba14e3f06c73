use rand_distr::LogNormal;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Base seed for the current simulation iteration, set by main before each scenario run
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// When set, every round of every simulation is written as a CSV row to LogEvent::Auction
pub static VERBOSE_AUCTION: AtomicBool = AtomicBool::new(false);

/// Number of simulation runs completed since the counter was last reset
pub static TOTAL_SIMULATION_RUNS: AtomicU64 = AtomicU64::new(0);

/// Derive a per-purpose seed from the global iteration seed
/// Different `offset` values give independent random streams for the same iteration
pub fn get_seed(offset: u64) -> u64 {
    RAND_SEED.load(Ordering::Relaxed).wrapping_mul(1_000_003).wrapping_add(offset)
}

/// Convert mean and standard deviation to log-normal distribution parameters
/// Returns (μ, σ) for LogNormal(μ, σ) that approximates the given mean and stddev
///
/// For LogNormal(μ, σ):
/// - E[X] = exp(μ + σ²/2)
/// - Var[X] = (exp(σ²) - 1) * exp(2μ + σ²)
fn lognormal_from_mean_stddev(mean: f64, stddev: f64) -> (f64, f64) {
    let variance = stddev * stddev;
    let sigma_squared = (1.0 + variance / (mean * mean)).ln();
    let sigma = sigma_squared.sqrt();
    let mu = mean.ln() - sigma_squared / 2.0;
    (mu, sigma)
}

/// Create a log-normal distribution from mean and standard deviation
pub fn lognormal_dist(mean: f64, stddev: f64) -> LogNormal<f64> {
    let (mu, sigma) = lognormal_from_mean_stddev(mean, stddev);
    LogNormal::new(mu, sigma).expect("mean and stddev must be positive and finite")
}

/// Index of the largest element, first occurrence wins on ties
/// Returns None for an empty slice
pub fn argmax_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, value) in values.iter().enumerate() {
        match best {
            Some(best_index) if values[best_index] >= *value => {}
            _ => best = Some(index),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Distribution;

    #[test]
    fn test_argmax_index_first_occurrence() {
        assert_eq!(argmax_index(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax_index(&[5.0]), Some(0));
        assert_eq!(argmax_index(&[]), None);
    }

    #[test]
    fn test_argmax_index_negative_values() {
        // All utilities negative, the least negative one is picked
        assert_eq!(argmax_index(&[-4.0, -1.0, -2.0]), Some(1));
    }

    #[test]
    fn test_lognormal_dist_mean() {
        let dist = lognormal_dist(10.0, 3.0);
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20000;
        let mean: f64 = (0..n).map(|_| dist.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 10.0).abs() < 0.2, "sample mean {} too far from 10.0", mean);
    }
}
