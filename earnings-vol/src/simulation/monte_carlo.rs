//! Monte Carlo event-move simulator.
//!
//! Draws one-day relative moves `exp(-0.5 s^2 + s Z) - 1` with
//! `s = event_vol / sqrt(252)`, so that `E[1 + move] = 1`. Each call owns
//! its RNG, seeded explicitly, so identical inputs give bit-identical
//! output regardless of threading.

use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::Serialize;
use tracing::debug;

use crate::config::{SimulationConfig, TRADING_DAYS_PER_YEAR};
use crate::error::ModelWarning;

/// Draw `n_samples` relative moves for an annualized event vol.
pub fn simulate_moves(event_vol_annualized: f64, n_samples: usize, seed: u64) -> Array1<f64> {
    if !(event_vol_annualized > 0.0) {
        return Array1::zeros(n_samples);
    }
    let sigma = event_vol_annualized / TRADING_DAYS_PER_YEAR.sqrt();
    let drift = -0.5 * sigma * sigma;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array1::from_iter((0..n_samples).map(|_| {
        let z: f64 = rng.sample(StandardNormal);
        (drift + sigma * z).exp() - 1.0
    }))
}

/// Sample mean and population standard deviation.
pub fn sample_stats(moves: &Array1<f64>) -> (f64, f64) {
    if moves.is_empty() {
        return (0.0, 0.0);
    }
    let mean = moves.mean().unwrap_or(0.0);
    (mean, moves.std(0.0))
}

/// Seed for the `index`-th derived stream of a run.
pub fn fork_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(1000 + index as u64)
}

/// Simulated moves plus their validation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct MoveSample {
    pub event_vol: f64,
    pub seed: u64,
    pub daily_vol: f64,
    pub sample_mean: f64,
    pub sample_std: f64,
    #[serde(skip)]
    pub moves: Array1<f64>,
    pub warning: Option<ModelWarning>,
}

pub struct MonteCarloSimulator {
    n_samples: usize,
    seed: u64,
    tolerance: f64,
}

impl MonteCarloSimulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            n_samples: config.n_samples,
            seed: config.seed,
            tolerance: config.validation_tolerance,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulate with the run seed.
    pub fn simulate(&self, event_vol: f64) -> MoveSample {
        self.simulate_with_seed(event_vol, self.seed)
    }

    /// Simulate and validate. A tolerance breach is logged and returned
    /// as a warning; the sample is kept.
    pub fn simulate_with_seed(&self, event_vol: f64, seed: u64) -> MoveSample {
        let moves = simulate_moves(event_vol, self.n_samples, seed);
        let daily_vol = event_vol.max(0.0) / TRADING_DAYS_PER_YEAR.sqrt();
        let (sample_mean, sample_std) = sample_stats(&moves);

        let bound = self.tolerance * daily_vol;
        let within =
            sample_mean.abs() <= bound && (sample_std - daily_vol).abs() <= bound;
        let warning = (!within).then(|| ModelWarning::MonteCarloTolerance {
            event_vol,
            sample_mean,
            sample_std,
            target_std: daily_vol,
        });
        if let Some(w) = &warning {
            w.emit();
        }
        debug!(
            event_vol,
            seed,
            sample_mean,
            sample_std,
            target_std = daily_vol,
            "simulated moves"
        );

        MoveSample {
            event_vol,
            seed,
            daily_vol,
            sample_mean,
            sample_std,
            moves,
            warning,
        }
    }

    /// One sample per vol-of-vol shock (percent). Shock 0 uses the run
    /// seed; every other level uses a seed forked by its position.
    pub fn shock_sweep(&self, event_vol: f64, shocks_pct: &[f64]) -> Vec<(f64, MoveSample)> {
        shocks_pct
            .iter()
            .enumerate()
            .map(|(idx, shock)| {
                let vol = (event_vol * (1.0 + shock / 100.0)).max(0.0);
                let seed = if *shock == 0.0 {
                    self.seed
                } else {
                    fork_seed(self.seed, idx)
                };
                (*shock, self.simulate_with_seed(vol, seed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_determinism() {
        let a = simulate_moves(1.2, 100_000, 42);
        let b = simulate_moves(1.2, 100_000, 42);
        assert_eq!(a, b);
        let c = simulate_moves(1.2, 100_000, 43);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_vol_gives_zero_moves() {
        let moves = simulate_moves(0.0, 1000, 42);
        assert_eq!(moves.len(), 1000);
        assert!(moves.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn test_moments_match_target() {
        let vol = 1.4;
        let sigma = vol / 252f64.sqrt();
        let moves = simulate_moves(vol, 100_000, 42);
        let (mean, std) = sample_stats(&moves);
        assert!(mean.abs() < 0.03 * sigma);
        assert_relative_eq!(std, sigma, max_relative = 0.03);
        assert!(moves.iter().all(|m| *m > -1.0));
    }

    #[test]
    fn test_simulator_validation_passes_for_large_sample() {
        let sim = MonteCarloSimulator::new(&SimulationConfig::default());
        let sample = sim.simulate(0.9);
        assert!(sample.warning.is_none());
        assert_eq!(sample.moves.len(), 100_000);
    }

    #[test]
    fn test_tiny_sample_flags_warning() {
        let config = SimulationConfig {
            n_samples: 20,
            validation_tolerance: 1e-6,
            ..SimulationConfig::default()
        };
        let sample = MonteCarloSimulator::new(&config).simulate(0.9);
        assert!(matches!(
            sample.warning,
            Some(ModelWarning::MonteCarloTolerance { .. })
        ));
        assert_eq!(sample.moves.len(), 20);
    }

    #[test]
    fn test_shock_sweep_seeds() {
        let config = SimulationConfig {
            n_samples: 1000,
            ..SimulationConfig::default()
        };
        let sim = MonteCarloSimulator::new(&config);
        let sweep = sim.shock_sweep(1.0, &[0.0, -10.0, 10.0]);
        assert_eq!(sweep.len(), 3);
        assert_eq!(sweep[0].1.seed, 42);
        assert_eq!(sweep[0].1.moves, sim.simulate(1.0).moves);
        assert_relative_eq!(sweep[1].1.event_vol, 0.9, epsilon = 1e-12);
        assert_relative_eq!(sweep[2].1.event_vol, 1.1, epsilon = 1e-12);
        assert_ne!(sweep[1].1.seed, sweep[2].1.seed);
    }
}
