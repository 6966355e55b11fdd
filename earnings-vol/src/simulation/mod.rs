//! Terminal move simulation.

pub mod monte_carlo;

pub use monte_carlo::{fork_seed, sample_stats, simulate_moves, MonteCarloSimulator, MoveSample};
