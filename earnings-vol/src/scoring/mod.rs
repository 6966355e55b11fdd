//! Strategy scoring.
//!
//! Reduces each strategy's simulated P&L to tail-aware metrics, combines
//! them into a population-relative composite and ranks the result.

pub mod composite;
pub mod metrics;
pub mod ranker;

pub use composite::{min_max_normalize, CompositeScorer, EvaluatedStrategy, ScoreBreakdown, ScoredStrategy};
pub use metrics::{
    capital_ratio, convexity, cvar, expected_move_dollar, expected_value, robustness, Convexity,
    MetricsCalculator, ScenarioEv, StrategyMetrics,
};
pub use ranker::rank;
