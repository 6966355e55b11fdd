pub mod analytics;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod payoff;
pub mod pricing;
pub mod scenario;
pub mod scoring;
pub mod simulation;
pub mod strategy;

// Re-export commonly used types
pub use analytics::{EventVarianceExtractor, EventVarianceResult, InterpolationMethod};
pub use config::EngineConfig;
pub use data::{OptionQuote, OptionType, OptionsChain, OptionsSnapshot, TermStructure};
pub use engine::{AnalysisEngine, AnalysisReport, RunInputs};
pub use error::{EngineError, EngineResult, ModelWarning};
pub use payoff::{PayoffEvaluator, SlippageModel};
pub use pricing::{price_and_greeks, BlackScholes, PriceGreeks};
pub use scenario::{IvScenario, ScenarioState};
pub use scoring::{ScoredStrategy, StrategyMetrics};
pub use simulation::{simulate_moves, MonteCarloSimulator};
pub use strategy::{Strategy, StrategyKind};
