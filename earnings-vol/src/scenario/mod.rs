//! Deterministic post-event IV scenarios.

pub mod iv_scenario;

pub use iv_scenario::{AtmLevels, ExpiryBucket, IvScenario, ScenarioShift, ScenarioState};
