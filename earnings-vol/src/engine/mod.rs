//! End-to-end analysis of one earnings event.

pub mod report;
pub mod runner;

pub use report::{AnalysisReport, RunInputs, SimulationSummary, SlippageSensitivity};
pub use runner::{check_expiry_guards, AnalysisEngine};
