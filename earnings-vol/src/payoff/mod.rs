//! Strategy payoff under simulated event moves.
//!
//! This module provides:
//! - Half-spread slippage applied separately at entry and exit
//! - Vectorized per-path P&L under an IV scenario
//! - Breakevens and loss/gain extremes

pub mod evaluator;
pub mod profile;
pub mod slippage;

pub use evaluator::PayoffEvaluator;
pub use profile::{breakevens, move_grid, PayoffProfile};
pub use slippage::SlippageModel;
