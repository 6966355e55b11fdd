//! Volatility analytics.
//!
//! Provides:
//! - Event variance extraction from the front/back term structure
//! - Implied move from the front ATM straddle
//! - Historical P75 of realized earnings moves

pub mod event_variance;
pub mod historical;
pub mod implied_move;

pub use event_variance::{
    atm_iv, EventVarianceExtractor, EventVarianceResult, InterpolationMethod, DT_EVENT,
};
pub use historical::{earnings_move_p75, earnings_moves, percentile};
pub use implied_move::{implied_move_from_chain, ImpliedMove};
