//! Closed-form option pricing.

pub mod black_scholes;

pub use black_scholes::{price_and_greeks, BlackScholes, PriceGreeks};
