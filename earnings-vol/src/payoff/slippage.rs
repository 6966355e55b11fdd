//! Half-spread slippage model.
//!
//! Every fill crosses a fraction of half the quoted bid-ask spread:
//!
//! | Side | Fill                                 |
//! |------|--------------------------------------|
//! | Buy  | mid + 0.5 * spread * fraction        |
//! | Sell | mid - 0.5 * spread * fraction        |
//!
//! Entry and exit are charged separately, each at the leg's quoted spread.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::{OptionQuote, Side};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageModel {
    /// Fraction of the half-spread crossed on each fill.
    pub fraction: f64,
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self { fraction: 0.10 }
    }
}

impl SlippageModel {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    /// Fills at mid.
    pub fn zero() -> Self {
        Self { fraction: 0.0 }
    }

    /// Same model with the fraction scaled.
    pub fn stressed(&self, multiplier: f64) -> Self {
        Self {
            fraction: self.fraction * multiplier,
        }
    }

    /// Price concession per share for one fill.
    pub fn adjustment(&self, spread: f64) -> f64 {
        0.5 * spread.max(0.0) * self.fraction
    }

    pub fn execution_price(&self, mid: f64, spread: f64, side: Side) -> f64 {
        mid + side.sign() * self.adjustment(spread)
    }

    pub fn buy_fill(&self, mid: f64, spread: f64) -> f64 {
        self.execution_price(mid, spread, Side::Buy)
    }

    pub fn sell_fill(&self, mid: f64, spread: f64) -> f64 {
        self.execution_price(mid, spread, Side::Sell)
    }

    /// Execution price for a quote at its own mid and spread.
    pub fn quote_fill(&self, quote: &OptionQuote, side: Side) -> f64 {
        self.execution_price(quote.mid_f64(), quote.spread_f64(), side)
    }

    /// Vectorized fills over an array of mids sharing one spread.
    pub fn execution_prices(&self, mids: &Array1<f64>, spread: f64, side: Side) -> Array1<f64> {
        let shift = side.sign() * self.adjustment(spread);
        mids.mapv(|m| m + shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_buy_and_sell_fill() {
        let model = SlippageModel::new(0.10);
        // half spread 0.05, 10% of it = 0.005
        assert_relative_eq!(model.buy_fill(1.05, 0.10), 1.055, epsilon = 1e-12);
        assert_relative_eq!(model.sell_fill(1.05, 0.10), 1.045, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_model_fills_at_mid() {
        let model = SlippageModel::zero();
        assert_eq!(model.buy_fill(2.0, 0.4), 2.0);
        assert_eq!(model.sell_fill(2.0, 0.4), 2.0);
    }

    #[test]
    fn test_full_fraction_fills_at_touch() {
        let model = SlippageModel::new(1.0);
        assert_relative_eq!(model.buy_fill(1.05, 0.10), 1.10, epsilon = 1e-12);
        assert_relative_eq!(model.sell_fill(1.05, 0.10), 1.00, epsilon = 1e-12);
    }

    #[test]
    fn test_vectorized_matches_scalar() {
        let model = SlippageModel::new(0.25);
        let mids = Array1::from(vec![0.5, 1.0, 3.0]);
        let fills = model.execution_prices(&mids, 0.2, Side::Sell);
        for (m, f) in mids.iter().zip(fills.iter()) {
            assert_relative_eq!(*f, model.sell_fill(*m, 0.2), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_stressed_doubles_cost() {
        let model = SlippageModel::new(0.10).stressed(2.0);
        assert_relative_eq!(model.adjustment(0.10), 0.01, epsilon = 1e-12);
    }
}
