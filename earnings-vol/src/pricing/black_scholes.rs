//! Black-Scholes-Merton pricing and Greeks.
//!
//! European exercise, constant volatility, continuous dividend yield.
//! Time is floored at `TIME_EPSILON`. A non-positive volatility yields
//! intrinsic value with zero Greeks.

use std::f64::consts::{PI, SQRT_2};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::config::{MarketConfig, TIME_EPSILON};
use crate::data::OptionType;

/// Price and first-order Greeks for one contract (per share).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceGreeks {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    /// Per 1.00 change in volatility.
    pub vega: f64,
    /// Per calendar day.
    pub theta: f64,
}

/// Black-Scholes calculator for options pricing and Greeks.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate
    pub rate: f64,
    /// Dividend yield
    pub dividend: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::from_config(&MarketConfig::default())
    }
}

impl BlackScholes {
    pub fn new(rate: f64, dividend: f64) -> Self {
        Self { rate, dividend }
    }

    pub fn from_config(market: &MarketConfig) -> Self {
        Self::new(market.risk_free_rate, market.dividend_yield)
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator =
            (spot / strike).ln() + (self.rate - self.dividend + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    /// Standard normal CDF.
    fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    /// Standard normal PDF.
    fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    /// Price and Greeks in one pass.
    pub fn price_and_greeks(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        opt_type: OptionType,
    ) -> PriceGreeks {
        if vol <= 0.0 || spot <= 0.0 || strike <= 0.0 {
            return PriceGreeks {
                price: opt_type.intrinsic(spot, strike),
                ..PriceGreeks::default()
            };
        }

        let time = time.max(TIME_EPSILON);
        let sqrt_t = time.sqrt();
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = d1 - vol * sqrt_t;
        let discount_d = (-self.dividend * time).exp();
        let discount_r = (-self.rate * time).exp();
        let pdf_d1 = Self::norm_pdf(d1);

        let gamma = discount_d * pdf_d1 / (spot * vol * sqrt_t);
        let vega = spot * discount_d * pdf_d1 * sqrt_t;
        let decay = -spot * discount_d * pdf_d1 * vol / (2.0 * sqrt_t);

        match opt_type {
            OptionType::Call => {
                let nd1 = Self::norm_cdf(d1);
                let nd2 = Self::norm_cdf(d2);
                let price = spot * discount_d * nd1 - strike * discount_r * nd2;
                let theta = decay + self.dividend * spot * discount_d * nd1
                    - self.rate * strike * discount_r * nd2;
                PriceGreeks {
                    price: price.max(0.0),
                    delta: discount_d * nd1,
                    gamma,
                    vega,
                    theta: theta / 365.0,
                }
            }
            OptionType::Put => {
                let nmd1 = Self::norm_cdf(-d1);
                let nmd2 = Self::norm_cdf(-d2);
                let price = strike * discount_r * nmd2 - spot * discount_d * nmd1;
                let theta = decay - self.dividend * spot * discount_d * nmd1
                    + self.rate * strike * discount_r * nmd2;
                PriceGreeks {
                    price: price.max(0.0),
                    delta: -discount_d * nmd1,
                    gamma,
                    vega,
                    theta: theta / 365.0,
                }
            }
        }
    }

    pub fn price(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        self.price_and_greeks(spot, strike, time, vol, opt_type).price
    }

    /// Price one contract across many spot levels.
    pub fn price_batch(
        &self,
        spots: &Array1<f64>,
        strike: f64,
        time: f64,
        vol: f64,
        opt_type: OptionType,
    ) -> Array1<f64> {
        if vol <= 0.0 {
            return spots.mapv(|s| opt_type.intrinsic(s, strike));
        }
        spots.mapv(|s| self.price(s, strike, time, vol, opt_type))
    }
}

/// Free-function form of [`BlackScholes::price_and_greeks`].
pub fn price_and_greeks(
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    vol: f64,
    rate: f64,
    dividend_yield: f64,
    opt_type: OptionType,
) -> PriceGreeks {
    BlackScholes::new(rate, dividend_yield).price_and_greeks(
        spot,
        strike,
        time_to_expiry,
        vol,
        opt_type,
    )
}
