//! Option legs and multi-leg strategies.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::data::calendar::year_fraction;
use crate::data::{OptionQuote, OptionType, Side};
use crate::payoff::SlippageModel;
use crate::pricing::{BlackScholes, PriceGreeks};

use super::catalog::StrategyKind;
use super::risk::{classify, RiskAssessment, RiskClass};

/// A single leg, fixed at construction.
#[derive(Debug, Clone, Serialize)]
pub struct OptionLeg {
    pub side: Side,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub quantity: u32,
    /// Quoted mid at entry (per share).
    pub entry_price: f64,
    pub entry_iv: f64,
    pub bid: f64,
    pub ask: f64,
    /// Quoted bid-ask spread, reused for the exit fill.
    pub spread: f64,
    /// Mid adjusted for entry slippage.
    pub entry_execution_price: f64,
    /// Per-share Greeks at entry conditions.
    pub greeks: PriceGreeks,
    /// Black-Scholes value at entry (diagnostic).
    pub model_price: f64,
}

impl OptionLeg {
    pub fn from_quote(
        quote: &OptionQuote,
        side: Side,
        quantity: u32,
        spot: f64,
        valuation_date: NaiveDate,
        pricer: &BlackScholes,
        slippage: &SlippageModel,
    ) -> Self {
        let t = year_fraction(valuation_date, quote.expiration);
        let greeks = pricer.price_and_greeks(
            spot,
            quote.strike_f64(),
            t,
            quote.mid_iv,
            quote.option_type,
        );
        Self {
            side,
            option_type: quote.option_type,
            strike: quote.strike,
            expiry: quote.expiration,
            quantity,
            entry_price: quote.mid_f64(),
            entry_iv: quote.mid_iv,
            bid: quote.bid_f64(),
            ask: quote.ask_f64(),
            spread: quote.spread_f64(),
            entry_execution_price: slippage.quote_fill(quote, side),
            greeks,
            model_price: greeks.price,
        }
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Sell
    }

    pub fn strike_f64(&self) -> f64 {
        self.strike.try_into().unwrap_or(0.0)
    }

    /// +qty for buys, -qty for sells.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * f64::from(self.quantity)
    }

    /// Cash received at entry (negative when paying), net of slippage.
    pub fn entry_cash_flow(&self, multiplier: f64) -> f64 {
        -self.signed_quantity() * self.entry_execution_price * multiplier
    }
}

/// Position-level Greeks (per contract multiplier, signed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
}

impl NetGreeks {
    pub fn from_legs(legs: &[OptionLeg], multiplier: f64) -> Self {
        legs.iter().fold(Self::default(), |acc, leg| {
            let w = leg.signed_quantity() * multiplier;
            Self {
                delta: acc.delta + w * leg.greeks.delta,
                gamma: acc.gamma + w * leg.greeks.gamma,
                vega: acc.vega + w * leg.greeks.vega,
                theta: acc.theta + w * leg.greeks.theta,
            }
        })
    }
}

/// A catalog structure with its derived entry economics.
#[derive(Debug, Clone, Serialize)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub name: &'static str,
    pub legs: Vec<OptionLeg>,
    pub net_greeks: NetGreeks,
    pub risk: RiskAssessment,
    /// Sum of leg entry cash flows (credit positive).
    pub entry_cash_flow: f64,
    /// Net debit paid (negative for a credit).
    pub entry_cost: f64,
    pub multiplier: f64,
}

impl Strategy {
    pub fn new(kind: StrategyKind, legs: Vec<OptionLeg>, multiplier: f64) -> Self {
        let entry_cash_flow = legs.iter().map(|l| l.entry_cash_flow(multiplier)).sum::<f64>();
        Self {
            kind,
            name: kind.name(),
            net_greeks: NetGreeks::from_legs(&legs, multiplier),
            risk: classify(&legs),
            entry_cash_flow,
            entry_cost: -entry_cash_flow,
            legs,
            multiplier,
        }
    }

    pub fn is_undefined_risk(&self) -> bool {
        self.risk.class == RiskClass::Undefined
    }

    pub fn is_credit(&self) -> bool {
        self.entry_cash_flow > 0.0
    }
}
