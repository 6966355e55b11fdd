//! Core data types for earnings-event chain analysis.
//!
//! Quotes keep prices as `Decimal` the way they arrive from the data
//! source; analytics convert to `f64` at the point of use.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calendar::year_fraction;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }

    /// Terminal intrinsic value.
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buy, -1 for sell.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    /// The closing side of a position opened on `self`.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// A single option quote from a chain snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Option expiration date
    pub expiration: NaiveDate,

    /// Strike price
    pub strike: Decimal,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Bid price
    pub bid: Decimal,

    /// Ask price
    pub ask: Decimal,

    /// Mid price (calculated)
    pub mid: Decimal,

    /// Open interest
    pub open_interest: i64,

    /// Mid implied volatility (annualized, decimal)
    pub mid_iv: f64,
}

impl OptionQuote {
    /// Build a quote, deriving mid from bid and ask.
    pub fn new(
        expiration: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
        bid: Decimal,
        ask: Decimal,
        open_interest: i64,
        mid_iv: f64,
    ) -> Self {
        Self {
            expiration,
            strike,
            option_type,
            bid,
            ask,
            mid: (bid + ask) / Decimal::TWO,
            open_interest,
            mid_iv,
        }
    }

    /// Calculate bid-ask spread as percentage of mid.
    pub fn spread_pct(&self) -> f64 {
        if self.mid.is_zero() {
            return 0.0;
        }
        let spread = self.ask - self.bid;
        (spread / self.mid).try_into().unwrap_or(0.0)
    }

    /// Check if the option has reasonable liquidity.
    pub fn is_liquid(&self, min_oi: i64, max_spread_pct: f64) -> bool {
        self.mid > Decimal::ZERO
            && self.open_interest >= min_oi
            && self.spread_pct() <= max_spread_pct
    }

    pub fn strike_f64(&self) -> f64 {
        self.strike.try_into().unwrap_or(0.0)
    }

    pub fn bid_f64(&self) -> f64 {
        self.bid.try_into().unwrap_or(0.0)
    }

    pub fn ask_f64(&self) -> f64 {
        self.ask.try_into().unwrap_or(0.0)
    }

    pub fn mid_f64(&self) -> f64 {
        self.mid.try_into().unwrap_or(0.0)
    }

    /// Quoted spread in dollars.
    pub fn spread_f64(&self) -> f64 {
        (self.ask - self.bid).try_into().unwrap_or(0.0)
    }
}

/// All options for a single expiration date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsChain {
    /// Expiration date for this chain
    pub expiration: NaiveDate,

    /// Calendar days to expiration
    pub dte: i32,

    pub calls: Vec<OptionQuote>,

    pub puts: Vec<OptionQuote>,
}

impl OptionsChain {
    /// Create a new empty chain.
    pub fn new(expiration: NaiveDate, dte: i32) -> Self {
        Self {
            expiration,
            dte,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    /// Add a quote to the appropriate side.
    pub fn add_quote(&mut self, quote: OptionQuote) {
        match quote.option_type {
            OptionType::Call => self.calls.push(quote),
            OptionType::Put => self.puts.push(quote),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    /// Iterate over calls then puts.
    pub fn quotes(&self) -> impl Iterator<Item = &OptionQuote> {
        self.calls.iter().chain(self.puts.iter())
    }

    /// Quotes of one type.
    pub fn side(&self, option_type: OptionType) -> &[OptionQuote] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Get all strikes available in this chain.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self.quotes().map(|q| q.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    /// Find a call at a specific strike.
    pub fn call_at_strike(&self, strike: Decimal) -> Option<&OptionQuote> {
        self.calls.iter().find(|q| q.strike == strike)
    }

    /// Find a put at a specific strike.
    pub fn put_at_strike(&self, strike: Decimal) -> Option<&OptionQuote> {
        self.puts.iter().find(|q| q.strike == strike)
    }

    /// Quote of the given type whose strike is nearest `target`.
    /// Ties go to the lower strike.
    pub fn nearest(&self, target: f64, option_type: OptionType) -> Option<&OptionQuote> {
        nearest_by_strike(self.side(option_type).iter(), target)
    }

    /// Strike nearest `target` across both sides.
    pub fn nearest_strike(&self, target: f64) -> Option<Decimal> {
        nearest_by_strike(self.quotes(), target).map(|q| q.strike)
    }
}

fn nearest_by_strike<'a>(
    quotes: impl Iterator<Item = &'a OptionQuote>,
    target: f64,
) -> Option<&'a OptionQuote> {
    quotes.min_by(|a, b| {
        let da = (a.strike_f64() - target).abs();
        let db = (b.strike_f64() - target).abs();
        da.total_cmp(&db).then(a.strike.cmp(&b.strike))
    })
}

/// Complete options snapshot for one underlying on one date.
#[derive(Debug, Clone, Default)]
pub struct OptionsSnapshot {
    /// Trading date
    pub date: NaiveDate,

    /// Underlying symbol
    pub ticker: String,

    /// Underlying price
    pub underlying_price: Decimal,

    /// All option chains sorted by expiration
    pub chains: Vec<OptionsChain>,
}

impl OptionsSnapshot {
    /// Create a new empty snapshot.
    pub fn new(date: NaiveDate, ticker: String, underlying_price: Decimal) -> Self {
        Self {
            date,
            ticker,
            underlying_price,
            chains: Vec::new(),
        }
    }

    /// Get chain for a specific expiration.
    pub fn chain_at_expiration(&self, expiration: NaiveDate) -> Option<&OptionsChain> {
        self.chains.iter().find(|c| c.expiration == expiration)
    }

    /// Chains expiring strictly after `date`, in expiry order.
    pub fn chains_after(&self, date: NaiveDate) -> Vec<&OptionsChain> {
        self.chains.iter().filter(|c| c.expiration > date).collect()
    }

    /// Total number of option quotes in this snapshot.
    pub fn total_quotes(&self) -> usize {
        self.chains.iter().map(|c| c.len()).sum()
    }

    pub fn spot(&self) -> f64 {
        self.underlying_price.try_into().unwrap_or(0.0)
    }
}

/// Front, back1 and optional back2 chains around an event, each with a
/// time to expiry measured from the valuation date.
#[derive(Debug, Clone)]
pub struct TermStructure {
    pub valuation_date: NaiveDate,
    pub front: OptionsChain,
    pub back1: OptionsChain,
    pub back2: Option<OptionsChain>,
}

impl TermStructure {
    pub fn new(
        valuation_date: NaiveDate,
        front: OptionsChain,
        back1: OptionsChain,
        back2: Option<OptionsChain>,
    ) -> Self {
        Self {
            valuation_date,
            front,
            back1,
            back2,
        }
    }

    /// Years from the valuation date to `expiry` (trading days / 252).
    pub fn time_to(&self, expiry: NaiveDate) -> f64 {
        year_fraction(self.valuation_date, expiry)
    }

    pub fn t_front(&self) -> f64 {
        self.time_to(self.front.expiration)
    }

    pub fn t_back1(&self) -> f64 {
        self.time_to(self.back1.expiration)
    }

    pub fn t_back2(&self) -> Option<f64> {
        self.back2.as_ref().map(|c| self.time_to(c.expiration))
    }

    /// Chain for a given expiry, if it is part of this structure.
    pub fn chain_for(&self, expiry: NaiveDate) -> Option<&OptionsChain> {
        if self.front.expiration == expiry {
            Some(&self.front)
        } else if self.back1.expiration == expiry {
            Some(&self.back1)
        } else {
            self.back2.as_ref().filter(|c| c.expiration == expiry)
        }
    }

    pub fn chains(&self) -> impl Iterator<Item = &OptionsChain> {
        [Some(&self.front), Some(&self.back1), self.back2.as_ref()]
            .into_iter()
            .flatten()
    }
}

/// Daily close of the underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}
