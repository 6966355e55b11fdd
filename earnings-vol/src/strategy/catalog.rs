//! Fixed catalog of earnings structures.
//!
//! | Kind          | Legs                                                  |
//! |---------------|-------------------------------------------------------|
//! | long_call     | buy ATM call                                          |
//! | long_put      | buy ATM put                                           |
//! | long_straddle | buy ATM call + ATM put                                |
//! | long_strangle | buy OTM call + OTM put                                |
//! | call_spread   | buy ATM call, sell OTM call                           |
//! | put_spread    | buy ATM put, sell OTM put                             |
//! | iron_condor   | sell OTM call/put, buy wings beyond each              |
//! | calendar      | sell front ATM call, buy back1 call at the same strike|
//!
//! OTM targets are `spot * (1 +/- offset)`; wings sit `wing_pct` beyond
//! the short strikes. Every strike is the nearest quoted strike of the
//! required type.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::data::{OptionQuote, OptionType, OptionsChain, Side};
use crate::error::{EngineError, EngineResult};
use crate::payoff::SlippageModel;
use crate::pricing::BlackScholes;

use super::leg::{OptionLeg, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    LongCall,
    LongPut,
    LongStraddle,
    LongStrangle,
    CallSpread,
    PutSpread,
    IronCondor,
    Calendar,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        Self::LongCall,
        Self::LongPut,
        Self::LongStraddle,
        Self::LongStrangle,
        Self::CallSpread,
        Self::PutSpread,
        Self::IronCondor,
        Self::Calendar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LongCall => "long_call",
            Self::LongPut => "long_put",
            Self::LongStraddle => "long_straddle",
            Self::LongStrangle => "long_strangle",
            Self::CallSpread => "call_spread",
            Self::PutSpread => "put_spread",
            Self::IronCondor => "iron_condor",
            Self::Calendar => "calendar",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Construct this structure from the builder's market context.
    pub fn build(&self, builder: &StructureBuilder<'_>) -> EngineResult<Strategy> {
        use OptionType::{Call, Put};
        use Side::{Buy, Sell};

        let b = builder;
        let legs = match self {
            Self::LongCall => vec![b.leg(b.atm(Call)?, Buy)],
            Self::LongPut => vec![b.leg(b.atm(Put)?, Buy)],
            Self::LongStraddle => {
                let (call, put) = b.atm_pair()?;
                vec![b.leg(call, Buy), b.leg(put, Buy)]
            }
            Self::LongStrangle => vec![b.leg(b.otm(Call)?, Buy), b.leg(b.otm(Put)?, Buy)],
            Self::CallSpread => vec![b.leg(b.atm(Call)?, Buy), b.leg(b.otm(Call)?, Sell)],
            Self::PutSpread => vec![b.leg(b.atm(Put)?, Buy), b.leg(b.otm(Put)?, Sell)],
            Self::IronCondor => {
                let short_call = b.otm(Call)?;
                let short_put = b.otm(Put)?;
                vec![
                    b.leg(short_call, Sell),
                    b.leg(b.wing(short_call)?, Buy),
                    b.leg(short_put, Sell),
                    b.leg(b.wing(short_put)?, Buy),
                ]
            }
            Self::Calendar => {
                let (front, back) = b.calendar_pair()?;
                vec![b.leg(front, Sell), b.leg(back, Buy)]
            }
        };

        let strategy = Strategy::new(*self, legs, b.multiplier);
        debug!(
            strategy = strategy.name,
            legs = strategy.legs.len(),
            entry_cost = strategy.entry_cost,
            risk = ?strategy.risk.class,
            "built structure"
        );
        Ok(strategy)
    }
}

/// Market context shared by every catalog entry.
pub struct StructureBuilder<'a> {
    front: &'a OptionsChain,
    back: &'a OptionsChain,
    spot: f64,
    offset_fraction: f64,
    wing_pct: f64,
    valuation_date: NaiveDate,
    pricer: BlackScholes,
    slippage: SlippageModel,
    multiplier: f64,
}

impl<'a> StructureBuilder<'a> {
    /// `offset_fraction` comes from the live implied move and must lie
    /// in (0, 0.5).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        front: &'a OptionsChain,
        back: &'a OptionsChain,
        spot: f64,
        offset_fraction: f64,
        wing_pct: f64,
        valuation_date: NaiveDate,
        pricer: BlackScholes,
        slippage: SlippageModel,
        multiplier: f64,
    ) -> EngineResult<Self> {
        if !(offset_fraction > 0.0 && offset_fraction < 0.5) {
            return Err(EngineError::config(format!(
                "offset fraction must be in (0, 0.5), got {}",
                offset_fraction
            )));
        }
        if !(wing_pct > 0.0 && wing_pct < 1.0) {
            return Err(EngineError::config(format!(
                "wing pct must be in (0, 1), got {}",
                wing_pct
            )));
        }
        if !(spot > 0.0) {
            return Err(EngineError::data("spot must be positive"));
        }
        Ok(Self {
            front,
            back,
            spot,
            offset_fraction,
            wing_pct,
            valuation_date,
            pricer,
            slippage,
            multiplier,
        })
    }

    /// Build the whole catalog in order.
    pub fn build_all(&self) -> EngineResult<Vec<Strategy>> {
        StrategyKind::ALL.iter().map(|k| k.build(self)).collect()
    }

    fn leg(&self, quote: &OptionQuote, side: Side) -> OptionLeg {
        OptionLeg::from_quote(
            quote,
            side,
            1,
            self.spot,
            self.valuation_date,
            &self.pricer,
            &self.slippage,
        )
    }

    fn nearest(&self, target: f64, option_type: OptionType) -> EngineResult<&'a OptionQuote> {
        self.front.nearest(target, option_type).ok_or_else(|| {
            EngineError::data(format!(
                "no {:?} quotes in front chain {}",
                option_type, self.front.expiration
            ))
        })
    }

    fn atm(&self, option_type: OptionType) -> EngineResult<&'a OptionQuote> {
        self.nearest(self.spot, option_type)
    }

    fn otm(&self, option_type: OptionType) -> EngineResult<&'a OptionQuote> {
        let target = match option_type {
            OptionType::Call => self.spot * (1.0 + self.offset_fraction),
            OptionType::Put => self.spot * (1.0 - self.offset_fraction),
        };
        self.nearest(target, option_type)
    }

    fn wing(&self, short: &OptionQuote) -> EngineResult<&'a OptionQuote> {
        let target = match short.option_type {
            OptionType::Call => short.strike_f64() * (1.0 + self.wing_pct),
            OptionType::Put => short.strike_f64() * (1.0 - self.wing_pct),
        };
        self.nearest(target, short.option_type)
    }

    /// Call and put at the strike nearest spot quoted on both sides.
    fn atm_pair(&self) -> EngineResult<(&'a OptionQuote, &'a OptionQuote)> {
        let front = self.front;
        front
            .calls
            .iter()
            .filter_map(|c| front.put_at_strike(c.strike).map(|p| (c, p)))
            .min_by(|(a, _), (b, _)| {
                (a.strike_f64() - self.spot)
                    .abs()
                    .total_cmp(&(b.strike_f64() - self.spot).abs())
                    .then(a.strike.cmp(&b.strike))
            })
            .ok_or_else(|| {
                EngineError::data(format!(
                    "no strike with both call and put in front chain {}",
                    front.expiration
                ))
            })
    }

    /// Front and back calls at the common strike nearest spot.
    fn calendar_pair(&self) -> EngineResult<(&'a OptionQuote, &'a OptionQuote)> {
        let back = self.back;
        self.front
            .calls
            .iter()
            .filter_map(|f| back.call_at_strike(f.strike).map(|b| (f, b)))
            .min_by(|(a, _), (b, _)| {
                (a.strike_f64() - self.spot)
                    .abs()
                    .total_cmp(&(b.strike_f64() - self.spot).abs())
                    .then(a.strike.cmp(&b.strike))
            })
            .ok_or_else(|| {
                EngineError::data(format!(
                    "no common call strike between {} and {}",
                    self.front.expiration, back.expiration
                ))
            })
    }
}
