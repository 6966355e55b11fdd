//! Deterministic synthetic market data.
//!
//! Generates option chains with skew, smile, spreads and open interest,
//! plus a price history with earnings gaps, so the full pipeline can run
//! without market data. Every generator takes an explicit seed.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pricing::BlackScholes;

use super::calendar::{add_trading_days, is_trading_day, previous_trading_day, year_fraction};
use super::types::{OptionQuote, OptionType, OptionsChain, PriceBar, TermStructure};

pub const DEFAULT_SPOT: f64 = 130.0;
pub const DEFAULT_STRIKE_STEP: f64 = 2.5;
pub const DEFAULT_STRIKES_COUNT: usize = 41;
const SYNTHETIC_RATE: f64 = 0.05;
const HISTORY_YEARS: usize = 5;

/// Named market presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticScenario {
    Baseline,
    HighVol,
    LowVol,
    TermInverted,
    FlatTerm,
    NegativeEventVar,
    ExtremeFrontPremium,
    SparseChain,
}

/// Volatility surface shape for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioParams {
    pub base_iv: f64,
    /// Put skew slope.
    pub iv_skew: f64,
    /// Back-expiry IV offset from base.
    pub term_structure_slope: f64,
    /// Front-expiry IV premium over base.
    pub event_vol_premium: f64,
    pub num_strikes: usize,
    pub spread_multiplier: f64,
}

impl SyntheticScenario {
    pub const ALL: [SyntheticScenario; 8] = [
        Self::Baseline,
        Self::HighVol,
        Self::LowVol,
        Self::TermInverted,
        Self::FlatTerm,
        Self::NegativeEventVar,
        Self::ExtremeFrontPremium,
        Self::SparseChain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::HighVol => "high_vol",
            Self::LowVol => "low_vol",
            Self::TermInverted => "term_inverted",
            Self::FlatTerm => "flat_term",
            Self::NegativeEventVar => "negative_event_var",
            Self::ExtremeFrontPremium => "extreme_front_premium",
            Self::SparseChain => "sparse_chain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Baseline => "Balanced market with normal vol structure",
            Self::HighVol => "Elevated vol environment with pronounced skew",
            Self::LowVol => "Complacent market with flat skew",
            Self::TermInverted => "Inverted term structure, high event premium",
            Self::FlatTerm => "Flat term structure with no event premium",
            Self::NegativeEventVar => "Front IV below a flat back term structure",
            Self::ExtremeFrontPremium => "Front variance dominated by the event",
            Self::SparseChain => "Thin option chain with wide spreads",
        }
    }

    pub fn params(&self) -> ScenarioParams {
        let (base_iv, iv_skew, term_structure_slope, event_vol_premium) = match self {
            Self::Baseline => (0.55, 0.03, 0.02, 0.10),
            Self::HighVol => (0.85, 0.05, 0.01, 0.15),
            Self::LowVol => (0.35, 0.015, 0.03, 0.05),
            Self::TermInverted => (0.60, 0.04, -0.02, 0.20),
            Self::FlatTerm => (0.55, 0.02, 0.0, 0.0),
            Self::NegativeEventVar => (0.55, 0.02, 0.0, -0.06),
            Self::ExtremeFrontPremium => (0.40, 0.02, 0.0, 0.60),
            Self::SparseChain => (0.50, 0.04, 0.02, 0.10),
        };
        let (num_strikes, spread_multiplier) = match self {
            Self::SparseChain => (15, 2.0),
            _ => (DEFAULT_STRIKES_COUNT, 1.0),
        };
        ScenarioParams {
            base_iv,
            iv_skew,
            term_structure_slope,
            event_vol_premium,
            num_strikes,
            spread_multiplier,
        }
    }
}

/// Inputs for one synthetic chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub spot: f64,
    pub valuation_date: NaiveDate,
    pub expiry: NaiveDate,
    pub base_iv: f64,
    pub iv_skew: f64,
    pub strike_step: f64,
    pub num_strikes: usize,
    pub spread_multiplier: f64,
    pub seed: u64,
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(4))
        .unwrap_or_default()
}

/// Generate one expiry's chain centred on spot.
pub fn generate_chain(params: &ChainParams) -> OptionsChain {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let bs = BlackScholes::new(SYNTHETIC_RATE, 0.0);
    let t = year_fraction(params.valuation_date, params.expiry);
    let dte = (params.expiry - params.valuation_date).num_days() as i32;

    let center = (params.spot / params.strike_step).round() * params.strike_step;
    let half = (params.num_strikes / 2) as f64;
    let mut chain = OptionsChain::new(params.expiry, dte);

    for i in 0..params.num_strikes {
        let strike = center + (i as f64 - half) * params.strike_step;
        if strike <= 0.0 {
            continue;
        }
        let moneyness = strike / params.spot;

        for opt_type in [OptionType::Call, OptionType::Put] {
            let skew = match opt_type {
                OptionType::Put => params.iv_skew * (moneyness - 1.0),
                OptionType::Call => -params.iv_skew * 0.5 * (moneyness - 1.0),
            };
            let smile = 0.05 * (moneyness - 1.0).powi(2);
            let iv = (params.base_iv + skew + smile).clamp(0.10, 2.0);

            let mid = bs.price(params.spot, strike, t, iv, opt_type).max(0.01);
            let spread_pct = 0.02 + 0.01 * (moneyness - 1.0).abs();
            let spread = (mid * spread_pct * params.spread_multiplier).max(0.05);
            let bid = (mid - spread / 2.0).max(0.01);
            let ask = mid + spread / 2.0;

            let oi_base = 5000.0 * (-10.0 * (moneyness - 1.0).powi(2)).exp();
            let noise: f64 = rng.gen_range(0.8..1.2);
            let open_interest = ((oi_base * noise) as i64).max(10);

            chain.add_quote(OptionQuote::new(
                params.expiry,
                to_decimal(strike),
                opt_type,
                to_decimal(bid),
                to_decimal(ask),
                open_interest,
                (iv * 10_000.0).round() / 10_000.0,
            ));
        }
    }
    chain
}

/// Quarterly earnings dates going back from `end_date`, oldest first.
pub fn generate_earnings_dates(end_date: NaiveDate, quarters: usize, seed: u64) -> Vec<NaiveDate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut dates = Vec::with_capacity(quarters);
    let mut current = end_date;
    for _ in 0..quarters {
        current -= Duration::days(90);
        let offset: i64 = rng.gen_range(-3..=3);
        dates.push(current + Duration::days(offset));
    }
    dates.reverse();
    dates
}

/// Business-day closes ending at `end_date`, with an earnings gap of
/// 4-10% on the first trading day on or after each earnings date.
pub fn generate_price_history(
    spot: f64,
    end_date: NaiveDate,
    days: usize,
    earnings_dates: &[NaiveDate],
    seed: u64,
) -> Vec<PriceBar> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut dates = Vec::with_capacity(days);
    let mut day = if is_trading_day(end_date) {
        end_date
    } else {
        previous_trading_day(end_date)
    };
    for _ in 0..days {
        dates.push(day);
        day = previous_trading_day(day);
    }
    dates.reverse();

    let mut returns: Vec<f64> = (0..days)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            z * 0.018 + 0.0003
        })
        .collect();

    for earnings in earnings_dates {
        let idx = dates.partition_point(|d| d < earnings);
        if idx < days {
            let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let magnitude: f64 = rng.gen_range(0.04..0.10);
            returns[idx] += direction * magnitude;
        }
    }

    let mut price = spot;
    dates
        .into_iter()
        .zip(returns)
        .map(|(date, r)| {
            price *= 1.0 + r;
            PriceBar { date, close: price }
        })
        .collect()
}

/// Everything needed for one end-to-end run.
#[derive(Debug, Clone)]
pub struct SyntheticDataSet {
    pub scenario: SyntheticScenario,
    pub spot: f64,
    pub valuation_date: NaiveDate,
    pub event_date: NaiveDate,
    pub term_structure: TermStructure,
    pub history: Vec<PriceBar>,
    pub earnings_dates: Vec<NaiveDate>,
}

/// Build a full data set around an event five trading days out.
///
/// Front expires five trading days after the event, back1 and back2 at
/// 30 and 50 trading days from valuation.
pub fn generate_data_set(
    scenario: SyntheticScenario,
    spot: f64,
    valuation_date: NaiveDate,
    seed: u64,
) -> SyntheticDataSet {
    let params = scenario.params();
    info!(
        scenario = scenario.name(),
        seed,
        "generating synthetic data: {}",
        scenario.description()
    );

    let event_date = add_trading_days(valuation_date, 5);
    let front_expiry = add_trading_days(event_date, 5);
    let back1_expiry = add_trading_days(valuation_date, 30);
    let back2_expiry = add_trading_days(valuation_date, 50);

    let chain_for = |expiry, base_iv, iv_skew, num_strikes, spread_multiplier, seed| {
        generate_chain(&ChainParams {
            spot,
            valuation_date,
            expiry,
            base_iv,
            iv_skew,
            strike_step: DEFAULT_STRIKE_STEP,
            num_strikes,
            spread_multiplier,
            seed,
        })
    };

    let front = chain_for(
        front_expiry,
        params.base_iv + params.event_vol_premium,
        params.iv_skew,
        params.num_strikes,
        params.spread_multiplier,
        seed,
    );
    let back1 = chain_for(
        back1_expiry,
        params.base_iv + params.term_structure_slope,
        params.iv_skew * 0.8,
        DEFAULT_STRIKES_COUNT,
        1.0,
        seed.wrapping_add(100),
    );
    let back2 = chain_for(
        back2_expiry,
        params.base_iv + 2.0 * params.term_structure_slope,
        params.iv_skew * 0.7,
        DEFAULT_STRIKES_COUNT,
        1.0,
        seed.wrapping_add(200),
    );

    let earnings_dates = generate_earnings_dates(valuation_date, 12, seed);
    let history = generate_price_history(
        spot,
        valuation_date,
        HISTORY_YEARS * 252,
        &earnings_dates,
        seed,
    );

    SyntheticDataSet {
        scenario,
        spot,
        valuation_date,
        event_date,
        term_structure: TermStructure::new(valuation_date, front, back1, Some(back2)),
        history,
        earnings_dates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
    }

    #[test]
    fn test_scenario_names_round_trip() {
        for s in SyntheticScenario::ALL {
            assert_eq!(SyntheticScenario::from_name(s.name()), Some(s));
        }
        assert_eq!(SyntheticScenario::from_name("gamma"), None);
    }

    #[test]
    fn test_chain_shape_and_bounds() {
        let chain = generate_chain(&ChainParams {
            spot: DEFAULT_SPOT,
            valuation_date: val(),
            expiry: add_trading_days(val(), 10),
            base_iv: 0.65,
            iv_skew: 0.03,
            strike_step: DEFAULT_STRIKE_STEP,
            num_strikes: DEFAULT_STRIKES_COUNT,
            spread_multiplier: 1.0,
            seed: 42,
        });
        assert_eq!(chain.calls.len(), DEFAULT_STRIKES_COUNT);
        assert_eq!(chain.puts.len(), DEFAULT_STRIKES_COUNT);
        for q in chain.quotes() {
            assert!(q.bid > Decimal::ZERO);
            assert!(q.ask > q.bid);
            assert!(q.open_interest >= 10);
            assert!((0.10..=2.0).contains(&q.mid_iv));
        }
        let atm = chain.nearest(DEFAULT_SPOT, OptionType::Call).unwrap();
        assert_eq!(atm.strike_f64(), 130.0);
    }

    #[test]
    fn test_chain_is_deterministic() {
        let params = ChainParams {
            spot: DEFAULT_SPOT,
            valuation_date: val(),
            expiry: add_trading_days(val(), 10),
            base_iv: 0.55,
            iv_skew: 0.03,
            strike_step: DEFAULT_STRIKE_STEP,
            num_strikes: 11,
            spread_multiplier: 1.0,
            seed: 7,
        };
        let a = generate_chain(&params);
        let b = generate_chain(&params);
        let oi_a: Vec<i64> = a.quotes().map(|q| q.open_interest).collect();
        let oi_b: Vec<i64> = b.quotes().map(|q| q.open_interest).collect();
        assert_eq!(oi_a, oi_b);
    }

    #[test]
    fn test_data_set_expiry_order() {
        let data = generate_data_set(SyntheticScenario::Baseline, DEFAULT_SPOT, val(), 42);
        let ts = &data.term_structure;
        assert!(ts.front.expiration > data.event_date);
        assert!(ts.back1.expiration > ts.front.expiration);
        assert!(ts.back2.as_ref().unwrap().expiration > ts.back1.expiration);
        assert_eq!(data.earnings_dates.len(), 12);
        assert_eq!(data.history.len(), HISTORY_YEARS * 252);
        assert_eq!(data.history.last().unwrap().date, val());
    }

    #[test]
    fn test_earnings_dates_sorted() {
        let dates = generate_earnings_dates(val(), 8, 3);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates.iter().all(|d| *d < val()));
    }
}
