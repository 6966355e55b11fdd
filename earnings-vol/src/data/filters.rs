//! Moneyness and liquidity filters.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::error::{EngineError, EngineResult};

use super::types::{OptionQuote, OptionsChain, TermStructure};

/// Keep strikes in `[spot * low, spot * high]`.
pub fn filter_by_moneyness(chain: &OptionsChain, spot: f64, low: f64, high: f64) -> OptionsChain {
    let min_strike = spot * low;
    let max_strike = spot * high;
    retain(chain, |q| {
        let k = q.strike_f64();
        k >= min_strike && k <= max_strike
    })
}

/// Keep quotes with enough open interest and a tight enough spread.
/// Quotes with a zero mid are dropped.
pub fn filter_by_liquidity(chain: &OptionsChain, min_oi: i64, max_spread_pct: f64) -> OptionsChain {
    retain(chain, |q| q.mid > Decimal::ZERO && q.is_liquid(min_oi, max_spread_pct))
}

/// Moneyness then liquidity.
pub fn filter_chain(chain: &OptionsChain, spot: f64, config: &FilterConfig) -> OptionsChain {
    let banded = filter_by_moneyness(chain, spot, config.moneyness_low, config.moneyness_high);
    let liquid = filter_by_liquidity(&banded, config.min_open_interest, config.max_spread_pct);
    debug!(
        expiry = %chain.expiration,
        raw = chain.len(),
        in_band = banded.len(),
        liquid = liquid.len(),
        "filtered chain"
    );
    liquid
}

/// Filter every expiry of a term structure.
///
/// Front and back1 must keep at least one quote. An empty back2 is
/// dropped so that extraction falls back to single-point mode.
pub fn filter_term_structure(
    ts: &TermStructure,
    spot: f64,
    config: &FilterConfig,
) -> EngineResult<TermStructure> {
    let front = filter_chain(&ts.front, spot, config);
    require_nonempty(&front, "front")?;
    let back1 = filter_chain(&ts.back1, spot, config);
    require_nonempty(&back1, "back1")?;

    let back2 = ts
        .back2
        .as_ref()
        .map(|c| filter_chain(c, spot, config))
        .filter(|c| !c.is_empty());
    if ts.back2.is_some() && back2.is_none() {
        info!("back2 chain empty after filtering; using single-point baseline");
    }

    Ok(TermStructure::new(ts.valuation_date, front, back1, back2))
}

fn require_nonempty(chain: &OptionsChain, label: &str) -> EngineResult<()> {
    if chain.is_empty() {
        return Err(EngineError::data(format!(
            "{} chain ({}) has no liquid quotes after filtering",
            label, chain.expiration
        )));
    }
    Ok(())
}

fn retain(chain: &OptionsChain, keep: impl Fn(&OptionQuote) -> bool) -> OptionsChain {
    let mut out = OptionsChain::new(chain.expiration, chain.dte);
    for quote in chain.quotes().filter(|q| keep(q)) {
        out.add_quote(quote.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn chain_with(quotes: &[(Decimal, Decimal, Decimal, i64)]) -> OptionsChain {
        let exp = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let mut chain = OptionsChain::new(exp, 7);
        for (strike, bid, ask, oi) in quotes {
            chain.add_quote(OptionQuote::new(
                exp,
                *strike,
                OptionType::Call,
                *bid,
                *ask,
                *oi,
                0.5,
            ));
        }
        chain
    }

    #[test]
    fn test_moneyness_band_inclusive() {
        let chain = chain_with(&[
            (dec!(79), dec!(1), dec!(1.01), 500),
            (dec!(80), dec!(1), dec!(1.01), 500),
            (dec!(120), dec!(1), dec!(1.01), 500),
            (dec!(121), dec!(1), dec!(1.01), 500),
        ]);
        let out = filter_by_moneyness(&chain, 100.0, 0.8, 1.2);
        assert_eq!(out.strikes(), vec![dec!(80), dec!(120)]);
    }

    #[test]
    fn test_liquidity_filter() {
        let chain = chain_with(&[
            (dec!(100), dec!(2.00), dec!(2.04), 500), // ok
            (dec!(101), dec!(2.00), dec!(2.04), 50),  // low OI
            (dec!(102), dec!(2.00), dec!(2.50), 500), // wide
            (dec!(103), dec!(0), dec!(0), 500),       // zero mid
        ]);
        let out = filter_by_liquidity(&chain, 100, 0.05);
        assert_eq!(out.strikes(), vec![dec!(100)]);
    }

    #[test]
    fn test_illiquid_front_is_data_error() {
        let val = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let illiquid = chain_with(&[(dec!(100), dec!(2.00), dec!(2.04), 10)]);
        let liquid = chain_with(&[(dec!(100), dec!(2.00), dec!(2.04), 500)]);
        let ts = TermStructure::new(val, illiquid, liquid, None);
        let err = filter_term_structure(&ts, 100.0, &FilterConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Data(_)));
    }

    #[test]
    fn test_empty_back2_dropped() {
        let val = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let liquid = chain_with(&[(dec!(100), dec!(2.00), dec!(2.04), 500)]);
        let illiquid = chain_with(&[(dec!(100), dec!(2.00), dec!(2.04), 10)]);
        let ts = TermStructure::new(val, liquid.clone(), liquid, Some(illiquid));
        let out = filter_term_structure(&ts, 100.0, &FilterConfig::default()).unwrap();
        assert!(out.back2.is_none());
    }
}
