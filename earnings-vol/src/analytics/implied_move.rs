//! Implied move from the front-expiry ATM straddle.

use tracing::info;

use crate::data::{OptionsChain, Side};
use crate::error::{EngineError, EngineResult, ModelWarning};
use crate::payoff::SlippageModel;

#[derive(Debug, Clone)]
pub struct ImpliedMove {
    /// Straddle cost (buy side, with slippage) over spot.
    pub fraction: f64,
    pub atm_strike: f64,
    pub straddle_price: f64,
    pub warning: Option<ModelWarning>,
}

/// Slippage-adjusted ATM straddle / spot.
///
/// The ATM strike is the one nearest spot across both types; both a call
/// and a put must be quoted there. Either side's spread above
/// `max_spread_pct` of mid attaches a [`ModelWarning::WideAtmSpread`].
pub fn implied_move_from_chain(
    chain: &OptionsChain,
    spot: f64,
    slippage: &SlippageModel,
    max_spread_pct: f64,
) -> EngineResult<ImpliedMove> {
    if spot <= 0.0 {
        return Err(EngineError::data("spot must be positive for implied move"));
    }
    let strike = chain
        .nearest_strike(spot)
        .ok_or_else(|| EngineError::data(format!("chain {} has no quotes", chain.expiration)))?;
    let (call, put) = match (chain.call_at_strike(strike), chain.put_at_strike(strike)) {
        (Some(c), Some(p)) => (c, p),
        _ => {
            return Err(EngineError::data(format!(
                "ATM straddle not found at strike {} for {}",
                strike, chain.expiration
            )))
        }
    };

    let spread_pct = |mid: f64, spread: f64| {
        if mid > 0.0 {
            spread / mid
        } else {
            f64::INFINITY
        }
    };
    let call_pct = spread_pct(call.mid_f64(), call.spread_f64());
    let put_pct = spread_pct(put.mid_f64(), put.spread_f64());
    let warning = (call_pct > max_spread_pct || put_pct > max_spread_pct).then(|| {
        ModelWarning::WideAtmSpread {
            strike: call.strike_f64(),
            call_spread_pct: call_pct,
            put_spread_pct: put_pct,
        }
    });
    if let Some(w) = &warning {
        w.emit();
    }

    let straddle = slippage.quote_fill(call, Side::Buy) + slippage.quote_fill(put, Side::Buy);
    let fraction = straddle / spot;
    info!(
        atm_strike = %strike,
        straddle,
        implied_move = fraction,
        "implied move from ATM straddle"
    );

    Ok(ImpliedMove {
        fraction,
        atm_strike: call.strike_f64(),
        straddle_price: straddle,
        warning,
    })
}
