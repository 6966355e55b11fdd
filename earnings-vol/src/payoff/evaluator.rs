//! Vectorized P&L over simulated event moves.
//!
//! For every path the underlying jumps to `spot * (1 + move)` and each leg
//! is closed one trading day later. Entry and exit are charged slippage
//! separately:
//!
//! ```text
//! entry_cash = sum(-sign * qty * fill(entry_mid, Side))          * mult
//! exit_cash  = sum( sign * qty * fill(exit_value, Side.opposite)) * mult
//! pnl        = entry_cash + exit_cash
//! ```
//!
//! In hold-to-expiry mode legs settle at intrinsic value instead, with no
//! scenario effect and no exit fill.

use chrono::NaiveDate;
use ndarray::Array1;
use tracing::trace;

use crate::config::EngineConfig;
use crate::data::calendar::remaining_years_after_event;
use crate::pricing::BlackScholes;
use crate::scenario::ScenarioState;
use crate::strategy::{OptionLeg, Strategy};

use super::slippage::SlippageModel;

#[derive(Debug, Clone, Copy)]
pub struct PayoffEvaluator {
    pricer: BlackScholes,
    event_date: NaiveDate,
    hold_to_expiry: bool,
}

impl PayoffEvaluator {
    pub fn new(pricer: BlackScholes, event_date: NaiveDate, hold_to_expiry: bool) -> Self {
        Self {
            pricer,
            event_date,
            hold_to_expiry,
        }
    }

    pub fn from_config(config: &EngineConfig, event_date: NaiveDate) -> Self {
        Self::new(
            BlackScholes::from_config(&config.market),
            event_date,
            config.payoff.hold_to_expiry,
        )
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    pub fn hold_to_expiry(&self) -> bool {
        self.hold_to_expiry
    }

    pub fn terminal_spots(spot: f64, moves: &Array1<f64>) -> Array1<f64> {
        moves.mapv(|m| spot * (1.0 + m))
    }

    /// Per-share value of one leg at each terminal spot, before slippage.
    pub fn leg_values(
        &self,
        leg: &OptionLeg,
        terminal: &Array1<f64>,
        scenario: &ScenarioState,
    ) -> Array1<f64> {
        let strike = leg.strike_f64();
        if self.hold_to_expiry {
            return terminal.mapv(|s| leg.option_type.intrinsic(s, strike));
        }
        let remaining = remaining_years_after_event(self.event_date, leg.expiry);
        let vol = scenario.leg_vol(leg.expiry, leg.entry_iv);
        self.pricer
            .price_batch(terminal, strike, remaining, vol, leg.option_type)
    }

    /// Net entry cash flow at a given slippage (credit positive).
    pub fn entry_cash_flow(strategy: &Strategy, slippage: &SlippageModel) -> f64 {
        strategy
            .legs
            .iter()
            .map(|leg| {
                let fill = slippage.execution_price(leg.entry_price, leg.spread, leg.side);
                -leg.signed_quantity() * fill * strategy.multiplier
            })
            .sum()
    }

    /// P&L per path for one strategy under one scenario.
    pub fn evaluate(
        &self,
        strategy: &Strategy,
        moves: &Array1<f64>,
        scenario: &ScenarioState,
        spot: f64,
        slippage: &SlippageModel,
    ) -> Array1<f64> {
        let terminal = Self::terminal_spots(spot, moves);
        let entry = Self::entry_cash_flow(strategy, slippage);
        let mut pnl = Array1::from_elem(moves.len(), entry);

        for leg in &strategy.legs {
            let mut fills = self.leg_values(leg, &terminal, scenario);
            if !self.hold_to_expiry {
                fills = slippage.execution_prices(&fills, leg.spread, leg.side.opposite());
                fills.mapv_inplace(|f| f.max(0.0));
            }
            pnl.scaled_add(leg.signed_quantity() * strategy.multiplier, &fills);
        }

        trace!(
            strategy = strategy.name,
            scenario = scenario.name(),
            paths = moves.len(),
            entry,
            "evaluated payoff"
        );
        pnl
    }

    /// Mean P&L for one strategy under one scenario.
    pub fn expected_value(
        &self,
        strategy: &Strategy,
        moves: &Array1<f64>,
        scenario: &ScenarioState,
        spot: f64,
        slippage: &SlippageModel,
    ) -> f64 {
        self.evaluate(strategy, moves, scenario, spot, slippage)
            .mean()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::data::{OptionQuote, OptionType, Side};
    use crate::scenario::{AtmLevels, IvScenario};
    use crate::strategy::StrategyKind;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn leg(t: OptionType, side: Side, expiry: NaiveDate, iv: f64) -> OptionLeg {
        let quote = OptionQuote::new(expiry, dec!(100), t, dec!(4.00), dec!(4.20), 800, iv);
        OptionLeg::from_quote(
            &quote,
            side,
            1,
            100.0,
            d(2),
            &BlackScholes::default(),
            &SlippageModel::zero(),
        )
    }

    fn base_crush() -> ScenarioState {
        let levels = AtmLevels {
            front_expiry: d(9),
            back1_atm: 0.45,
            by_expiry: vec![(d(9), 0.90), (d(30), 0.45)],
        };
        ScenarioState::new(IvScenario::BaseCrush, &ScenarioConfig::default(), levels)
    }

    fn evaluator(hold: bool) -> PayoffEvaluator {
        // Event Tuesday 2026-01-06
        PayoffEvaluator::new(BlackScholes::default(), d(6), hold)
    }

    #[test]
    fn test_hold_to_expiry_settles_at_intrinsic() {
        let call = Strategy::new(
            StrategyKind::LongCall,
            vec![leg(OptionType::Call, Side::Buy, d(9), 0.9)],
            100.0,
        );
        let moves = Array1::from(vec![-0.10, 0.0, 0.05, 0.20]);
        let pnl = evaluator(true).evaluate(
            &call,
            &moves,
            &base_crush(),
            100.0,
            &SlippageModel::zero(),
        );
        let expected = [-410.0, -410.0, 90.0, 1590.0];
        for (p, e) in pnl.iter().zip(expected) {
            assert_relative_eq!(*p, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_slippage_charged_on_entry_and_exit() {
        let straddle = Strategy::new(
            StrategyKind::LongStraddle,
            vec![
                leg(OptionType::Call, Side::Buy, d(9), 0.9),
                leg(OptionType::Put, Side::Buy, d(9), 0.9),
            ],
            100.0,
        );
        let moves = Array1::from(vec![0.0, 0.02, -0.02]);
        let ev = evaluator(false);
        let frictionless = ev.evaluate(&straddle, &moves, &base_crush(), 100.0, &SlippageModel::zero());
        let charged = ev.evaluate(&straddle, &moves, &base_crush(), 100.0, &SlippageModel::new(0.10));
        // Per leg per fill: 0.5 * 0.20 * 0.10 = 0.01; two legs, two fills, x100
        for (f, c) in frictionless.iter().zip(charged.iter()) {
            assert_relative_eq!(f - c, 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_base_crush_hurts_long_straddle_at_zero_move() {
        let straddle = Strategy::new(
            StrategyKind::LongStraddle,
            vec![
                leg(OptionType::Call, Side::Buy, d(9), 0.9),
                leg(OptionType::Put, Side::Buy, d(9), 0.9),
            ],
            100.0,
        );
        let pnl = evaluator(false).evaluate(
            &straddle,
            &Array1::zeros(1),
            &base_crush(),
            100.0,
            &SlippageModel::zero(),
        );
        assert!(pnl[0] < 0.0);
    }

    #[test]
    fn test_calendar_back_leg_keeps_time_value() {
        let cal = Strategy::new(
            StrategyKind::Calendar,
            vec![
                leg(OptionType::Call, Side::Sell, d(9), 0.9),
                leg(OptionType::Call, Side::Buy, d(30), 0.45),
            ],
            100.0,
        );
        let ev = evaluator(false);
        let terminal = Array1::from(vec![100.0]);
        let back = ev.leg_values(&cal.legs[1], &terminal, &base_crush());
        let front = ev.leg_values(&cal.legs[0], &terminal, &base_crush());
        assert!(back[0] > front[0]);
        assert!(back[0] > 0.0);
    }

    #[test]
    fn test_remaining_time_excludes_event_day() {
        // Event Tue 6th, expiry Fri 9th: Wed/Thu/Fri remain -> 3/252
        let ev = evaluator(false);
        let call = leg(OptionType::Call, Side::Buy, d(9), 0.9);
        let terminal = Array1::from(vec![100.0]);
        let vol = base_crush().leg_vol(d(9), 0.9);
        let expected = BlackScholes::default().price(100.0, 100.0, 3.0 / 252.0, vol, OptionType::Call);
        let got = ev.leg_values(&call, &terminal, &base_crush());
        assert_relative_eq!(got[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_entry_cash_flow_matches_strategy() {
        let legs = vec![
            leg(OptionType::Call, Side::Sell, d(9), 0.9),
            leg(OptionType::Call, Side::Buy, d(30), 0.45),
        ];
        let s = Strategy::new(StrategyKind::Calendar, legs, 100.0);
        assert_relative_eq!(
            PayoffEvaluator::entry_cash_flow(&s, &SlippageModel::zero()),
            s.entry_cash_flow,
            epsilon = 1e-9
        );
    }
}
