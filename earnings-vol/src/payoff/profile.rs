//! Breakevens and loss/gain extremes of a strategy.

use ndarray::Array1;
use serde::Serialize;

use crate::scenario::ScenarioState;
use crate::strategy::Strategy;

use super::evaluator::PayoffEvaluator;
use super::slippage::SlippageModel;

/// Largest absolute move on the breakeven grid.
pub const PROFILE_MOVE_RANGE: f64 = 0.5;
pub const PROFILE_GRID_POINTS: usize = 1001;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayoffProfile {
    /// Spot levels where post-event P&L crosses zero, ascending.
    pub breakevens: Vec<f64>,
    /// Worst simulated loss as a positive amount (0 if no path loses).
    pub max_loss: f64,
    /// Best simulated P&L.
    pub max_gain: f64,
}

impl PayoffProfile {
    /// `simulated_pnl` is the strategy's P&L over the simulated moves under
    /// the same scenario; breakevens come from a deterministic move grid.
    pub fn compute(
        evaluator: &PayoffEvaluator,
        strategy: &Strategy,
        scenario: &ScenarioState,
        spot: f64,
        slippage: &SlippageModel,
        simulated_pnl: &Array1<f64>,
    ) -> Self {
        let grid = move_grid();
        let pnl = evaluator.evaluate(strategy, &grid, scenario, spot, slippage);
        let spots = PayoffEvaluator::terminal_spots(spot, &grid);
        let (min, max) = extremes(simulated_pnl);
        Self {
            breakevens: breakevens(&spots, &pnl),
            max_loss: (-min).max(0.0),
            max_gain: max,
        }
    }
}

pub fn move_grid() -> Array1<f64> {
    Array1::linspace(-PROFILE_MOVE_RANGE, PROFILE_MOVE_RANGE, PROFILE_GRID_POINTS)
}

/// Linearly interpolated zero crossings of `pnl` over `spots`.
pub fn breakevens(spots: &Array1<f64>, pnl: &Array1<f64>) -> Vec<f64> {
    let n = spots.len().min(pnl.len());
    let mut out: Vec<f64> = Vec::new();
    let mut push = |x: f64| {
        if out.last().map_or(true, |last| (x - last).abs() > 1e-9) {
            out.push(x);
        }
    };
    for i in 0..n.saturating_sub(1) {
        let (a, b) = (pnl[i], pnl[i + 1]);
        if a == 0.0 {
            push(spots[i]);
        } else if a * b < 0.0 {
            push(spots[i] + (spots[i + 1] - spots[i]) * a / (a - b));
        }
    }
    if n > 0 && pnl[n - 1] == 0.0 {
        push(spots[n - 1]);
    }
    out
}

fn extremes(values: &Array1<f64>) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}
