//! Tail-aware metrics of a simulated P&L distribution.

use ndarray::Array1;
use serde::Serialize;
use tracing::debug;

use crate::config::ScoringConfig;
use crate::error::{ConvexityGuardKind, ModelWarning};
use crate::scenario::IvScenario;

/// Number of observations in a tail of fraction `tail`, at least one.
pub fn tail_count(n: usize, tail: f64) -> usize {
    ((n as f64 * tail).floor() as usize).clamp(1, n.max(1))
}

fn sorted(pnl: &Array1<f64>) -> Vec<f64> {
    let mut values = pnl.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn expected_value(pnl: &Array1<f64>) -> f64 {
    pnl.mean().unwrap_or(0.0)
}

/// Mean of the worst `tail` fraction of outcomes.
pub fn cvar(pnl: &Array1<f64>, tail: f64) -> f64 {
    if pnl.is_empty() {
        return 0.0;
    }
    let values = sorted(pnl);
    mean(&values[..tail_count(values.len(), tail)])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Convexity {
    pub value: f64,
    pub top_mean: f64,
    pub bottom_mean: f64,
    pub guard: Option<ConvexityGuardKind>,
}

/// Best-tail mean over the absolute worst-tail mean. The denominator is
/// floored at `eps` and the ratio capped at `cap`.
pub fn convexity(pnl: &Array1<f64>, tail: f64, cap: f64, eps: f64) -> Convexity {
    if pnl.is_empty() {
        return Convexity {
            value: 0.0,
            top_mean: 0.0,
            bottom_mean: 0.0,
            guard: None,
        };
    }
    let values = sorted(pnl);
    let k = tail_count(values.len(), tail);
    let bottom_mean = mean(&values[..k]);
    let top_mean = mean(&values[values.len() - k..]);

    let floored = bottom_mean.abs() < eps;
    let ratio = top_mean / bottom_mean.abs().max(eps);
    let capped = ratio > cap;
    let guard = if floored {
        Some(ConvexityGuardKind::DenominatorFloor)
    } else if capped {
        Some(ConvexityGuardKind::Cap)
    } else {
        None
    };
    Convexity {
        value: ratio.min(cap),
        top_mean,
        bottom_mean,
        guard,
    }
}

/// Inverse dispersion of EVs across scenario x shock combinations.
pub fn robustness(evs: &[f64], eps: f64) -> f64 {
    if evs.is_empty() {
        return 0.0;
    }
    let m = mean(evs);
    let var = evs.iter().map(|e| (e - m).powi(2)).sum::<f64>() / evs.len() as f64;
    1.0 / (var.sqrt() + eps)
}

/// Dollar size of the expected event move for one contract.
pub fn expected_move_dollar(
    implied_move: f64,
    historical_p75: f64,
    spot: f64,
    multiplier: f64,
) -> f64 {
    implied_move.max(historical_p75) * spot * multiplier
}

pub fn capital_ratio(max_loss: f64, expected_move_dollar: f64) -> f64 {
    max_loss / expected_move_dollar.max(1e-9)
}

/// Mean P&L of one strategy under one scenario and vol shock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioEv {
    pub scenario: IvScenario,
    pub shock_pct: f64,
    pub ev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyMetrics {
    pub expected_value: f64,
    pub cvar: f64,
    pub convexity: f64,
    pub robustness: f64,
    pub capital_ratio: f64,
    pub max_loss: f64,
    pub max_gain: f64,
    /// Standard deviation of the base P&L distribution.
    pub pnl_std: f64,
    /// Fraction of paths with positive P&L.
    pub prob_profit: f64,
}

pub struct MetricsCalculator {
    config: ScoringConfig,
}

impl MetricsCalculator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Metrics for one strategy. `pnl` is the base_crush distribution at
    /// zero shock and `sweep` holds every scenario x shock EV.
    pub fn compute(
        &self,
        strategy: &str,
        pnl: &Array1<f64>,
        sweep: &[ScenarioEv],
        max_loss: f64,
        max_gain: f64,
        expected_move_dollar: f64,
    ) -> (StrategyMetrics, Option<ModelWarning>) {
        let c = &self.config;
        let conv = convexity(pnl, c.convexity_tail, c.convexity_cap, c.convexity_eps);
        let warning = conv.guard.map(|guard| ModelWarning::ConvexityGuard {
            strategy: strategy.to_string(),
            guard,
            top_mean: conv.top_mean,
            bottom_mean: conv.bottom_mean,
        });
        if let Some(w) = &warning {
            w.emit();
        }

        let evs: Vec<f64> = sweep.iter().map(|s| s.ev).collect();
        let n = pnl.len().max(1) as f64;
        let metrics = StrategyMetrics {
            expected_value: expected_value(pnl),
            cvar: cvar(pnl, c.cvar_tail),
            convexity: conv.value,
            robustness: robustness(&evs, c.robustness_eps),
            capital_ratio: capital_ratio(max_loss, expected_move_dollar),
            max_loss,
            max_gain,
            pnl_std: if pnl.is_empty() { 0.0 } else { pnl.std(0.0) },
            prob_profit: pnl.iter().filter(|p| **p > 0.0).count() as f64 / n,
        };
        debug!(
            strategy,
            ev = metrics.expected_value,
            cvar = metrics.cvar,
            convexity = metrics.convexity,
            robustness = metrics.robustness,
            "computed metrics"
        );
        (metrics, warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arr(v: &[f64]) -> Array1<f64> {
        Array1::from(v.to_vec())
    }

    #[test]
    fn test_cvar_is_worst_tail_mean() {
        let pnl = Array1::from_iter((1..=100).map(f64::from));
        // worst 5 of 1..=100
        assert_relative_eq!(cvar(&pnl, 0.05), 3.0);
        assert!(cvar(&pnl, 0.05) <= expected_value(&pnl));
    }

    #[test]
    fn test_cvar_small_sample_uses_one_point() {
        assert_relative_eq!(cvar(&arr(&[5.0, -2.0, 1.0]), 0.05), -2.0);
    }

    #[test]
    fn test_convexity_ratio() {
        let pnl = Array1::from_iter((-49..=50).map(f64::from));
        let c = convexity(&pnl, 0.10, 10.0, 1e-6);
        // top 10: 41..=50 mean 45.5; bottom 10: -49..=-40 mean -44.5
        assert_relative_eq!(c.value, 45.5 / 44.5, epsilon = 1e-12);
        assert!(c.guard.is_none());
    }

    #[test]
    fn test_convexity_zero_denominator_is_capped() {
        let mut v = vec![0.0; 90];
        v.extend(vec![500.0; 10]);
        let c = convexity(&arr(&v), 0.10, 10.0, 1e-6);
        assert_eq!(c.value, 10.0);
        assert_eq!(c.guard, Some(ConvexityGuardKind::DenominatorFloor));
        assert!(c.value.is_finite());
    }

    #[test]
    fn test_convexity_cap() {
        let mut v = vec![-1.0; 10];
        v.extend(vec![0.0; 80]);
        v.extend(vec![1000.0; 10]);
        let c = convexity(&arr(&v), 0.10, 10.0, 1e-6);
        assert_eq!(c.value, 10.0);
        assert_eq!(c.guard, Some(ConvexityGuardKind::Cap));
    }

    #[test]
    fn test_robustness_rewards_stability() {
        let stable = robustness(&[100.0, 100.0, 100.0, 100.0], 1e-9);
        let noisy = robustness(&[200.0, -50.0, 150.0, 10.0], 1e-9);
        assert!(stable > noisy);
        assert!(stable.is_finite());
    }

    #[test]
    fn test_capital_ratio() {
        let emd = expected_move_dollar(0.06, 0.08, 100.0, 100.0);
        assert_relative_eq!(emd, 800.0, epsilon = 1e-9);
        assert_relative_eq!(capital_ratio(400.0, emd), 0.5, epsilon = 1e-12);
        assert!(capital_ratio(1.0, 0.0).is_finite());
    }

    #[test]
    fn test_calculator_flags_guard() {
        let calc = MetricsCalculator::new(&ScoringConfig::default());
        let mut v = vec![0.0; 90];
        v.extend(vec![50.0; 10]);
        let sweep = [ScenarioEv {
            scenario: IvScenario::BaseCrush,
            shock_pct: 0.0,
            ev: 5.0,
        }];
        let (m, w) = calc.compute("long_call", &arr(&v), &sweep, 0.0, 50.0, 800.0);
        assert_relative_eq!(m.expected_value, 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.prob_profit, 0.10, epsilon = 1e-12);
        assert!(matches!(w, Some(ModelWarning::ConvexityGuard { .. })));
    }
}
