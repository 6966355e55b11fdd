//! Composite score across one run's strategy set.
//!
//! Each metric is min-max normalized over the current population, then
//! combined with the configured weights. Undefined-risk structures are
//! scaled by `1 - undefined_risk_penalty`. Scores are only comparable
//! within a run.

use serde::Serialize;
use tracing::debug;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::payoff::PayoffProfile;
use crate::strategy::Strategy;

use super::metrics::{ScenarioEv, StrategyMetrics};

/// A strategy with its metrics, before cross-sectional scoring.
#[derive(Debug, Clone)]
pub struct EvaluatedStrategy {
    pub strategy: Strategy,
    pub metrics: StrategyMetrics,
    /// EV per scenario at zero shock.
    pub scenario_evs: Vec<ScenarioEv>,
    pub profile: PayoffProfile,
}

/// Normalized metric values that feed the composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub ev: f64,
    pub convexity: f64,
    pub cvar: f64,
    pub robustness: f64,
}

impl ScoreBreakdown {
    pub fn weighted(&self, w: &ScoringWeights) -> f64 {
        w.ev * self.ev + w.convexity * self.convexity + w.cvar * self.cvar + w.robustness * self.robustness
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredStrategy {
    /// 1-based position after ranking; 0 until ranked.
    pub rank: usize,
    pub strategy: Strategy,
    #[serde(flatten)]
    pub metrics: StrategyMetrics,
    pub scenario_evs: Vec<ScenarioEv>,
    pub profile: PayoffProfile,
    pub breakdown: ScoreBreakdown,
    pub composite_score: f64,
    pub risk_penalty_applied: bool,
}

impl ScoredStrategy {
    pub fn name(&self) -> &'static str {
        self.strategy.name
    }
}

/// Min-max scale to [0, 1]; a constant series maps to 0.5.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = hi - lo;
    if !range.is_finite() || range.abs() < 1e-12 {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - lo) / range).collect()
}

pub struct CompositeScorer {
    weights: ScoringWeights,
    penalty: f64,
}

impl CompositeScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights,
            penalty: config.undefined_risk_penalty,
        }
    }

    pub fn score(&self, evaluated: Vec<EvaluatedStrategy>) -> Vec<ScoredStrategy> {
        let column = |f: fn(&StrategyMetrics) -> f64| {
            min_max_normalize(&evaluated.iter().map(|e| f(&e.metrics)).collect::<Vec<_>>())
        };
        let ev = column(|m| m.expected_value);
        let convexity = column(|m| m.convexity);
        let cvar = column(|m| m.cvar);
        let robustness = column(|m| m.robustness);

        evaluated
            .into_iter()
            .enumerate()
            .map(|(i, e)| {
                let breakdown = ScoreBreakdown {
                    ev: ev[i],
                    convexity: convexity[i],
                    cvar: cvar[i],
                    robustness: robustness[i],
                };
                let raw = breakdown.weighted(&self.weights);
                let risk_penalty_applied = e.strategy.is_undefined_risk();
                let composite_score = if risk_penalty_applied {
                    raw * (1.0 - self.penalty)
                } else {
                    raw
                };
                debug!(
                    strategy = e.strategy.name,
                    composite_score,
                    risk_penalty_applied,
                    "scored strategy"
                );
                ScoredStrategy {
                    rank: 0,
                    strategy: e.strategy,
                    metrics: e.metrics,
                    scenario_evs: e.scenario_evs,
                    profile: e.profile,
                    breakdown,
                    composite_score,
                    risk_penalty_applied,
                }
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{OptionQuote, OptionType, Side};
    use crate::payoff::SlippageModel;
    use crate::pricing::BlackScholes;
    use crate::strategy::{OptionLeg, StrategyKind};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    pub(crate) fn evaluated(kind: StrategyKind, side: Side, ev: f64) -> EvaluatedStrategy {
        let q = OptionQuote::new(
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            dec!(100),
            OptionType::Call,
            dec!(1.00),
            dec!(1.10),
            500,
            0.7,
        );
        let leg = OptionLeg::from_quote(
            &q,
            side,
            1,
            100.0,
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            &BlackScholes::default(),
            &SlippageModel::zero(),
        );
        EvaluatedStrategy {
            strategy: Strategy::new(kind, vec![leg], 100.0),
            metrics: StrategyMetrics {
                expected_value: ev,
                cvar: ev - 100.0,
                convexity: 1.0,
                robustness: 0.01,
                capital_ratio: 0.5,
                max_loss: 100.0,
                max_gain: 200.0,
                pnl_std: 50.0,
                prob_profit: 0.5,
            },
            scenario_evs: Vec::new(),
            profile: PayoffProfile::default(),
        }
    }

    #[test]
    fn test_min_max_normalize() {
        assert_eq!(min_max_normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(min_max_normalize(&[4.0, 4.0]), vec![0.5, 0.5]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_composite_weights() {
        let scorer = CompositeScorer::new(&ScoringConfig::default());
        let scored = scorer.score(vec![
            evaluated(StrategyKind::LongCall, Side::Buy, 10.0),
            evaluated(StrategyKind::LongPut, Side::Buy, 30.0),
        ]);
        // EV and CVaR spread, convexity and robustness constant (0.5)
        assert_relative_eq!(scored[0].composite_score, 0.3 * 0.5 + 0.1 * 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            scored[1].composite_score,
            0.4 + 0.3 * 0.5 + 0.2 + 0.1 * 0.5,
            epsilon = 1e-12
        );
        assert!(scored.iter().all(|s| !s.risk_penalty_applied));
    }

    #[test]
    fn test_undefined_risk_penalty() {
        let scorer = CompositeScorer::new(&ScoringConfig::default());
        let scored = scorer.score(vec![
            evaluated(StrategyKind::LongCall, Side::Buy, 10.0),
            evaluated(StrategyKind::CallSpread, Side::Sell, 30.0),
        ]);
        assert!(scored[1].risk_penalty_applied);
        let unpenalized = scored[1].breakdown.weighted(&ScoringWeights::default());
        assert_relative_eq!(scored[1].composite_score, unpenalized * 0.9, epsilon = 1e-12);
    }
}
