//! Analysis run orchestration.
//!
//! The pipeline for one event:
//! 1. Validate inputs and expiry guards (before any pricing)
//! 2. Filter the term structure for moneyness and liquidity
//! 3. Extract event variance and resolve IV scenarios
//! 4. Simulate base and shocked event moves
//! 5. Build the strategy catalog
//! 6. Evaluate every strategy across scenario x shock (in parallel)
//! 7. Score, rank and stress the winner's slippage

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analytics::EventVarianceExtractor;
use crate::config::EngineConfig;
use crate::data::{filter_term_structure, TermStructure};
use crate::error::{EngineError, EngineResult, ModelWarning};
use crate::payoff::{PayoffEvaluator, PayoffProfile, SlippageModel};
use crate::pricing::BlackScholes;
use crate::scenario::{AtmLevels, IvScenario, ScenarioState};
use crate::scoring::{
    expected_move_dollar, rank, CompositeScorer, EvaluatedStrategy, MetricsCalculator, ScenarioEv,
};
use crate::simulation::{MonteCarloSimulator, MoveSample};
use crate::strategy::{Strategy, StructureBuilder};

use super::report::{AnalysisReport, RunInputs, SimulationSummary, SlippageSensitivity};

/// Front must expire strictly after the event and expiries must ascend.
pub fn check_expiry_guards(ts: &TermStructure, inputs: &RunInputs) -> EngineResult<()> {
    if inputs.event_date < inputs.valuation_date {
        return Err(EngineError::guard(format!(
            "event date {} precedes valuation date {}",
            inputs.event_date, inputs.valuation_date
        )));
    }
    if ts.front.expiration <= inputs.event_date {
        return Err(EngineError::guard(format!(
            "front expiry {} is not after event date {}",
            ts.front.expiration, inputs.event_date
        )));
    }
    if ts.back1.expiration <= ts.front.expiration {
        return Err(EngineError::guard(format!(
            "back1 expiry {} is not after front expiry {}",
            ts.back1.expiration, ts.front.expiration
        )));
    }
    if let Some(back2) = &ts.back2 {
        if back2.expiration <= ts.back1.expiration {
            return Err(EngineError::guard(format!(
                "back2 expiry {} is not after back1 expiry {}",
                back2.expiration, ts.back1.expiration
            )));
        }
    }
    Ok(())
}

fn check_inputs(inputs: &RunInputs) -> EngineResult<()> {
    if !(inputs.spot.is_finite() && inputs.spot > 0.0) {
        return Err(EngineError::data(format!("spot must be positive, got {}", inputs.spot)));
    }
    if !(inputs.implied_move.is_finite() && inputs.implied_move > 0.0) {
        return Err(EngineError::data(format!(
            "implied move must be positive, got {}",
            inputs.implied_move
        )));
    }
    if !(inputs.historical_p75.is_finite() && inputs.historical_p75 >= 0.0) {
        return Err(EngineError::data(format!(
            "historical p75 must be non-negative, got {}",
            inputs.historical_p75
        )));
    }
    Ok(())
}

/// Read-only context shared by every per-strategy evaluation.
struct EvaluationContext<'a> {
    evaluator: PayoffEvaluator,
    slippage: SlippageModel,
    calculator: MetricsCalculator,
    scenarios: &'a [ScenarioState],
    base: &'a ScenarioState,
    sweep: &'a [(f64, MoveSample)],
    base_moves: &'a MoveSample,
    spot: f64,
    expected_move_dollar: f64,
}

impl EvaluationContext<'_> {
    fn evaluate(&self, strategy: Strategy) -> (EvaluatedStrategy, Option<ModelWarning>) {
        let spot = self.spot;
        let pnl = self
            .evaluator
            .evaluate(&strategy, &self.base_moves.moves, self.base, spot, &self.slippage);
        let base_ev = pnl.mean().unwrap_or(0.0);

        let mut sweep_evs = Vec::with_capacity(self.sweep.len() * self.scenarios.len());
        for (shock, sample) in self.sweep {
            for scenario in self.scenarios {
                let ev = if *shock == 0.0 && scenario.scenario == IvScenario::BaseCrush {
                    base_ev
                } else {
                    self.evaluator.expected_value(
                        &strategy,
                        &sample.moves,
                        scenario,
                        spot,
                        &self.slippage,
                    )
                };
                sweep_evs.push(ScenarioEv {
                    scenario: scenario.scenario,
                    shock_pct: *shock,
                    ev,
                });
            }
        }
        let scenario_evs = sweep_evs
            .iter()
            .filter(|e| e.shock_pct == 0.0)
            .copied()
            .collect();

        let profile =
            PayoffProfile::compute(&self.evaluator, &strategy, self.base, spot, &self.slippage, &pnl);
        let (metrics, warning) = self.calculator.compute(
            strategy.name,
            &pnl,
            &sweep_evs,
            profile.max_loss,
            profile.max_gain,
            self.expected_move_dollar,
        );

        (
            EvaluatedStrategy {
                strategy,
                metrics,
                scenario_evs,
                profile,
            },
            warning,
        )
    }
}

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    /// Rejects an invalid configuration immediately.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(&self, ts: &TermStructure, inputs: &RunInputs) -> EngineResult<AnalysisReport> {
        let config = &self.config;
        check_inputs(inputs)?;
        check_expiry_guards(ts, inputs)?;
        let offset = config.offset_fraction(inputs.implied_move)?;
        let spot = inputs.spot;
        let mut warnings: Vec<ModelWarning> = Vec::new();

        info!(
            spot,
            event_date = %inputs.event_date,
            front = %ts.front.expiration,
            back1 = %ts.back1.expiration,
            "starting analysis run"
        );

        let filtered = filter_term_structure(ts, spot, &config.filters)?;

        let event = EventVarianceExtractor::new(&config.event).extract(&filtered, spot)?;
        warnings.extend(event.warning());
        let event_vol = event.event_vol();

        let levels = AtmLevels::from_term_structure(&filtered, spot)?;
        let scenarios = ScenarioState::all(&config.scenarios, &levels);
        let base = scenarios
            .iter()
            .find(|s| s.scenario == IvScenario::BaseCrush)
            .ok_or_else(|| EngineError::config("base_crush scenario missing"))?;

        let simulator = MonteCarloSimulator::new(&config.simulation);
        let sweep = simulator.shock_sweep(event_vol, &config.shock_levels());
        warnings.extend(sweep.iter().filter_map(|(_, s)| s.warning.clone()));
        let base_moves = sweep
            .iter()
            .find(|(shock, _)| *shock == 0.0)
            .map(|(_, s)| s)
            .ok_or_else(|| EngineError::config("zero shock level missing"))?;

        let pricer = BlackScholes::from_config(&config.market);
        let slippage = SlippageModel::new(config.payoff.slippage_fraction);
        let builder = StructureBuilder::new(
            &filtered.front,
            &filtered.back1,
            spot,
            offset,
            config.structures.wing_pct,
            inputs.valuation_date,
            pricer,
            slippage,
            config.market.contract_multiplier,
        )?;
        let strategies = builder.build_all()?;
        info!(count = strategies.len(), offset, "built strategy catalog");

        let emd = expected_move_dollar(
            inputs.implied_move,
            inputs.historical_p75,
            spot,
            config.market.contract_multiplier,
        );
        let ctx = EvaluationContext {
            evaluator: PayoffEvaluator::from_config(config, inputs.event_date),
            slippage,
            calculator: MetricsCalculator::new(&config.scoring),
            scenarios: &scenarios,
            base,
            sweep: &sweep,
            base_moves,
            spot,
            expected_move_dollar: emd,
        };

        let evaluated: Vec<(EvaluatedStrategy, Option<ModelWarning>)> = strategies
            .into_par_iter()
            .map(|s| ctx.evaluate(s))
            .collect();
        let mut population = Vec::with_capacity(evaluated.len());
        for (e, warning) in evaluated {
            warnings.extend(warning);
            population.push(e);
        }

        let ranked = rank(CompositeScorer::new(&config.scoring).score(population));

        let slippage_sensitivity = ranked.first().map(|top| {
            let stressed = slippage.stressed(config.payoff.stress_slippage_multiplier);
            let stressed_ev = ctx.evaluator.expected_value(
                &top.strategy,
                &base_moves.moves,
                base,
                spot,
                &stressed,
            );
            SlippageSensitivity {
                strategy: top.name().to_string(),
                base_fraction: slippage.fraction,
                stressed_fraction: stressed.fraction,
                base_ev: top.metrics.expected_value,
                stressed_ev,
            }
        });

        if let Some(top) = ranked.first() {
            info!(
                strategy = top.name(),
                score = top.composite_score,
                ev = top.metrics.expected_value,
                "top ranked strategy"
            );
        }
        debug!(warnings = warnings.len(), "analysis run complete");

        let event_vol_ratio = if event.front_iv > 0.0 {
            event_vol / event.front_iv
        } else {
            0.0
        };
        Ok(AnalysisReport {
            inputs: *inputs,
            front_expiry: filtered.front.expiration,
            back1_expiry: filtered.back1.expiration,
            back2_expiry: filtered.back2.as_ref().map(|c| c.expiration),
            event_vol,
            event_vol_ratio,
            event,
            implied_move: inputs.implied_move,
            historical_p75: inputs.historical_p75,
            expected_move_dollar: emd,
            offset_fraction: offset,
            simulations: sweep
                .iter()
                .map(|(shock, s)| SimulationSummary::from_sample(*shock, s))
                .collect(),
            strategies: ranked,
            warnings,
            slippage_sensitivity,
            config: config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionQuote, OptionType, OptionsChain};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn chain(exp: NaiveDate, iv: f64) -> OptionsChain {
        let mut c = OptionsChain::new(exp, 0);
        for k in (80..=120).step_by(5) {
            for t in [OptionType::Call, OptionType::Put] {
                c.add_quote(OptionQuote::new(
                    exp,
                    Decimal::from(k),
                    t,
                    Decimal::new(300, 2),
                    Decimal::new(310, 2),
                    1000,
                    iv,
                ));
            }
        }
        c
    }

    fn inputs(event: NaiveDate) -> RunInputs {
        RunInputs {
            spot: 100.0,
            valuation_date: d(2),
            event_date: event,
            implied_move: 0.06,
            historical_p75: 0.05,
        }
    }

    #[test]
    fn test_zero_dte_front_is_a_guard_violation() {
        let ts = TermStructure::new(d(2), chain(d(9), 0.8), chain(d(30), 0.5), None);
        let err = check_expiry_guards(&ts, &inputs(d(9))).unwrap_err();
        assert!(matches!(err, EngineError::Guard(_)));
        assert!(check_expiry_guards(&ts, &inputs(d(6))).is_ok());
    }

    #[test]
    fn test_unordered_expiries_rejected() {
        let ts = TermStructure::new(d(2), chain(d(30), 0.8), chain(d(16), 0.5), None);
        assert!(matches!(
            check_expiry_guards(&ts, &inputs(d(6))),
            Err(EngineError::Guard(_))
        ));
        let ts = TermStructure::new(
            d(2),
            chain(d(9), 0.8),
            chain(d(30), 0.5),
            Some(chain(d(23), 0.5)),
        );
        assert!(matches!(
            check_expiry_guards(&ts, &inputs(d(6))),
            Err(EngineError::Guard(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.simulation.n_samples = 0;
        assert!(matches!(AnalysisEngine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_implied_move_out_of_range_is_config_error() {
        let mut config = EngineConfig::default();
        config.simulation.n_samples = 2000;
        let engine = AnalysisEngine::new(config).unwrap();
        let ts = TermStructure::new(d(2), chain(d(9), 0.8), chain(d(30), 0.5), None);
        let mut run = inputs(d(6));
        run.implied_move = 0.9;
        assert!(matches!(engine.run(&ts, &run), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_run_on_small_chain() {
        let mut config = EngineConfig::default();
        config.simulation.n_samples = 2000;
        let engine = AnalysisEngine::new(config).unwrap();
        let ts = TermStructure::new(
            d(2),
            chain(d(9), 0.8),
            chain(d(23), 0.5),
            Some(chain(d(30), 0.48)),
        );
        let report = engine.run(&ts, &inputs(d(6))).unwrap();
        assert_eq!(report.strategies.len(), 8);
        assert!(report.event.raw_event_variance > 0.0);
        assert_eq!(report.simulations.len(), 5);
        for s in &report.strategies {
            assert_eq!(s.scenario_evs.len(), 3);
        }
        assert!(report.slippage_sensitivity.is_some());
    }
}
