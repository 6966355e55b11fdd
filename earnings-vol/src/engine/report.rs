//! Run output consumed by reporting collaborators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::EventVarianceResult;
use crate::config::EngineConfig;
use crate::error::ModelWarning;
use crate::scoring::ScoredStrategy;
use crate::simulation::MoveSample;

/// Scalar inputs of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub spot: f64,
    pub valuation_date: NaiveDate,
    pub event_date: NaiveDate,
    /// Implied move as a fraction of spot.
    pub implied_move: f64,
    /// 75th percentile absolute historical earnings move.
    pub historical_p75: f64,
}

/// Monte Carlo sample statistics for one shock level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub shock_pct: f64,
    pub event_vol: f64,
    pub seed: u64,
    pub sample_mean: f64,
    pub sample_std: f64,
    pub target_std: f64,
    pub within_tolerance: bool,
}

impl SimulationSummary {
    pub fn from_sample(shock_pct: f64, sample: &MoveSample) -> Self {
        Self {
            shock_pct,
            event_vol: sample.event_vol,
            seed: sample.seed,
            sample_mean: sample.sample_mean,
            sample_std: sample.sample_std,
            target_std: sample.daily_vol,
            within_tolerance: sample.warning.is_none(),
        }
    }
}

/// Base-crush EV of the top strategy under stressed slippage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlippageSensitivity {
    pub strategy: String,
    pub base_fraction: f64,
    pub stressed_fraction: f64,
    pub base_ev: f64,
    pub stressed_ev: f64,
}

impl SlippageSensitivity {
    pub fn ev_change(&self) -> f64 {
        self.stressed_ev - self.base_ev
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub inputs: RunInputs,
    pub front_expiry: NaiveDate,
    pub back1_expiry: NaiveDate,
    pub back2_expiry: Option<NaiveDate>,
    pub event: EventVarianceResult,
    pub event_vol: f64,
    /// Event vol over front ATM IV.
    pub event_vol_ratio: f64,
    pub implied_move: f64,
    pub historical_p75: f64,
    pub expected_move_dollar: f64,
    pub offset_fraction: f64,
    pub simulations: Vec<SimulationSummary>,
    /// Ranked best first.
    pub strategies: Vec<ScoredStrategy>,
    pub warnings: Vec<ModelWarning>,
    pub slippage_sensitivity: Option<SlippageSensitivity>,
    pub config: EngineConfig,
}

impl AnalysisReport {
    pub fn top(&self) -> Option<&ScoredStrategy> {
        self.strategies.first()
    }

    pub fn strategy(&self, name: &str) -> Option<&ScoredStrategy> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Earnings Event Analysis (valuation {}, event {})\n\
             ----------------------------------------\n\
             Spot: ${:.2}\n\
             Front/Back1 IV: {:.1}% / {:.1}% ({})\n\
             Event Vol: {:.1}% (ratio to front {:.2})\n\
             Event Variance Share: {:.1}%\n\
             Implied Move: {:.2}%  Historical P75: {:.2}%\n\
             Expected Move: ${:.2} per contract\n\
             \n\
             Rank  Strategy         Score    EV        CVaR      Convexity  Risk\n",
            self.inputs.valuation_date,
            self.inputs.event_date,
            self.inputs.spot,
            self.event.front_iv * 100.0,
            self.event.back1_iv * 100.0,
            self.event.interpolation_method.as_str(),
            self.event_vol * 100.0,
            self.event_vol_ratio,
            self.event.event_variance_ratio * 100.0,
            self.implied_move * 100.0,
            self.historical_p75 * 100.0,
            self.expected_move_dollar,
        );
        for s in &self.strategies {
            out.push_str(&format!(
                "{:<5} {:<16} {:<8.4} {:<9.2} {:<9.2} {:<10.2} {}\n",
                s.rank,
                s.name(),
                s.composite_score,
                s.metrics.expected_value,
                s.metrics.cvar,
                s.metrics.convexity,
                if s.risk_penalty_applied { "undefined" } else { "defined" },
            ));
        }
        if let Some(sens) = &self.slippage_sensitivity {
            out.push_str(&format!(
                "\nSlippage x{:.1} on {}: EV ${:.2} -> ${:.2}\n",
                sens.stressed_fraction / sens.base_fraction.max(f64::EPSILON),
                sens.strategy,
                sens.base_ev,
                sens.stressed_ev,
            ));
        }
        if !self.warnings.is_empty() {
            out.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for w in &self.warnings {
                out.push_str(&format!("  - {}\n", w));
            }
        }
        out
    }
}
