//! Run configuration.
//!
//! One [`EngineConfig`] is built per run, validated once, and passed by
//! reference into every component. Each section deserializes with defaults
//! so partial JSON files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Trading days per year used for every year fraction.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Floor for time to expiry (years).
pub const TIME_EPSILON: f64 = 1e-6;

/// Floor for repriced implied volatilities.
pub const VOL_EPSILON: f64 = 1e-4;

/// Market parameters shared by pricing and payoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
    pub contract_multiplier: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            dividend_yield: 0.0003,
            contract_multiplier: 100.0,
        }
    }
}

/// Chain filters applied before any analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_open_interest: i64,
    /// Maximum (ask - bid) / mid.
    pub max_spread_pct: f64,
    pub moneyness_low: f64,
    pub moneyness_high: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_open_interest: 100,
            max_spread_pct: 0.05,
            moneyness_low: 0.80,
            moneyness_high: 1.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_samples: usize,
    pub seed: u64,
    /// Vol-of-vol shocks in percent. The zero shock is always evaluated
    /// in addition to these.
    pub vol_shocks_pct: Vec<f64>,
    /// Relative tolerance for the sample mean/std check.
    pub validation_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_samples: 100_000,
            seed: 42,
            vol_shocks_pct: vec![-10.0, -5.0, 5.0, 10.0],
            validation_tolerance: 0.03,
        }
    }
}

/// Fractional IV shift for the front and back buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketShift {
    pub front: f64,
    pub back: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub hard_crush: BucketShift,
    pub expansion: BucketShift,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            hard_crush: BucketShift {
                front: -0.35,
                back: -0.10,
            },
            expansion: BucketShift {
                front: 0.10,
                back: 0.05,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Strangle/spread offset as a multiple of the implied move.
    pub offset_multiplier: f64,
    /// Iron condor wing distance beyond the short strike.
    pub wing_pct: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            offset_multiplier: 0.8,
            wing_pct: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoffConfig {
    /// Fraction of the half-spread paid on every fill.
    pub slippage_fraction: f64,
    /// Settle at intrinsic value instead of repricing after the event.
    pub hold_to_expiry: bool,
    /// Slippage multiplier for the sensitivity check on the top strategy.
    pub stress_slippage_multiplier: f64,
}

impl Default for PayoffConfig {
    fn default() -> Self {
        Self {
            slippage_fraction: 0.10,
            hold_to_expiry: false,
            stress_slippage_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub ev: f64,
    pub convexity: f64,
    pub cvar: f64,
    pub robustness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ev: 0.4,
            convexity: 0.3,
            cvar: 0.2,
            robustness: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.ev + self.convexity + self.cvar + self.robustness
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub cvar_tail: f64,
    pub convexity_tail: f64,
    pub convexity_cap: f64,
    pub convexity_eps: f64,
    pub robustness_eps: f64,
    /// Multiplicative penalty for undefined-risk structures.
    pub undefined_risk_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            cvar_tail: 0.05,
            convexity_tail: 0.10,
            convexity_cap: 10.0,
            convexity_eps: 1e-6,
            robustness_eps: 1e-9,
            undefined_risk_penalty: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// |raw| / front_iv^2 at or above this is a severe warning.
    pub negative_variance_severe_ratio: f64,
    /// ATM spread/mid above this flags the implied move estimate.
    pub implied_move_max_spread_pct: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            negative_variance_severe_ratio: 0.25,
            implied_move_max_spread_pct: 0.10,
        }
    }
}

/// Complete configuration for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub market: MarketConfig,
    pub filters: FilterConfig,
    pub simulation: SimulationConfig,
    pub scenarios: ScenarioConfig,
    pub structures: StructureConfig,
    pub payoff: PayoffConfig,
    pub scoring: ScoringConfig,
    pub event: EventConfig,
}

impl EngineConfig {
    /// Load from a JSON file and validate.
    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| EngineError::config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> EngineResult<()> {
        let m = &self.market;
        ensure_finite("market.risk_free_rate", m.risk_free_rate)?;
        ensure_finite("market.dividend_yield", m.dividend_yield)?;
        ensure_positive("market.contract_multiplier", m.contract_multiplier)?;

        let f = &self.filters;
        if f.min_open_interest < 0 {
            return Err(EngineError::config("filters.min_open_interest must be >= 0"));
        }
        ensure_positive("filters.max_spread_pct", f.max_spread_pct)?;
        ensure_positive("filters.moneyness_low", f.moneyness_low)?;
        if f.moneyness_high <= f.moneyness_low {
            return Err(EngineError::config(format!(
                "filters.moneyness_high ({}) must exceed moneyness_low ({})",
                f.moneyness_high, f.moneyness_low
            )));
        }

        let s = &self.simulation;
        if s.n_samples < 20 {
            return Err(EngineError::config(format!(
                "simulation.n_samples must be at least 20, got {}",
                s.n_samples
            )));
        }
        for shock in &s.vol_shocks_pct {
            if !shock.is_finite() || *shock <= -100.0 {
                return Err(EngineError::config(format!(
                    "simulation.vol_shocks_pct entries must be > -100, got {}",
                    shock
                )));
            }
        }
        ensure_positive("simulation.validation_tolerance", s.validation_tolerance)?;

        for (name, shift) in [
            ("scenarios.hard_crush", self.scenarios.hard_crush),
            ("scenarios.expansion", self.scenarios.expansion),
        ] {
            if shift.front <= -1.0 || shift.back <= -1.0 {
                return Err(EngineError::config(format!(
                    "{} shifts must be > -1.0, got front {} back {}",
                    name, shift.front, shift.back
                )));
            }
        }

        ensure_positive("structures.offset_multiplier", self.structures.offset_multiplier)?;
        let wing = self.structures.wing_pct;
        if !(wing > 0.0 && wing < 1.0) {
            return Err(EngineError::config(format!(
                "structures.wing_pct must be in (0, 1), got {}",
                wing
            )));
        }

        let p = &self.payoff;
        if !(0.0..=1.0).contains(&p.slippage_fraction) {
            return Err(EngineError::config(format!(
                "payoff.slippage_fraction must be in [0, 1], got {}",
                p.slippage_fraction
            )));
        }
        ensure_positive(
            "payoff.stress_slippage_multiplier",
            p.stress_slippage_multiplier,
        )?;

        let sc = &self.scoring;
        let w = sc.weights;
        if [w.ev, w.convexity, w.cvar, w.robustness]
            .iter()
            .any(|x| !x.is_finite() || *x < 0.0)
            || w.sum() <= 0.0
        {
            return Err(EngineError::config(
                "scoring.weights must be non-negative with a positive sum",
            ));
        }
        for (name, tail) in [
            ("scoring.cvar_tail", sc.cvar_tail),
            ("scoring.convexity_tail", sc.convexity_tail),
        ] {
            if !(tail > 0.0 && tail <= 0.5) {
                return Err(EngineError::config(format!(
                    "{} must be in (0, 0.5], got {}",
                    name, tail
                )));
            }
        }
        ensure_positive("scoring.convexity_cap", sc.convexity_cap)?;
        ensure_positive("scoring.convexity_eps", sc.convexity_eps)?;
        ensure_positive("scoring.robustness_eps", sc.robustness_eps)?;
        if !(0.0..1.0).contains(&sc.undefined_risk_penalty) {
            return Err(EngineError::config(format!(
                "scoring.undefined_risk_penalty must be in [0, 1), got {}",
                sc.undefined_risk_penalty
            )));
        }

        ensure_positive(
            "event.negative_variance_severe_ratio",
            self.event.negative_variance_severe_ratio,
        )?;
        ensure_positive(
            "event.implied_move_max_spread_pct",
            self.event.implied_move_max_spread_pct,
        )?;

        Ok(())
    }

    /// Strangle/spread offset fraction, which must lie in (0, 0.5).
    pub fn offset_fraction(&self, implied_move: f64) -> EngineResult<f64> {
        let offset = implied_move * self.structures.offset_multiplier;
        if !(offset > 0.0 && offset < 0.5) {
            return Err(EngineError::config(format!(
                "offset fraction {:.4} (implied move {:.4} x {}) must be in (0, 0.5)",
                offset, implied_move, self.structures.offset_multiplier
            )));
        }
        Ok(offset)
    }

    /// Shock levels used for robustness, zero first.
    pub fn shock_levels(&self) -> Vec<f64> {
        let mut levels = vec![0.0];
        levels.extend(
            self.simulation
                .vol_shocks_pct
                .iter()
                .copied()
                .filter(|s| *s != 0.0),
        );
        levels
    }
}

fn ensure_finite(name: &str, value: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(EngineError::config(format!("{} must be finite", name)));
    }
    Ok(())
}

fn ensure_positive(name: &str, value: f64) -> EngineResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(EngineError::config(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}
