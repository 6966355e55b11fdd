//! Event variance extraction from the term structure.
//!
//! Splits front-expiry total variance into a pre-event baseline and the
//! excess variance of the event day:
//! - Two-point: baseline total variance is linearly interpolated between
//!   back1 and back2 at `t_front - dt_event` (interpolation is in total
//!   variance `t * iv^2`, never in variance rate).
//! - Single-point: flat back1 vol over the pre-event period.
//!
//! The event day itself also carries the baseline diffusion rate, which
//! is subtracted so that a flat surface yields zero event variance.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EventConfig, TIME_EPSILON, TRADING_DAYS_PER_YEAR};
use crate::data::{OptionsChain, TermStructure};
use crate::error::{EngineError, EngineResult, ModelWarning, WarningLevel};

/// One trading day of pure event variance.
pub const DT_EVENT: f64 = 1.0 / TRADING_DAYS_PER_YEAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterpolationMethod {
    #[serde(rename = "two-point")]
    TwoPoint,
    #[serde(rename = "single-point")]
    SinglePoint,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoPoint => "two-point",
            Self::SinglePoint => "single-point",
        }
    }
}

/// Event variance diagnostics for one run.
#[derive(Debug, Clone, Serialize)]
pub struct EventVarianceResult {
    pub front_iv: f64,
    pub back1_iv: f64,
    pub back2_iv: Option<f64>,
    pub t_front: f64,
    pub t_back1: f64,
    pub t_back2: Option<f64>,
    pub dt_event: f64,
    /// Baseline total variance at `t_front - dt_event`.
    pub pre_event_total_variance: f64,
    /// `(t_front * front_iv^2 - TV_pre) / dt_event`, annualized.
    pub event_day_variance: f64,
    /// Variance rate an ordinary day contributes under the baseline.
    pub baseline_variance_rate: f64,
    pub raw_event_variance: f64,
    pub clamped_event_variance: f64,
    /// Event share of total front variance.
    pub event_variance_ratio: f64,
    pub interpolation_method: InterpolationMethod,
    pub negative_flag: bool,
    pub warning_level: Option<WarningLevel>,
    /// |raw| / front_iv^2, populated when `negative_flag` is set.
    pub negative_ratio: Option<f64>,
    /// front_iv - back1_iv.
    pub front_back_spread: f64,
    /// back2_iv - back1_iv, when back2 is present.
    pub back_slope: Option<f64>,
}

impl EventVarianceResult {
    /// Annualized event vol fed to the simulator.
    pub fn event_vol(&self) -> f64 {
        self.clamped_event_variance.sqrt()
    }

    pub fn warning(&self) -> Option<ModelWarning> {
        match (self.warning_level, self.negative_ratio) {
            (Some(level), Some(ratio)) => Some(ModelWarning::NegativeEventVariance {
                raw_event_variance: self.raw_event_variance,
                ratio,
                level,
            }),
            _ => None,
        }
    }
}

/// ATM implied vol: mean positive IV over quotes at the strike nearest spot.
pub fn atm_iv(chain: &OptionsChain, spot: f64) -> EngineResult<f64> {
    let strike = chain.nearest_strike(spot).ok_or_else(|| {
        EngineError::data(format!("chain {} has no quotes", chain.expiration))
    })?;
    let ivs: Vec<f64> = chain
        .quotes()
        .filter(|q| q.strike == strike && q.mid_iv.is_finite() && q.mid_iv > 0.0)
        .map(|q| q.mid_iv)
        .collect();
    if ivs.is_empty() {
        return Err(EngineError::data(format!(
            "no positive IV at ATM strike {} for {}",
            strike, chain.expiration
        )));
    }
    Ok(ivs.iter().sum::<f64>() / ivs.len() as f64)
}

/// Linear interpolation through `(x1, y1)` and `(x2, y2)`.
pub fn linear_interp(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    if x2 == x1 {
        return y1;
    }
    y1 + (x - x1) / (x2 - x1) * (y2 - y1)
}

/// Computes [`EventVarianceResult`] from a term structure.
pub struct EventVarianceExtractor {
    severe_ratio: f64,
}

impl Default for EventVarianceExtractor {
    fn default() -> Self {
        Self::new(&EventConfig::default())
    }
}

impl EventVarianceExtractor {
    pub fn new(config: &EventConfig) -> Self {
        Self {
            severe_ratio: config.negative_variance_severe_ratio,
        }
    }

    pub fn extract(&self, ts: &TermStructure, spot: f64) -> EngineResult<EventVarianceResult> {
        let front_iv = atm_iv(&ts.front, spot)?;
        let back1_iv = atm_iv(&ts.back1, spot)?;
        let back2_iv = ts.back2.as_ref().map(|c| atm_iv(c, spot)).transpose()?;
        let t_back2 = ts.t_back2();

        self.from_levels(
            front_iv,
            back1_iv,
            back2_iv.zip(t_back2),
            ts.t_front(),
            ts.t_back1(),
        )
    }

    /// Core arithmetic on ATM levels and times.
    pub fn from_levels(
        &self,
        front_iv: f64,
        back1_iv: f64,
        back2: Option<(f64, f64)>,
        t_front: f64,
        t_back1: f64,
    ) -> EngineResult<EventVarianceResult> {
        for (label, iv) in [("front", front_iv), ("back1", back1_iv)] {
            if !(iv.is_finite() && iv > 0.0) {
                return Err(EngineError::data(format!("{} ATM IV must be positive", label)));
            }
        }

        let dt_event = DT_EVENT;
        let t_target = (t_front - dt_event).max(TIME_EPSILON);
        let tv_front = t_front * front_iv.powi(2);
        let tv_back1 = t_back1 * back1_iv.powi(2);

        let (method, tv_pre, baseline_rate) = match back2 {
            Some((back2_iv, t_back2)) => {
                let tv_back2 = t_back2 * back2_iv.powi(2);
                let tv_pre = linear_interp(t_back1, tv_back1, t_back2, tv_back2, t_target);
                let rate = if t_back2 != t_back1 {
                    (tv_back2 - tv_back1) / (t_back2 - t_back1)
                } else {
                    back1_iv.powi(2)
                };
                (InterpolationMethod::TwoPoint, tv_pre, rate)
            }
            None => (
                InterpolationMethod::SinglePoint,
                t_target * back1_iv.powi(2),
                back1_iv.powi(2),
            ),
        };

        let event_day_variance = (tv_front - tv_pre) / dt_event;
        let raw = event_day_variance - baseline_rate;
        let clamped = raw.max(0.0);
        let ratio = if tv_front > 0.0 {
            raw * dt_event / tv_front
        } else {
            0.0
        };

        let negative_flag = raw < 0.0;
        let (warning_level, negative_ratio) = if negative_flag {
            let r = raw.abs() / front_iv.powi(2).max(TIME_EPSILON);
            let level = if r >= self.severe_ratio {
                WarningLevel::Severe
            } else {
                WarningLevel::Mild
            };
            (Some(level), Some(r))
        } else {
            (None, None)
        };

        let result = EventVarianceResult {
            front_iv,
            back1_iv,
            back2_iv: back2.map(|(iv, _)| iv),
            t_front,
            t_back1,
            t_back2: back2.map(|(_, t)| t),
            dt_event,
            pre_event_total_variance: tv_pre,
            event_day_variance,
            baseline_variance_rate: baseline_rate,
            raw_event_variance: raw,
            clamped_event_variance: clamped,
            event_variance_ratio: ratio,
            interpolation_method: method,
            negative_flag,
            warning_level,
            negative_ratio,
            front_back_spread: front_iv - back1_iv,
            back_slope: back2.map(|(iv, _)| iv - back1_iv),
        };

        if let Some(warning) = result.warning() {
            warning.emit();
        }
        debug!(?result, "event variance diagnostics");
        info!(
            front_iv,
            back1_iv,
            raw_event_variance = raw,
            event_vol = result.event_vol(),
            method = ?method,
            "extracted event variance"
        );
        Ok(result)
    }
}
