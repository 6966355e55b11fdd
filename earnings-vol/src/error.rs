//! Error and warning taxonomy.
//!
//! Fatal conditions abort a run through [`EngineError`]. Model-quality
//! signals that must be surfaced but never abort are carried as
//! [`ModelWarning`] values in the final report.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::data::LoaderError;

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input data is unusable (empty chain, no ATM strike, no liquidity).
    #[error("Data error: {0}")]
    Data(String),

    /// A configuration value is out of range.
    #[error("Config error: {0}")]
    Config(String),

    /// Expiry selection would price a leg at or before the event.
    #[error("Guard violation: {0}")]
    Guard(String),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
}

impl EngineError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn guard(msg: impl Into<String>) -> Self {
        Self::Guard(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Severity of a negative event-variance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Mild,
    Severe,
}

/// Which side of the convexity guard fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvexityGuardKind {
    /// Bottom-decile mean was within epsilon of zero.
    DenominatorFloor,
    /// Ratio exceeded the configured cap.
    Cap,
}

/// Non-fatal model-quality signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelWarning {
    NegativeEventVariance {
        raw_event_variance: f64,
        ratio: f64,
        level: WarningLevel,
    },
    MonteCarloTolerance {
        event_vol: f64,
        sample_mean: f64,
        sample_std: f64,
        target_std: f64,
    },
    ConvexityGuard {
        strategy: String,
        guard: ConvexityGuardKind,
        top_mean: f64,
        bottom_mean: f64,
    },
    WideAtmSpread {
        strike: f64,
        call_spread_pct: f64,
        put_spread_pct: f64,
    },
}

impl ModelWarning {
    /// Log the warning through `tracing`.
    pub fn emit(&self) {
        warn!(target: "earnings_vol::warning", "{}", self);
    }
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeEventVariance {
                raw_event_variance,
                ratio,
                level,
            } => write!(
                f,
                "negative event variance {:.6} (ratio {:.4}, {:?}); clamped to zero",
                raw_event_variance, ratio, level
            ),
            Self::MonteCarloTolerance {
                event_vol,
                sample_mean,
                sample_std,
                target_std,
            } => write!(
                f,
                "monte carlo sample outside tolerance for vol {:.4}: mean {:.6}, std {:.6}, target std {:.6}",
                event_vol, sample_mean, sample_std, target_std
            ),
            Self::ConvexityGuard {
                strategy,
                guard,
                top_mean,
                bottom_mean,
            } => write!(
                f,
                "convexity guard {:?} for {}: top {:.4}, bottom {:.4}",
                guard, strategy, top_mean, bottom_mean
            ),
            Self::WideAtmSpread {
                strike,
                call_spread_pct,
                put_spread_pct,
            } => write!(
                f,
                "wide ATM spread at strike {:.2}: call {:.2}%, put {:.2}%",
                strike,
                call_spread_pct * 100.0,
                put_spread_pct * 100.0
            ),
        }
    }
}
