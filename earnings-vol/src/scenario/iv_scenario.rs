//! Post-event implied-vol scenarios.
//!
//! A scenario assigns each expiry bucket a shift of its ATM level. Legs
//! are repriced at `leg_iv * target_atm / entry_atm`, which moves the
//! level of the smile while keeping its shape.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::atm_iv;
use crate::config::{ScenarioConfig, VOL_EPSILON};
use crate::data::TermStructure;
use crate::error::EngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryBucket {
    Front,
    Back,
}

/// How a bucket's ATM level moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "fraction", rename_all = "snake_case")]
pub enum ScenarioShift {
    /// Front collapses to back1's ATM; back expiries keep their own level.
    CollapseToBack,
    /// ATM scaled by `1 + fraction`.
    Proportional(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IvScenario {
    BaseCrush,
    HardCrush,
    Expansion,
}

impl IvScenario {
    pub const ALL: [IvScenario; 3] = [Self::BaseCrush, Self::HardCrush, Self::Expansion];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseCrush => "base_crush",
            Self::HardCrush => "hard_crush",
            Self::Expansion => "expansion",
        }
    }

    pub fn shift(&self, bucket: ExpiryBucket, config: &ScenarioConfig) -> ScenarioShift {
        let pick = |front, back| match bucket {
            ExpiryBucket::Front => ScenarioShift::Proportional(front),
            ExpiryBucket::Back => ScenarioShift::Proportional(back),
        };
        match self {
            Self::BaseCrush => ScenarioShift::CollapseToBack,
            Self::HardCrush => pick(config.hard_crush.front, config.hard_crush.back),
            Self::Expansion => pick(config.expansion.front, config.expansion.back),
        }
    }
}

/// Entry ATM IV per expiry of the term structure.
#[derive(Debug, Clone, Serialize)]
pub struct AtmLevels {
    pub front_expiry: NaiveDate,
    pub back1_atm: f64,
    pub by_expiry: Vec<(NaiveDate, f64)>,
}

impl AtmLevels {
    pub fn from_term_structure(ts: &TermStructure, spot: f64) -> EngineResult<Self> {
        let by_expiry = ts
            .chains()
            .map(|c| atm_iv(c, spot).map(|iv| (c.expiration, iv)))
            .collect::<EngineResult<Vec<_>>>()?;
        let back1_atm = atm_iv(&ts.back1, spot)?;
        Ok(Self {
            front_expiry: ts.front.expiration,
            back1_atm,
            by_expiry,
        })
    }

    pub fn entry_atm(&self, expiry: NaiveDate) -> Option<f64> {
        self.by_expiry
            .iter()
            .find(|(e, _)| *e == expiry)
            .map(|(_, iv)| *iv)
    }

    pub fn bucket(&self, expiry: NaiveDate) -> ExpiryBucket {
        if expiry == self.front_expiry {
            ExpiryBucket::Front
        } else {
            ExpiryBucket::Back
        }
    }
}

/// A scenario resolved against one run's ATM levels.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub scenario: IvScenario,
    pub front: ScenarioShift,
    pub back: ScenarioShift,
    levels: AtmLevels,
}

impl ScenarioState {
    pub fn new(scenario: IvScenario, config: &ScenarioConfig, levels: AtmLevels) -> Self {
        Self {
            scenario,
            front: scenario.shift(ExpiryBucket::Front, config),
            back: scenario.shift(ExpiryBucket::Back, config),
            levels,
        }
    }

    /// All scenarios for one run.
    pub fn all(config: &ScenarioConfig, levels: &AtmLevels) -> Vec<Self> {
        IvScenario::ALL
            .into_iter()
            .map(|s| Self::new(s, config, levels.clone()))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.scenario.name()
    }

    /// Post-event ATM level for an expiry, given its entry level.
    pub fn target_atm(&self, expiry: NaiveDate, entry_atm: f64) -> f64 {
        let bucket = self.levels.bucket(expiry);
        let shift = match bucket {
            ExpiryBucket::Front => self.front,
            ExpiryBucket::Back => self.back,
        };
        match (shift, bucket) {
            (ScenarioShift::CollapseToBack, ExpiryBucket::Front) => self.levels.back1_atm,
            (ScenarioShift::CollapseToBack, ExpiryBucket::Back) => entry_atm,
            (ScenarioShift::Proportional(f), _) => entry_atm * (1.0 + f),
        }
    }

    /// Repricing vol for a leg. Expiries outside the term structure use
    /// the leg's own IV as their entry level.
    pub fn leg_vol(&self, expiry: NaiveDate, leg_iv: f64) -> f64 {
        let entry_atm = self.levels.entry_atm(expiry).unwrap_or(leg_iv);
        let target = self.target_atm(expiry, entry_atm);
        (leg_iv * target / entry_atm.max(VOL_EPSILON)).max(VOL_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn levels() -> AtmLevels {
        AtmLevels {
            front_expiry: d(9),
            back1_atm: 0.50,
            by_expiry: vec![(d(9), 0.80), (d(16), 0.50), (d(23), 0.48)],
        }
    }

    fn state(s: IvScenario) -> ScenarioState {
        ScenarioState::new(s, &ScenarioConfig::default(), levels())
    }

    #[test]
    fn test_base_crush_front_collapses_to_back1() {
        let st = state(IvScenario::BaseCrush);
        assert_relative_eq!(st.leg_vol(d(9), 0.80), 0.50, epsilon = 1e-12);
        // Off-ATM front leg keeps its relative smile
        assert_relative_eq!(st.leg_vol(d(9), 0.88), 0.88 * 0.50 / 0.80, epsilon = 1e-12);
        // Back legs unchanged
        assert_relative_eq!(st.leg_vol(d(16), 0.52), 0.52, epsilon = 1e-12);
        assert_relative_eq!(st.leg_vol(d(23), 0.47), 0.47, epsilon = 1e-12);
    }

    #[test]
    fn test_hard_crush_and_expansion() {
        let hard = state(IvScenario::HardCrush);
        assert_relative_eq!(hard.leg_vol(d(9), 0.80), 0.80 * 0.65, epsilon = 1e-12);
        assert_relative_eq!(hard.leg_vol(d(16), 0.55), 0.55 * 0.90, epsilon = 1e-12);

        let exp = state(IvScenario::Expansion);
        assert_relative_eq!(exp.leg_vol(d(9), 0.80), 0.88, epsilon = 1e-12);
        assert_relative_eq!(exp.leg_vol(d(16), 0.50), 0.525, epsilon = 1e-12);
    }

    #[test]
    fn test_vol_is_floored() {
        let mut config = ScenarioConfig::default();
        config.hard_crush.front = -0.999_999_9;
        let st = ScenarioState::new(IvScenario::HardCrush, &config, levels());
        assert!(st.leg_vol(d(9), 0.80) >= VOL_EPSILON);
    }

    #[test]
    fn test_shift_variants() {
        let config = ScenarioConfig::default();
        assert_eq!(
            IvScenario::BaseCrush.shift(ExpiryBucket::Back, &config),
            ScenarioShift::CollapseToBack
        );
        assert_eq!(
            IvScenario::HardCrush.shift(ExpiryBucket::Front, &config),
            ScenarioShift::Proportional(-0.35)
        );
        assert_eq!(ScenarioState::all(&config, &levels()).len(), 3);
    }
}
