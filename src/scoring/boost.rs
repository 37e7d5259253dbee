use serde::{Deserialize, Serialize};

use super::rules::ScoreComponents;
use crate::shared::AppError;

/// Per-component multipliers of a boost role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostMultipliers {
    pub runs: f64,
    pub fours: f64,
    pub sixes: f64,
    pub bat_milestones: f64,
    pub strike_rate: f64,
    pub wickets: f64,
    pub maidens: f64,
    pub bowl_milestones: f64,
    pub economy: f64,
    pub catches: f64,
    pub stumpings: f64,
    pub run_outs: f64,
    pub potm: f64,
    pub playing: f64,
}

const ALLOWED_MULTIPLIERS: [f64; 3] = [1.0, 1.5, 2.0];

impl Default for BoostMultipliers {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

impl BoostMultipliers {
    pub fn uniform(multiplier: f64) -> Self {
        Self {
            runs: multiplier,
            fours: multiplier,
            sixes: multiplier,
            bat_milestones: multiplier,
            strike_rate: multiplier,
            wickets: multiplier,
            maidens: multiplier,
            bowl_milestones: multiplier,
            economy: multiplier,
            catches: multiplier,
            stumpings: multiplier,
            run_outs: multiplier,
            potm: multiplier,
            playing: multiplier,
        }
    }

    fn values(&self) -> [f64; 14] {
        [
            self.runs,
            self.fours,
            self.sixes,
            self.bat_milestones,
            self.strike_rate,
            self.wickets,
            self.maidens,
            self.bowl_milestones,
            self.economy,
            self.catches,
            self.stumpings,
            self.run_outs,
            self.potm,
            self.playing,
        ]
    }

    /// The shared multiplier when every component carries the same value
    pub fn uniform_value(&self) -> Option<f64> {
        let values = self.values();
        let first = values[0];
        values.iter().all(|v| *v == first).then_some(first)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self
            .values()
            .into_iter()
            .find(|v| !ALLOWED_MULTIPLIERS.contains(v))
        {
            Some(bad) => Err(AppError::BadRequest(format!(
                "Boost multiplier {} is not one of 1.0, 1.5 or 2.0",
                bad
            ))),
            None => Ok(()),
        }
    }
}

/// Boost delta added on top of base points.
///
/// Uniform roles scale the whole base total, so a duck penalty is doubled by
/// a captain. Mixed roles act only on the listed sub-components.
pub fn boost_points(components: &ScoreComponents, multipliers: &BoostMultipliers) -> f64 {
    if let Some(multiplier) = multipliers.uniform_value() {
        return (multiplier - 1.0) * components.breakdown().total as f64;
    }

    let delta = |multiplier: f64, points: i32| (multiplier - 1.0) * points as f64;

    delta(multipliers.runs, components.runs)
        + delta(multipliers.fours, components.fours)
        + delta(multipliers.sixes, components.sixes)
        + delta(multipliers.bat_milestones, components.bat_milestones)
        + delta(multipliers.strike_rate, components.strike_rate)
        + delta(multipliers.wickets, components.wickets)
        + delta(multipliers.maidens, components.maidens)
        + delta(multipliers.bowl_milestones, components.bowl_milestones)
        + delta(multipliers.economy, components.economy)
        + delta(multipliers.catches, components.catches)
        + delta(multipliers.stumpings, components.stumpings)
        + delta(multipliers.run_outs, components.run_outs)
        + delta(multipliers.potm, components.potm)
        + delta(multipliers.playing, components.playing)
}
