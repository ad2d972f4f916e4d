// Difficulty presets and the tunable parameter bundle.
//
// `DifficultyParameters` is a plain value: the search loop clones it at the
// start of every attempt and `adjust.rs` derives the next bundle from the
// previous one, so no attempt ever sees a bundle mutated under it. The three
// canonical presets are the only required initial values.
//
// Callers may layer a partial JSON override (`ParameterOverrides`) on top of
// a preset; the merged bundle is validated before generation starts.

use crate::error::{CourseError, Result};
use crate::event::LANE_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three difficulty tiers a course is generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    /// The canonical parameter preset for this tier.
    pub fn preset(self) -> DifficultyParameters {
        match self {
            Difficulty::Easy => DifficultyParameters::easy(),
            Difficulty::Normal => DifficultyParameters::normal(),
            Difficulty::Hard => DifficultyParameters::hard(),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(CourseError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Tunables for one generation attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParameters {
    /// Only every `beat_skip`-th beat is a spawn candidate.
    pub beat_skip: usize,
    /// Largest obstacle cluster on a single beat (1-3).
    pub max_per_cluster: usize,

    // Obstacle type weights; pickups are split off separately.
    pub crash_weight: f64,
    pub car_weight: f64,
    pub slow_weight: f64,
    /// Fraction of selected beats that become pickups.
    pub pickup_ratio: f64,

    /// Lanes that must stay unblocked in every time group.
    pub min_safe_lanes: usize,
    /// Fraction of eligible beats that receive an event at full quota.
    pub density: f64,
    /// Quota fraction of the first section; the last section gets 1.0.
    pub curve_start: f64,
    /// Beats whose sampled energy falls below this never spawn.
    pub energy_floor: f64,
    /// 0 ignores energy when ranking beats, 1 ranks purely by energy.
    pub energy_influence: f64,

    /// Lanes swept by one wave cycle.
    pub wave_amplitude: usize,
    /// Events per full wave cycle.
    pub wave_period: usize,
    /// Probability that an obstacle lane is nudged off the wave by one lane.
    pub wave_noise: f64,

    pub cluster2_energy: f64,
    pub cluster3_energy: f64,
    pub cluster2_prob: f64,
    pub cluster3_prob: f64,
}

impl Default for DifficultyParameters {
    fn default() -> Self {
        DifficultyParameters {
            beat_skip: 2,
            max_per_cluster: 2,
            crash_weight: 0.35,
            car_weight: 0.30,
            slow_weight: 0.15,
            pickup_ratio: 0.25,
            min_safe_lanes: 2,
            density: 0.55,
            curve_start: 0.20,
            energy_floor: 0.12,
            energy_influence: 0.5,
            wave_amplitude: 3,
            wave_period: 12,
            wave_noise: 0.15,
            cluster2_energy: 0.65,
            cluster3_energy: 0.82,
            cluster2_prob: 0.45,
            cluster3_prob: 0.25,
        }
    }
}

impl DifficultyParameters {
    pub fn easy() -> Self {
        DifficultyParameters {
            beat_skip: 4,
            max_per_cluster: 1,
            crash_weight: 0.25,
            car_weight: 0.20,
            slow_weight: 0.20,
            pickup_ratio: 0.35,
            min_safe_lanes: 3,
            density: 0.55,
            curve_start: 0.15,
            energy_floor: 0.18,
            energy_influence: 0.4,
            wave_amplitude: 3,
            wave_period: 10,
            wave_noise: 0.15,
            ..Default::default()
        }
    }

    pub fn normal() -> Self {
        DifficultyParameters {
            beat_skip: 2,
            max_per_cluster: 2,
            crash_weight: 0.35,
            car_weight: 0.30,
            slow_weight: 0.15,
            pickup_ratio: 0.25,
            min_safe_lanes: 2,
            density: 0.55,
            curve_start: 0.20,
            energy_floor: 0.12,
            energy_influence: 0.6,
            wave_amplitude: 3,
            wave_period: 14,
            wave_noise: 0.15,
            cluster2_energy: 0.65,
            cluster2_prob: 0.45,
            ..Default::default()
        }
    }

    pub fn hard() -> Self {
        DifficultyParameters {
            beat_skip: 1,
            max_per_cluster: 3,
            crash_weight: 0.45,
            car_weight: 0.30,
            slow_weight: 0.10,
            pickup_ratio: 0.12,
            min_safe_lanes: 1,
            density: 0.55,
            curve_start: 0.25,
            energy_floor: 0.08,
            energy_influence: 0.7,
            wave_amplitude: 3,
            wave_period: 16,
            wave_noise: 0.20,
            cluster2_energy: 0.55,
            cluster2_prob: 0.55,
            cluster3_energy: 0.75,
            cluster3_prob: 0.35,
        }
    }

    /// Reject bundles that cannot drive generation.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(CourseError::InvalidParameters(msg));

        if self.beat_skip == 0 {
            return fail("beat_skip must be at least 1".into());
        }
        if !(1..=3).contains(&self.max_per_cluster) {
            return fail(format!(
                "max_per_cluster must be in 1..=3, got {}",
                self.max_per_cluster
            ));
        }
        if !(1..=LANE_COUNT).contains(&self.min_safe_lanes) {
            return fail(format!(
                "min_safe_lanes must be in 1..={LANE_COUNT}, got {}",
                self.min_safe_lanes
            ));
        }
        if self.wave_period == 0 {
            return fail("wave_period must be at least 1".into());
        }

        let fractions = [
            ("crash_weight", self.crash_weight),
            ("car_weight", self.car_weight),
            ("slow_weight", self.slow_weight),
            ("pickup_ratio", self.pickup_ratio),
            ("density", self.density),
            ("curve_start", self.curve_start),
            ("energy_floor", self.energy_floor),
            ("energy_influence", self.energy_influence),
            ("wave_noise", self.wave_noise),
            ("cluster2_energy", self.cluster2_energy),
            ("cluster3_energy", self.cluster3_energy),
            ("cluster2_prob", self.cluster2_prob),
            ("cluster3_prob", self.cluster3_prob),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || value < 0.0 {
                return fail(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if self.crash_weight + self.car_weight + self.slow_weight <= 0.0 {
            return fail("at least one obstacle weight must be positive".into());
        }
        Ok(())
    }

    /// Apply a partial override and validate the result.
    pub fn with_overrides(&self, overrides: &ParameterOverrides) -> Result<Self> {
        let mut p = self.clone();
        overrides.apply(&mut p);
        p.validate()?;
        Ok(p)
    }
}

/// A partial parameter bundle, loaded from JSON, layered over a preset.
/// Fields left out keep the preset's value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterOverrides {
    pub beat_skip: Option<usize>,
    pub max_per_cluster: Option<usize>,
    pub crash_weight: Option<f64>,
    pub car_weight: Option<f64>,
    pub slow_weight: Option<f64>,
    pub pickup_ratio: Option<f64>,
    pub min_safe_lanes: Option<usize>,
    pub density: Option<f64>,
    pub curve_start: Option<f64>,
    pub energy_floor: Option<f64>,
    pub energy_influence: Option<f64>,
    pub wave_amplitude: Option<usize>,
    pub wave_period: Option<usize>,
    pub wave_noise: Option<f64>,
    pub cluster2_energy: Option<f64>,
    pub cluster3_energy: Option<f64>,
    pub cluster2_prob: Option<f64>,
    pub cluster3_prob: Option<f64>,
}

impl ParameterOverrides {
    /// Parse overrides from a JSON object. `origin` names the source in
    /// error messages.
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| CourseError::Json {
            origin: origin.to_string(),
            source,
        })
    }

    fn apply(&self, p: &mut DifficultyParameters) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { p.$field = v; })*
            };
        }
        set!(
            beat_skip,
            max_per_cluster,
            crash_weight,
            car_weight,
            slow_weight,
            pickup_ratio,
            min_safe_lanes,
            density,
            curve_start,
            energy_floor,
            energy_influence,
            wave_amplitude,
            wave_period,
            wave_noise,
            cluster2_energy,
            cluster3_energy,
            cluster2_prob,
            cluster3_prob,
        );
    }
}
