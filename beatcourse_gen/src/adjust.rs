// Parameter adaptation between search attempts.
//
// Each rule watches one sub-score. When that score falls below its bar, the
// rule nudges the parameters that remedy it, in proportion to the deficit
// (10 - score). Every nudge moves a field in one direction only and stops at
// a fixed floor or ceiling, so repeated adjustment converges instead of
// drifting.

use crate::event::LANE_COUNT;
use crate::params::DifficultyParameters;
use crate::scoring::ScoreBreakdown;

/// Flow and cull rate are held to a higher bar than the other scores.
pub const STRICT_BAR: f64 = 9.5;
pub const DEFAULT_BAR: f64 = 9.0;

pub const MAX_WAVE_PERIOD: usize = 24;
pub const MIN_CURVE_START: f64 = 0.02;
pub const PICKUP_RATIO_RANGE: (f64, f64) = (0.08, 0.45);
pub const MAX_ENERGY_INFLUENCE: f64 = 0.95;
pub const MAX_ENERGY_FLOOR: f64 = 0.35;
pub const MIN_DENSITY: f64 = 0.25;
pub const MIN_CLUSTER2_PROB: f64 = 0.05;
pub const MIN_CLUSTER3_PROB: f64 = 0.02;

/// Step sizes, per point of deficit.
const NOISE_STEP: f64 = 0.02;
const CURVE_STEP: f64 = 0.02;
const WEIGHT_PULL: f64 = 0.08;
const PICKUP_STEP: f64 = 0.01;
const INFLUENCE_STEP: f64 = 0.06;
const FLOOR_STEP: f64 = 0.02;
const DENSITY_STEP: f64 = 0.02;
const CLUSTER_STEP: f64 = 0.03;

/// Lower a value by `step`, never below `floor`. Values already under the
/// floor are left alone.
fn lower(value: f64, step: f64, floor: f64) -> f64 {
    if value <= floor {
        value
    } else {
        (value - step).max(floor)
    }
}

/// Raise a value by `step`, never above `ceiling`. Values already over the
/// ceiling are left alone.
fn raise(value: f64, step: f64, ceiling: f64) -> f64 {
    if value >= ceiling {
        value
    } else {
        (value + step).min(ceiling)
    }
}

/// Derive the parameters for the next attempt from the last attempt's score.
pub fn adjust_params(params: &DifficultyParameters, scores: &ScoreBreakdown) -> DifficultyParameters {
    let mut p = params.clone();

    if scores.flow < STRICT_BAR {
        let deficit = 10.0 - scores.flow;
        p.wave_noise = lower(p.wave_noise, NOISE_STEP * deficit, 0.0);
        if p.wave_period < MAX_WAVE_PERIOD {
            p.wave_period += 1;
        }
    }

    if scores.difficulty_curve < DEFAULT_BAR {
        let deficit = 10.0 - scores.difficulty_curve;
        p.curve_start = lower(p.curve_start, CURVE_STEP * deficit, MIN_CURVE_START);
    }

    if scores.type_variety < DEFAULT_BAR {
        let deficit = 10.0 - scores.type_variety;
        let mean = (p.crash_weight + p.car_weight + p.slow_weight) / 3.0;
        let pull = (WEIGHT_PULL * deficit).min(1.0);
        p.crash_weight += (mean - p.crash_weight) * pull;
        p.car_weight += (mean - p.car_weight) * pull;
        p.slow_weight += (mean - p.slow_weight) * pull;
        let (lo, hi) = PICKUP_RATIO_RANGE;
        p.pickup_ratio = (p.pickup_ratio + PICKUP_STEP * deficit).clamp(lo, hi);
    }

    if scores.lane_coverage < DEFAULT_BAR {
        let deficit = 10.0 - scores.lane_coverage;
        p.wave_amplitude = LANE_COUNT - 1;
        p.wave_noise = lower(p.wave_noise, NOISE_STEP * deficit, 0.0);
    }

    if scores.energy_match < DEFAULT_BAR {
        let deficit = 10.0 - scores.energy_match;
        p.energy_influence = raise(p.energy_influence, INFLUENCE_STEP * deficit, MAX_ENERGY_INFLUENCE);
        p.energy_floor = raise(p.energy_floor, FLOOR_STEP * deficit, MAX_ENERGY_FLOOR);
    }

    if scores.cull_rate < STRICT_BAR {
        let deficit = 10.0 - scores.cull_rate;
        p.density = lower(p.density, DENSITY_STEP * deficit, MIN_DENSITY);
        p.cluster2_prob = lower(p.cluster2_prob, CLUSTER_STEP * deficit, MIN_CLUSTER2_PROB);
        p.cluster3_prob = lower(p.cluster3_prob, CLUSTER_STEP * deficit, MIN_CLUSTER3_PROB);
    }

    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect() -> ScoreBreakdown {
        ScoreBreakdown {
            beat_sync: 10.0,
            flow: 10.0,
            difficulty_curve: 10.0,
            type_variety: 10.0,
            lane_coverage: 10.0,
            energy_match: 10.0,
            cull_rate: 10.0,
        }
    }

    #[test]
    fn test_good_scores_change_nothing() {
        let p = DifficultyParameters::normal();
        let scores = ScoreBreakdown {
            flow: 9.5,
            cull_rate: 9.5,
            difficulty_curve: 9.0,
            ..perfect()
        };
        assert_eq!(adjust_params(&p, &scores), p);
    }

    #[test]
    fn test_weak_flow_smooths_the_wave() {
        let p = DifficultyParameters::hard();
        let next = adjust_params(&p, &ScoreBreakdown { flow: 7.0, ..perfect() });
        assert!((next.wave_noise - (0.20 - 0.06)).abs() < 1e-12);
        assert_eq!(next.wave_period, p.wave_period + 1);
    }

    #[test]
    fn test_weak_variety_pulls_weights_together() {
        let p = DifficultyParameters::hard();
        let next = adjust_params(&p, &ScoreBreakdown { type_variety: 5.0, ..perfect() });
        let spread = |q: &DifficultyParameters| {
            let ws = [q.crash_weight, q.car_weight, q.slow_weight];
            ws.iter().cloned().fold(f64::MIN, f64::max) - ws.iter().cloned().fold(f64::MAX, f64::min)
        };
        assert!(spread(&next) < spread(&p));
        let before = p.crash_weight + p.car_weight + p.slow_weight;
        let after = next.crash_weight + next.car_weight + next.slow_weight;
        assert!((before - after).abs() < 1e-12, "weight mass is preserved");
        assert!((next.pickup_ratio - 0.17).abs() < 1e-12);
    }

    #[test]
    fn test_weak_energy_match_leans_on_energy() {
        let p = DifficultyParameters::normal();
        let next = adjust_params(&p, &ScoreBreakdown { energy_match: 5.0, ..perfect() });
        assert!(next.energy_influence > p.energy_influence);
        assert!(next.energy_floor > p.energy_floor);
    }

    #[test]
    fn test_repeated_adjustment_stays_bounded() {
        let awful = ScoreBreakdown::default();
        let mut p = DifficultyParameters::hard();
        for _ in 0..200 {
            p = adjust_params(&p, &awful);
        }
        assert_eq!(p.wave_noise, 0.0);
        assert_eq!(p.wave_period, MAX_WAVE_PERIOD);
        assert_eq!(p.curve_start, MIN_CURVE_START);
        assert_eq!(p.energy_influence, MAX_ENERGY_INFLUENCE);
        assert_eq!(p.energy_floor, MAX_ENERGY_FLOOR);
        assert_eq!(p.density, MIN_DENSITY);
        assert_eq!(p.cluster2_prob, MIN_CLUSTER2_PROB);
        assert_eq!(p.cluster3_prob, MIN_CLUSTER3_PROB);
        assert_eq!(p.pickup_ratio, PICKUP_RATIO_RANGE.1);
        assert_eq!(p.wave_amplitude, LANE_COUNT - 1);
        p.validate().unwrap();
    }

    #[test]
    fn test_adjustment_is_monotone() {
        let weak = ScoreBreakdown::default();
        let mut p = DifficultyParameters::normal();
        for _ in 0..50 {
            let next = adjust_params(&p, &weak);
            assert!(next.density <= p.density);
            assert!(next.wave_noise <= p.wave_noise);
            assert!(next.energy_influence >= p.energy_influence);
            assert!(next.curve_start <= p.curve_start);
            p = next;
        }
    }
}
