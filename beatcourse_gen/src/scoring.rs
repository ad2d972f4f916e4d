// Course quality scoring: seven sub-scores on a 0-10 scale.
//
// - beat_sync: share of events within 100ms of a beat.
// - flow: smoothness of the obstacle lane sequence (small steps, few
//   direction reversals), one lane per time group.
// - difficulty_curve: correlation between time and obstacle density.
// - type_variety: normalized Shannon entropy of event categories.
// - lane_coverage: evenness of lane usage (chi-square style deviation).
// - energy_match: correlation between spawn density and audio energy.
// - cull_rate: penalty for events removed by path validation.
//
// The total is a fixed-weight sum; the weights add up to 1.0 so the total
// stays on the same 0-10 scale. Every ratio and correlation has a defined
// neutral value for empty or zero-variance inputs, so scoring never fails.
//
// Consumed by search.rs, which uses the total to pick a champion and the
// sub-scores to steer adjust.rs.

use crate::beatmap::BeatMap;
use crate::event::{CourseEvent, EventKind, LANE_COUNT, time_groups};
use crate::sampler::find_nearest_beat;
use serde::Serialize;
use std::collections::BTreeMap;

/// Events this close to a beat count as on-beat.
pub const BEAT_SNAP_WINDOW_S: f64 = 0.100;
/// Target window length for energy matching.
pub const ENERGY_WINDOW_S: f64 = 10.0;
/// Number of time slices for difficulty-curve scoring.
pub const DIFFICULTY_CURVE_WINDOWS: usize = 8;

/// Fixed weights of each sub-score in the total.
pub mod weights {
    pub const BEAT_SYNC: f64 = 0.25;
    pub const FLOW: f64 = 0.20;
    pub const DIFFICULTY_CURVE: f64 = 0.15;
    pub const TYPE_VARIETY: f64 = 0.10;
    pub const LANE_COVERAGE: f64 = 0.10;
    pub const ENERGY_MATCH: f64 = 0.10;
    pub const CULL_RATE: f64 = 0.10;
}

/// Penalty per unit of reversal rate in the flow score.
const REVERSAL_PENALTY: f64 = 0.4;
/// Lets a gently bouncing wave still reach a perfect flow score.
const FLOW_SCALE: f64 = 10.5;
const FLOW_FEW_OBSTACLES: f64 = 10.0;
const FLOW_COLLAPSED_GROUPS: f64 = 8.0;
const SINGLE_TYPE_VARIETY: f64 = 2.0;
const LANE_DEVIATION_PENALTY: f64 = 2.0;
const CULL_PENALTY: f64 = 33.3;
const NEUTRAL_CORRELATION_SCORE: f64 = 5.0;

/// The seven sub-scores of one course.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub beat_sync: f64,
    pub flow: f64,
    pub difficulty_curve: f64,
    pub type_variety: f64,
    pub lane_coverage: f64,
    pub energy_match: f64,
    pub cull_rate: f64,
}

impl ScoreBreakdown {
    /// Weighted sum of the sub-scores, in [0, 10].
    pub fn total(&self) -> f64 {
        self.beat_sync * weights::BEAT_SYNC
            + self.flow * weights::FLOW
            + self.difficulty_curve * weights::DIFFICULTY_CURVE
            + self.type_variety * weights::TYPE_VARIETY
            + self.lane_coverage * weights::LANE_COVERAGE
            + self.energy_match * weights::ENERGY_MATCH
            + self.cull_rate * weights::CULL_RATE
    }

    /// All seven sub-scores paired with their names.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("beat_sync", self.beat_sync),
            ("flow", self.flow),
            ("difficulty_curve", self.difficulty_curve),
            ("type_variety", self.type_variety),
            ("lane_coverage", self.lane_coverage),
            ("energy_match", self.energy_match),
            ("cull_rate", self.cull_rate),
        ]
    }
}

/// Map a correlation in [-1, 1] to [0, 10].
fn correlation_score(corr: f64) -> f64 {
    ((corr + 1.0) * 5.0).clamp(0.0, 10.0)
}

/// Score a validated event list.
///
/// `culled` and `generated` come from path validation and event generation
/// respectively. An empty list scores zero across the board.
pub fn compute_scores(
    events: &[CourseEvent],
    map: &BeatMap,
    culled: usize,
    generated: usize,
) -> ScoreBreakdown {
    if events.is_empty() {
        return ScoreBreakdown::default();
    }

    let mut obstacles: Vec<&CourseEvent> = events.iter().filter(|e| !e.is_pickup()).collect();
    obstacles.sort_by(|a, b| a.t.total_cmp(&b.t));

    ScoreBreakdown {
        beat_sync: score_beat_sync(events, &map.beats),
        flow: score_flow(&obstacles),
        difficulty_curve: score_difficulty_curve(&obstacles, map.duration_s),
        type_variety: score_type_variety(events),
        lane_coverage: score_lane_coverage(events),
        energy_match: score_energy_match(events, map),
        cull_rate: score_cull_rate(culled, generated),
    }
}

pub fn score_beat_sync(events: &[CourseEvent], beats: &[f64]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let synced = events
        .iter()
        .filter(|e| find_nearest_beat(beats, e.t) <= BEAT_SNAP_WINDOW_S)
        .count();
    (synced as f64 / events.len() as f64 * 10.0).min(10.0)
}

/// Flow over time-sorted obstacles: one lane per time group (the group's
/// first, which is the wave lane), scored on step size and reversals.
pub fn score_flow(obstacles: &[&CourseEvent]) -> f64 {
    if obstacles.len() <= 2 {
        return FLOW_FEW_OBSTACLES;
    }
    let lanes: Vec<i64> = time_groups(obstacles)
        .into_iter()
        .map(|g| obstacles[g.range.start].lane as i64)
        .collect();
    if lanes.len() < 3 {
        return FLOW_COLLAPSED_GROUPS;
    }

    let mut small_steps: u32 = 0;
    let mut reversals: u32 = 0;
    let mut directional_moves: u32 = 0;
    let mut prev_dir = 0;
    for pair in lanes.windows(2) {
        let diff = pair[1] - pair[0];
        if diff.abs() <= 1 {
            small_steps += 1;
        }
        if diff != 0 {
            let dir = diff.signum();
            directional_moves += 1;
            if prev_dir != 0 && dir != prev_dir {
                reversals += 1;
            }
            prev_dir = dir;
        }
    }

    let transitions = lanes.len() - 1;
    let step_score = f64::from(small_steps) / transitions as f64;
    let reversal_rate = f64::from(reversals) / f64::from(directional_moves.max(1));
    let raw = step_score - reversal_rate * REVERSAL_PENALTY;
    (raw * FLOW_SCALE).clamp(0.0, 10.0)
}

/// Correlation between window index and obstacle count per window.
pub fn score_difficulty_curve(obstacles: &[&CourseEvent], duration_s: f64) -> f64 {
    if obstacles.is_empty() || duration_s <= 0.0 {
        return 0.0;
    }
    let window = duration_s / DIFFICULTY_CURVE_WINDOWS as f64;
    let counts: Vec<f64> = (0..DIFFICULTY_CURVE_WINDOWS)
        .map(|w| {
            let (start, end) = (w as f64 * window, (w + 1) as f64 * window);
            obstacles.iter().filter(|e| e.t >= start && e.t < end).count() as f64
        })
        .collect();
    if counts.iter().sum::<f64>() == 0.0 {
        return 0.0;
    }
    let indices: Vec<f64> = (0..DIFFICULTY_CURVE_WINDOWS).map(|i| i as f64).collect();
    correlation_score(pearson_correlation(&indices, &counts))
}

/// Category used for variety: both pickup kinds count as one.
fn variety_category(kind: EventKind) -> &'static str {
    if kind.is_pickup() {
        "pickup"
    } else {
        kind.as_str()
    }
}

/// Shannon entropy of event categories, normalized by the entropy of an
/// even split over (at most) the four base categories.
pub fn score_type_variety(events: &[CourseEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for e in events {
        *counts.entry(variety_category(e.kind)).or_default() += 1;
    }
    if counts.len() <= 1 {
        return SINGLE_TYPE_VARIETY;
    }

    let total = events.len() as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (counts.len().min(4) as f64).log2();
    (entropy / max_entropy * 10.0).min(10.0)
}

pub fn score_lane_coverage(events: &[CourseEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let mut lane_counts = [0usize; LANE_COUNT];
    for e in events {
        lane_counts[e.lane] += 1;
    }
    let expected = events.len() as f64 / LANE_COUNT as f64;
    let deviation: f64 = lane_counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2))
        .sum::<f64>()
        / expected;
    (10.0 - deviation * LANE_DEVIATION_PENALTY).clamp(0.0, 10.0)
}

/// Correlation between spawn count and mean energy over ~10s windows.
pub fn score_energy_match(events: &[CourseEvent], map: &BeatMap) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    if map.duration_s <= 0.0 {
        return NEUTRAL_CORRELATION_SCORE;
    }

    let num_windows = ((map.duration_s / ENERGY_WINDOW_S).floor() as usize).max(2);
    let window = map.duration_s / num_windows as f64;
    let samples_per_s = 1000.0 / f64::from(map.resolution_ms);

    let mut spawns = Vec::with_capacity(num_windows);
    let mut energies = Vec::with_capacity(num_windows);
    for w in 0..num_windows {
        let (start, end) = (w as f64 * window, (w + 1) as f64 * window);
        spawns.push(events.iter().filter(|e| e.t >= start && e.t < end).count() as f64);
        energies.push(mean_energy(&map.energy, start * samples_per_s, end * samples_per_s));
    }
    correlation_score(pearson_correlation(&spawns, &energies))
}

/// Mean of `signal` over the sample index range `[start, end)`, always
/// covering at least one sample.
fn mean_energy(signal: &[f64], start: f64, end: f64) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let i_start = (start.max(0.0) as usize).min(signal.len() - 1);
    let i_end = (end.max(0.0) as usize).min(signal.len()).max(i_start + 1);
    let slice = &signal[i_start..i_end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

pub fn score_cull_rate(culled: usize, generated: usize) -> f64 {
    if generated == 0 {
        return 10.0;
    }
    let ratio = culled as f64 / generated as f64;
    (10.0 - ratio * CULL_PENALTY).clamp(0.0, 10.0)
}

/// Pearson correlation coefficient. Returns 0.0 for fewer than two points
/// or zero variance in either series.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }
    if den_x == 0.0 || den_y == 0.0 {
        return 0.0;
    }
    num / (den_x.sqrt() * den_y.sqrt())
}
