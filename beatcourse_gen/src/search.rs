// Adaptive search over generation attempts.
//
// Each attempt seeds a fresh RNG with its 1-based attempt number, then runs
// generate -> validate -> score with the current parameter bundle. The best
// attempt so far (by total score, strictly greater wins, so ties keep the
// earlier attempt) is the champion. The search starts from an empty,
// zero-scored champion with seed 0 and attempt 0, which survives only when
// no attempt scores above zero. The loop ends as soon as a total reaches
// the target, or after `max_attempts`. Between attempts the bundle is
// adjusted from the scores of the attempt just run, not the champion's.
//
// Because every seed is derived from the attempt number and the adjustment
// is pure, a search is fully reproducible from the beat map and preset.

use crate::adjust::adjust_params;
use crate::beatmap::BeatMap;
use crate::event::CourseEvent;
use crate::generator::generate_events;
use crate::params::DifficultyParameters;
use crate::scoring::{ScoreBreakdown, compute_scores};
use crate::validate::validate_paths;
use beatcourse_prng::CourseRng;
use tracing::{debug, info, warn};

/// Search configuration parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Upper bound on attempts; at least one is always run.
    pub max_attempts: usize,
    /// A total at or above this ends the search early.
    pub target_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_attempts: 50,
            target_score: 9.60,
        }
    }
}

/// One attempt's outcome, kept for logging and inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub attempt: usize,
    pub seed: u64,
    pub generated: usize,
    pub culled: usize,
    pub kept: usize,
    pub scores: ScoreBreakdown,
    pub total: f64,
}

/// The best attempt of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Champion {
    /// Validated, time-sorted events.
    pub events: Vec<CourseEvent>,
    pub scores: ScoreBreakdown,
    pub total: f64,
    pub seed: u64,
    /// 1-based attempt number that produced this champion, or 0 when no
    /// attempt improved on the empty default.
    pub attempt: usize,
}

impl Champion {
    /// The starting point of every search: no events, all scores zero.
    pub fn empty() -> Self {
        Champion {
            events: Vec::new(),
            scores: ScoreBreakdown::default(),
            total: 0.0,
            seed: 0,
            attempt: 0,
        }
    }
}

/// Result of a full search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub champion: Champion,
    /// Number of attempts actually run.
    pub attempts: usize,
    pub reached_target: bool,
    pub history: Vec<AttemptReport>,
}

/// Run a single attempt with the given bundle and seed.
pub fn run_attempt(
    map: &BeatMap,
    params: &DifficultyParameters,
    attempt: usize,
    seed: u64,
) -> (Vec<CourseEvent>, AttemptReport) {
    let mut rng = CourseRng::new(seed);
    let generated = generate_events(map, params, &mut rng);
    let validation = validate_paths(&generated, params);
    let scores = compute_scores(&validation.events, map, validation.culled, generated.len());
    let report = AttemptReport {
        attempt,
        seed,
        generated: generated.len(),
        culled: validation.culled,
        kept: validation.events.len(),
        scores,
        total: scores.total(),
    };
    (validation.events, report)
}

/// Search for the best course for `map`, starting from `preset`.
pub fn search(map: &BeatMap, preset: &DifficultyParameters, config: &SearchConfig) -> SearchResult {
    let max_attempts = config.max_attempts.max(1);
    let mut params = preset.clone();
    let mut champion = Champion::empty();
    let mut history = Vec::with_capacity(max_attempts);
    let mut reached_target = false;

    for attempt in 1..=max_attempts {
        let seed = attempt as u64;
        let (events, report) = run_attempt(map, &params, attempt, seed);
        debug!(
            attempt,
            seed,
            total = report.total,
            beat_sync = report.scores.beat_sync,
            flow = report.scores.flow,
            curve = report.scores.difficulty_curve,
            variety = report.scores.type_variety,
            coverage = report.scores.lane_coverage,
            energy = report.scores.energy_match,
            cull_rate = report.scores.cull_rate,
            generated = report.generated,
            culled = report.culled,
            kept = report.kept,
            "attempt scored"
        );

        if report.total > champion.total {
            info!(attempt, total = report.total, "new champion");
            champion = Champion {
                events,
                scores: report.scores,
                total: report.total,
                seed,
                attempt,
            };
        }

        let total = report.total;
        let scores = report.scores;
        history.push(report);

        if total >= config.target_score {
            info!(attempt, total, target = config.target_score, "target score reached");
            reached_target = true;
            break;
        }
        params = adjust_params(&params, &scores);
    }

    let attempts = history.len();
    if champion.events.is_empty() {
        warn!(attempts, "search produced an empty course");
    }

    SearchResult {
        champion,
        attempts,
        reached_target,
        history,
    }
}
