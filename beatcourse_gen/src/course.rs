// The course document: the end product of one (track, difficulty) run.
//
// `generate_course` wires the whole pipeline together: search for a
// champion, post-process it, and package the result with its provenance
// (seed, attempt) and rounded scores. Serialization is plain serde_json
// pretty-printing; field order in the structs is the field order on disk.

use crate::beatmap::BeatMap;
use crate::error::{CourseError, Result};
use crate::event::{CourseEvent, round3};
use crate::params::{Difficulty, DifficultyParameters};
use crate::post::{PostProcessOdds, PostProcessSummary, apply_post_processing};
use crate::scoring::ScoreBreakdown;
use crate::search::{SearchConfig, search};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const COURSE_NAME: &str = "Default";
pub const COURSE_VERSION: u32 = 1;

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Scores as written to disk, total first, all at two decimals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total: f64,
    pub beat_sync: f64,
    pub flow: f64,
    pub difficulty_curve: f64,
    pub type_variety: f64,
    pub lane_coverage: f64,
    pub energy_match: f64,
    pub cull_rate: f64,
}

impl From<&ScoreBreakdown> for ScoreSummary {
    fn from(s: &ScoreBreakdown) -> Self {
        ScoreSummary {
            total: round2(s.total()),
            beat_sync: round2(s.beat_sync),
            flow: round2(s.flow),
            difficulty_curve: round2(s.difficulty_curve),
            type_variety: round2(s.type_variety),
            lane_coverage: round2(s.lane_coverage),
            energy_match: round2(s.energy_match),
            cull_rate: round2(s.cull_rate),
        }
    }
}

/// A generated course for one track at one difficulty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub spotify_track_id: String,
    pub difficulty: Difficulty,
    pub name: String,
    pub duration_s: f64,
    pub bpm: f64,
    pub version: u32,
    /// Seed of the champion attempt.
    pub seed: u64,
    /// 1-based attempt number that produced the champion, 0 if none did.
    pub attempts: usize,
    pub score: ScoreSummary,
    pub events: Vec<CourseEvent>,
}

/// A course plus the bookkeeping of how it was found. Not serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedCourse {
    pub course: Course,
    /// Attempts actually run by the search.
    pub attempts_run: usize,
    pub reached_target: bool,
    pub post: PostProcessSummary,
}

/// Run search and post-processing for one difficulty.
///
/// `track_id_fallback` names the track when the beat map carries no id.
pub fn generate_course(
    map: &BeatMap,
    difficulty: Difficulty,
    params: &DifficultyParameters,
    config: &SearchConfig,
    odds: &PostProcessOdds,
    track_id_fallback: &str,
) -> GeneratedCourse {
    let result = search(map, params, config);
    let champion = result.champion;

    let mut events = champion.events;
    let post = apply_post_processing(&mut events, map, champion.seed, odds);
    for e in &mut events {
        e.t = round3(e.t);
        e.lead = e.lead.map(round3);
    }

    let course = Course {
        spotify_track_id: map
            .track_id
            .clone()
            .unwrap_or_else(|| track_id_fallback.to_string()),
        difficulty,
        name: COURSE_NAME.to_string(),
        duration_s: round3(map.duration_s),
        bpm: map.bpm,
        version: COURSE_VERSION,
        seed: champion.seed,
        attempts: champion.attempt,
        score: ScoreSummary::from(&champion.scores),
        events,
    };

    GeneratedCourse {
        course,
        attempts_run: result.attempts,
        reached_target: result.reached_target,
        post,
    }
}

impl Course {
    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| CourseError::Json {
            origin: format!("course {}/{}", self.spotify_track_id, self.difficulty),
            source,
        })
    }

    /// Write the course to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| CourseError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| CourseError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a previously written course.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| CourseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| CourseError::Json {
            origin: path.display().to_string(),
            source,
        })
    }
}

/// Output location of a course: `<output_dir>/<track>/<difficulty>.json`.
pub fn course_path(output_dir: &Path, track: &str, difficulty: Difficulty) -> PathBuf {
    output_dir.join(track).join(format!("{difficulty}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::constant_beat_map;
    use crate::event::EventKind;

    fn beats(start: f64, end: f64) -> Vec<f64> {
        (0..)
            .map(|i| start + i as f64 * 0.5)
            .take_while(|&t| t <= end)
            .collect()
    }

    fn quick() -> SearchConfig {
        SearchConfig {
            max_attempts: 3,
            target_score: 9.6,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(9.6049), 9.6);
        assert_eq!(round2(7.125), 7.13);
    }

    #[test]
    fn test_course_fields() {
        let map = constant_beat_map(40.0, beats(0.5, 39.5), 0.6);
        let generated = generate_course(
            &map,
            Difficulty::Normal,
            &Difficulty::Normal.preset(),
            &quick(),
            &PostProcessOdds::default(),
            "fallback",
        );
        let course = &generated.course;
        assert_eq!(course.spotify_track_id, "test-track");
        assert_eq!(course.name, "Default");
        assert_eq!(course.version, 1);
        assert_eq!(course.seed, course.attempts as u64);
        assert!(course.attempts >= 1 && course.attempts <= generated.attempts_run);
        assert!(!course.events.is_empty());
        assert!(course.events.windows(2).all(|w| w[0].t <= w[1].t));
    }

    #[test]
    fn test_track_id_fallback() {
        let mut map = constant_beat_map(20.0, beats(0.5, 19.5), 0.6);
        map.track_id = None;
        let generated = generate_course(
            &map,
            Difficulty::Easy,
            &Difficulty::Easy.preset(),
            &quick(),
            &PostProcessOdds::never(),
            "abc123",
        );
        assert_eq!(generated.course.spotify_track_id, "abc123");
    }

    #[test]
    fn test_json_layout() {
        let course = Course {
            spotify_track_id: "t".into(),
            difficulty: Difficulty::Hard,
            name: COURSE_NAME.into(),
            duration_s: 30.0,
            bpm: 120.0,
            version: COURSE_VERSION,
            seed: 3,
            attempts: 3,
            score: ScoreSummary::from(&ScoreBreakdown::default()),
            events: vec![CourseEvent::new(5.0, 1, EventKind::Slow)],
        };
        let json = course.to_json_pretty().unwrap();
        assert!(json.contains("\n  \"difficulty\": \"hard\""), "got {json}");
        assert!(json.contains("\"type\": \"slow\""));
        assert!(!json.contains("lead"));
        let score_at = json.find("\"score\"").unwrap();
        assert!(json[score_at..].find("\"total\"") < json[score_at..].find("\"beat_sync\""));
    }

    #[test]
    fn test_write_and_load() {
        let dir = std::env::temp_dir().join(format!("beatcourse-course-{}", std::process::id()));
        let path = course_path(&dir, "trk", Difficulty::Normal);
        assert!(path.ends_with("trk/normal.json"));

        let map = constant_beat_map(20.0, beats(0.5, 19.5), 0.6);
        let generated = generate_course(
            &map,
            Difficulty::Normal,
            &Difficulty::Normal.preset(),
            &quick(),
            &PostProcessOdds::default(),
            "trk",
        );
        generated.course.write(&path).unwrap();
        let loaded = Course::load(&path).unwrap();
        assert_eq!(loaded, generated.course);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = Course::load(Path::new("/nonexistent/beatcourse/course.json")).unwrap_err();
        assert!(matches!(err, CourseError::Io { .. }));
    }
}
