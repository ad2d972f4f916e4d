// End-to-end tests: beat map in, course out.
//
// These run the real search on synthetic tracks and check the properties
// every generated course must have, independent of the exact events chosen:
// determinism, the safety and reachability invariants, score bounds, and
// the fixed scenarios (bounce lanes, empty track, intercept geometry).

use beatcourse_gen::beatmap::{BandsDocument, BeatMap, BeatMapDocument};
use beatcourse_gen::course::generate_course;
use beatcourse_gen::error::CourseError;
use beatcourse_gen::event::{CourseEvent, EventKind, LANE_COUNT, time_groups};
use beatcourse_gen::generator::{BOUNCE, generate_events};
use beatcourse_gen::params::{Difficulty, ParameterOverrides};
use beatcourse_gen::post::{PostProcessOdds, apply_post_processing};
use beatcourse_gen::scoring::compute_scores;
use beatcourse_gen::search::{SearchConfig, search};
use beatcourse_gen::validate::{blocked_lanes, is_reachable, max_lane_shift, safe_lane_count, validate_paths};
use beatcourse_prng::CourseRng;

const RESOLUTION_MS: u32 = 50;

fn quantize(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A beat map sampled every 50ms with `level(t)` as its energy curve and
/// beats every `beat_step` seconds starting at `first_beat`.
fn synthetic_map(
    duration_s: f64,
    first_beat: f64,
    last_beat: f64,
    beat_step: f64,
    level: impl Fn(f64) -> f64,
) -> BeatMap {
    let n = (duration_s * 1000.0 / f64::from(RESOLUTION_MS)).ceil() as usize + 1;
    let times: Vec<f64> = (0..n).map(|i| i as f64 * f64::from(RESOLUTION_MS) / 1000.0).collect();
    let signal = |f: &dyn Fn(f64) -> f64| times.iter().map(|&t| quantize(f(t))).collect::<Vec<u8>>();

    let beats: Vec<f64> = (0..)
        .map(|i| first_beat + i as f64 * beat_step)
        .take_while(|&t| t <= last_beat)
        .collect();

    let doc = BeatMapDocument {
        resolution_ms: RESOLUTION_MS,
        duration_s,
        bpm: 60.0 / beat_step,
        bands: BandsDocument {
            bass: signal(&|t| level(t) * (0.5 + 0.5 * (t * 0.9).sin().abs())),
            low_mid: signal(&|t| level(t) * 0.6),
            mid: signal(&|t| level(t) * 0.5),
            high_mid: signal(&|t| level(t) * 0.4),
            high: signal(&|t| level(t) * 0.3),
        },
        energy: signal(&level),
        percussive: signal(&|t| level(t) * (0.5 + 0.5 * (t * 1.7).cos().abs())),
        harmonic: signal(&|t| 0.4 + 0.2 * (t * 0.3).sin()),
        onset_env: signal(&|t| level(t) * 0.8),
        centroid: vec![1800.0; n],
        beats,
        onsets: Vec::new(),
        spotify_track_id: Some("synthetic".into()),
    };
    BeatMap::from_document(doc).unwrap()
}

/// A track that builds from quiet to loud with some swell on top.
fn building_track() -> BeatMap {
    let duration = 90.0;
    synthetic_map(duration, 0.5, 89.5, 0.5, move |t| {
        0.3 + 0.55 * (t / duration) + 0.12 * (t * 0.4).sin()
    })
}

fn quick_config() -> SearchConfig {
    SearchConfig {
        max_attempts: 6,
        target_score: 9.6,
    }
}

fn assert_playable(events: &[CourseEvent], min_safe_lanes: usize, label: &str) {
    let groups = time_groups(events);
    let mut prev: Option<(f64, [bool; LANE_COUNT])> = None;
    for group in &groups {
        let blocked = blocked_lanes(&events[group.range.clone()]);
        assert!(
            safe_lane_count(&blocked) >= min_safe_lanes,
            "{label}: group at {} leaves {} safe lanes, need {min_safe_lanes}",
            group.t,
            safe_lane_count(&blocked)
        );
        if let Some((prev_t, prev_blocked)) = prev {
            assert!(
                is_reachable(&prev_blocked, &blocked, max_lane_shift(group.t - prev_t)),
                "{label}: group at {} is unreachable from group at {prev_t}",
                group.t
            );
        }
        prev = Some((group.t, blocked));
    }
}

#[test]
fn test_course_json_is_deterministic() {
    let map = building_track();
    let run = || {
        generate_course(
            &map,
            Difficulty::Normal,
            &Difficulty::Normal.preset(),
            &quick_config(),
            &PostProcessOdds::default(),
            "synthetic",
        )
        .course
        .to_json_pretty()
        .unwrap()
    };
    let first = run();
    assert_eq!(first, run(), "same inputs must give byte-identical output");
    assert!(first.contains("\"spotify_track_id\": \"synthetic\""));
}

#[test]
fn test_champions_are_playable_for_every_preset() {
    let map = building_track();
    for difficulty in Difficulty::ALL {
        let preset = difficulty.preset();
        let result = search(&map, &preset, &quick_config());
        let events = &result.champion.events;
        assert!(!events.is_empty(), "{difficulty}: empty champion");
        assert!(events.windows(2).all(|w| w[0].t <= w[1].t));
        assert!(events.iter().all(|e| e.lane < LANE_COUNT));
        assert_playable(events, preset.min_safe_lanes, difficulty.as_str());
    }
}

#[test]
fn test_validated_attempts_are_playable_after_adjustment() {
    // Every attempt, not only the champion, must satisfy the invariants.
    let map = building_track();
    let mut params = Difficulty::Hard.preset();
    for attempt in 1..=4u64 {
        let mut rng = CourseRng::new(attempt);
        let generated = generate_events(&map, &params, &mut rng);
        let validation = validate_paths(&generated, &params);
        assert_playable(&validation.events, params.min_safe_lanes, "hard attempt");
        assert_eq!(validation.events.len() + validation.culled, generated.len());
        let scores = compute_scores(&validation.events, &map, validation.culled, generated.len());
        params = beatcourse_gen::adjust::adjust_params(&params, &scores);
    }
}

#[test]
fn test_scores_stay_in_bounds() {
    let map = building_track();
    for difficulty in Difficulty::ALL {
        let result = search(&map, &difficulty.preset(), &quick_config());
        for report in &result.history {
            for (name, value) in report.scores.named() {
                assert!(
                    (0.0..=10.0).contains(&value),
                    "{difficulty} attempt {}: {name} = {value}",
                    report.attempt
                );
            }
            assert!((0.0..=10.0).contains(&report.total));
        }
    }
}

#[test]
fn test_scenario_a_bounce_lanes_inside_window() {
    let map = synthetic_map(60.0, 4.0, 55.0, 0.5, |_| 0.5);
    let overrides = ParameterOverrides::from_json(r#"{"wave_noise": 0.0}"#, "inline").unwrap();
    let params = Difficulty::Normal.preset().with_overrides(&overrides).unwrap();

    let mut rng = CourseRng::new(1);
    let events = generate_events(&map, &params, &mut rng);
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| (4.0..=55.0).contains(&e.t)));
    assert!(events.iter().all(|e| map.beats.contains(&e.t)), "events land on beats");

    // Constant energy stays below the cluster thresholds: one obstacle per
    // beat, and its lane walks the bounce sequence from some offset.
    let lanes: Vec<usize> = events.iter().filter(|e| !e.is_pickup()).map(|e| e.lane).collect();
    assert!(lanes.len() > BOUNCE.len());
    let follows_bounce = (0..BOUNCE.len())
        .any(|offset| lanes.iter().enumerate().all(|(k, &l)| l == BOUNCE[(k + offset) % BOUNCE.len()]));
    assert!(follows_bounce, "lanes {lanes:?} do not follow the bounce sequence");
}

#[test]
fn test_scenario_b_empty_beats() {
    let map = synthetic_map(30.0, 1.0, 0.0, 0.5, |_| 0.5);
    assert!(map.beats.is_empty());

    let params = Difficulty::Normal.preset();
    let events = generate_events(&map, &params, &mut CourseRng::new(1));
    assert!(events.is_empty());
    let validation = validate_paths(&events, &params);
    assert!(validation.events.is_empty());
    assert_eq!(validation.culled, 0);
    let scores = compute_scores(&validation.events, &map, 0, 0);
    assert_eq!(scores.total(), 0.0);

    let generated = generate_course(
        &map,
        Difficulty::Normal,
        &params,
        &quick_config(),
        &PostProcessOdds::default(),
        "synthetic",
    );
    assert!(generated.course.events.is_empty());
    assert_eq!(generated.course.score.total, 0.0);
    assert_eq!(generated.course.seed, 0);
    assert_eq!(generated.course.attempts, 0);
    assert_eq!(generated.attempts_run, quick_config().max_attempts);
}

#[test]
fn test_scenario_c_car_crash_beat_geometry() {
    let map = synthetic_map(20.0, 8.0, 8.0, 0.5, |_| 0.5);
    let mut events = vec![CourseEvent::new(10.0, 2, EventKind::Car)];
    let summary = apply_post_processing(&mut events, &map, 1, &PostProcessOdds::always());

    assert_eq!(summary.car_crash_beats, 1);
    // The car now has a companion in its lane, so it is not re-timed.
    assert_eq!(summary.enemy_cars, 0);
    assert_eq!(events.len(), 2);
    let beat = &events[0];
    assert_eq!(beat.kind, EventKind::CarCrashBeat);
    assert_eq!((beat.t, beat.lane), (8.0, 2));
    // (2040 - (200 + 350 * 2)) / 1000
    assert_eq!(beat.lead, Some(1.14));
    assert_eq!(events[1].kind, EventKind::Car);
}

#[test]
fn test_beat_map_loads_from_disk() {
    let dir = std::env::temp_dir().join(format!("beatcourse-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("track.json");
    std::fs::write(
        &path,
        r#"{
            "resolution_ms": 100, "duration_s": 0.3, "bpm": 100.0,
            "bands": { "bass": [0, 0, 0, 255], "low_mid": [0, 0, 0, 0],
                       "mid": [0, 0, 0, 0], "high_mid": [0, 0, 0, 0],
                       "high": [0, 0, 0, 0] },
            "energy": [0, 51, 102, 255], "percussive": [0, 0, 0, 0],
            "harmonic": [0, 0, 0, 0], "onset_env": [0, 0, 0, 0],
            "centroid": [0.0, 0.0, 0.0, 0.0], "beats": [0.1, 0.2], "onsets": []
        }"#,
    )
    .unwrap();

    let map = BeatMap::load(&path).unwrap();
    assert_eq!(map.track_id, None);
    assert_eq!(map.energy[3], 1.0);
    assert!((map.energy[1] - 0.2).abs() < 1e-12);
    std::fs::remove_dir_all(&dir).unwrap();

    let err = BeatMap::load(&dir.join("missing.json")).unwrap_err();
    assert!(matches!(err, CourseError::Io { .. }), "got {err}");
}
