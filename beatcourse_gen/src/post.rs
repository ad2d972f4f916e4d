// Rhythm-zone post-processing of a champion course.
//
// Three passes enrich the validated event list with event types the game
// times against on-screen positions rather than the kill zone:
//
// - car_crash_beat: a crash projectile sent to intercept a car mid-screen on
//   a beat. Its `lead` is the projectile's spawn-to-impact travel time.
// - guardian: a crash placed just ahead of an ammo pickup in the same lane.
// - enemy_car: a car re-timed so it reaches the sweet spot on a beat. The
//   event is converted in place; only its kind and time change.
//
// The passes run in that order from one RNG seeded `champion_seed + 1000`,
// and the list is re-sorted (stably) after each pass. A candidate whose
// geometry does not work out is skipped, never an error.
//
// The geometry constants mirror the game's screen tuning and must stay in
// sync with it.

use crate::beatmap::BeatMap;
use crate::event::{CourseEvent, EventKind, round3, sort_by_time};
use crate::generator::INTRO_SKIP_S;
use crate::sampler::nearest_beat;
use beatcourse_prng::CourseRng;
use tracing::debug;

pub const GAME_WIDTH: f64 = 1920.0;
pub const OBSTACLE_SPAWN_MARGIN: f64 = 120.0;
/// X position at which obstacles spawn, just off the right edge.
pub const SPAWN_X: f64 = GAME_WIDTH + OBSTACLE_SPAWN_MARGIN;
/// X position of the kill zone; an event's `t` is its arrival here.
pub const KILL_ZONE_X: f64 = 200.0;
/// Road (and crash projectile) speed in px/s.
pub const ROAD_BASE_SPEED: f64 = 1000.0;
/// Cars are slowed by this fraction of the road speed.
pub const CAR_SPEED_FACTOR: f64 = 0.65;
/// Car speed in px/s.
pub const CAR_SPEED: f64 = ROAD_BASE_SPEED * (1.0 - CAR_SPEED_FACTOR);
/// Enemy cars are timed to this x position.
pub const SWEET_SPOT_X: f64 = 960.0;

/// Offset added to the champion's seed for the post-processing RNG.
pub const POST_SEED_OFFSET: u64 = 1000;

/// Window before a car's arrival in which an intercept beat is sought.
const INTERCEPT_WINDOW_S: (f64, f64) = (1.0, 3.0);
const IDEAL_INTERCEPT_S: f64 = 2.0;
const GUARDIAN_MIN_OFFSET_S: f64 = 0.3;
const GUARDIAN_OFFSET_SPREAD_S: f64 = 0.5;
/// Cars with a car_crash_beat in their lane this close are left alone.
const CRASH_BEAT_EXCLUSION_S: f64 = 4.0;
const MAX_SNAP_ERROR_S: f64 = 0.5;

/// Per-candidate probability of each pass firing.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessOdds {
    pub car_crash_beat: f64,
    pub guardian: f64,
    pub enemy_car: f64,
}

impl Default for PostProcessOdds {
    fn default() -> Self {
        PostProcessOdds {
            car_crash_beat: 0.35,
            guardian: 0.5,
            enemy_car: 0.25,
        }
    }
}

impl PostProcessOdds {
    /// Every pass fires for every candidate.
    pub fn always() -> Self {
        PostProcessOdds {
            car_crash_beat: 1.0,
            guardian: 1.0,
            enemy_car: 1.0,
        }
    }

    /// No pass ever fires.
    pub fn never() -> Self {
        PostProcessOdds {
            car_crash_beat: 0.0,
            guardian: 0.0,
            enemy_car: 0.0,
        }
    }
}

/// Counts of what post-processing changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessSummary {
    pub car_crash_beats: usize,
    pub guardians: usize,
    pub enemy_cars: usize,
}

/// Spawn lead a crash projectile needs to meet a car `before_arrival_s`
/// seconds before the car reaches the kill zone, or `None` if the car is
/// still off-screen at that moment.
pub fn intercept_lead(before_arrival_s: f64) -> Option<f64> {
    let car_x = KILL_ZONE_X + CAR_SPEED * before_arrival_s;
    let travel = SPAWN_X - car_x;
    (travel > 0.0).then(|| round3(travel / ROAD_BASE_SPEED))
}

/// Beat in `[t - 3, t - 1]` closest to `t - 2`. Ties go to the earlier beat.
fn intercept_beat(beats: &[f64], car_t: f64) -> Option<f64> {
    let (lo, hi) = INTERCEPT_WINDOW_S;
    let mut best: Option<f64> = None;
    for &b in beats {
        let before = car_t - b;
        if !(lo..=hi).contains(&before) {
            continue;
        }
        let err = (before - IDEAL_INTERCEPT_S).abs();
        if best.is_none_or(|cur| err < (car_t - cur - IDEAL_INTERCEPT_S).abs()) {
            best = Some(b);
        }
    }
    best
}

/// Add a `car_crash_beat` companion for a random subset of `car` events.
/// Returns the number added.
pub fn add_car_crash_beats(
    events: &mut Vec<CourseEvent>,
    beats: &[f64],
    rng: &mut CourseRng,
    probability: f64,
) -> usize {
    let cars: Vec<(f64, usize)> = events
        .iter()
        .filter(|e| e.kind == EventKind::Car)
        .map(|e| (e.t, e.lane))
        .collect();

    let mut added = Vec::new();
    for (car_t, lane) in cars {
        if !rng.random_bool(probability) {
            continue;
        }
        let Some(beat) = intercept_beat(beats, car_t) else {
            continue;
        };
        let Some(lead) = intercept_lead(car_t - beat) else {
            continue;
        };
        added.push(CourseEvent {
            lead: Some(lead),
            ..CourseEvent::new(beat, lane, EventKind::CarCrashBeat)
        });
    }

    let count = added.len();
    events.extend(added);
    sort_by_time(events);
    count
}

/// Add a `guardian` crash shortly before a random subset of `pickup_ammo`
/// events, in the same lane. Returns the number added.
pub fn add_guardians(events: &mut Vec<CourseEvent>, rng: &mut CourseRng, probability: f64) -> usize {
    let pickups: Vec<(f64, usize)> = events
        .iter()
        .filter(|e| e.kind == EventKind::PickupAmmo)
        .map(|e| (e.t, e.lane))
        .collect();

    let mut added = Vec::new();
    for (pickup_t, lane) in pickups {
        if !rng.random_bool(probability) {
            continue;
        }
        let offset = GUARDIAN_MIN_OFFSET_S + rng.next_f64() * GUARDIAN_OFFSET_SPREAD_S;
        let t = round3(pickup_t - offset);
        if t < INTRO_SKIP_S {
            continue;
        }
        added.push(CourseEvent::new(t, lane, EventKind::Guardian));
    }

    let count = added.len();
    events.extend(added);
    sort_by_time(events);
    count
}

/// Convert a random subset of `car` events into `enemy_car` events timed to
/// reach the sweet spot on a beat. Returns the number converted.
pub fn add_enemy_cars(
    events: &mut [CourseEvent],
    beats: &[f64],
    rng: &mut CourseRng,
    probability: f64,
) -> usize {
    let sweet_spot_travel_s = (SWEET_SPOT_X - KILL_ZONE_X) / CAR_SPEED;
    let cars: Vec<usize> = (0..events.len())
        .filter(|&i| events[i].kind == EventKind::Car)
        .collect();

    let mut converted = 0;
    for i in cars {
        if !rng.random_bool(probability) {
            continue;
        }
        let (car_t, lane) = (events[i].t, events[i].lane);
        let paired = events.iter().any(|e| {
            e.kind == EventKind::CarCrashBeat
                && e.lane == lane
                && (e.t - car_t).abs() < CRASH_BEAT_EXCLUSION_S
        });
        if paired {
            continue;
        }

        let arrival = car_t - sweet_spot_travel_s;
        let Some(snap) = nearest_beat(beats, arrival) else {
            continue;
        };
        if (snap - arrival).abs() > MAX_SNAP_ERROR_S {
            continue;
        }
        let car = &mut events[i];
        car.kind = EventKind::EnemyCar;
        car.t = round3(snap);
        converted += 1;
    }

    sort_by_time(events);
    converted
}

/// Run all three passes over the champion's events.
///
/// An empty course is left untouched.
pub fn apply_post_processing(
    events: &mut Vec<CourseEvent>,
    map: &BeatMap,
    champion_seed: u64,
    odds: &PostProcessOdds,
) -> PostProcessSummary {
    if events.is_empty() {
        return PostProcessSummary::default();
    }
    let mut rng = CourseRng::new(champion_seed.wrapping_add(POST_SEED_OFFSET));

    let car_crash_beats = add_car_crash_beats(events, &map.beats, &mut rng, odds.car_crash_beat);
    debug!(added = car_crash_beats, "car_crash_beat pass");
    let guardians = add_guardians(events, &mut rng, odds.guardian);
    debug!(added = guardians, "guardian pass");
    let enemy_cars = add_enemy_cars(events, &map.beats, &mut rng, odds.enemy_car);
    debug!(converted = enemy_cars, "enemy_car pass");

    PostProcessSummary {
        car_crash_beats,
        guardians,
        enemy_cars,
    }
}
