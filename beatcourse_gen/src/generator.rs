// Event generation: turning a beat map into a candidate course.
//
// Beats are the spawn grid, so every generated event lands exactly on a beat
// timestamp. The pipeline:
//
// 1. Candidate beats: every `beat_skip`-th beat inside the playable window
//    (after the intro skip, before the outro skip).
// 2. Sectioning: the window is cut into `NUM_SECTIONS` equal sections whose
//    quotas rise linearly from `curve_start` to 1.0 and are scaled by up to
//    ±30% by the section's energy relative to the track mean.
// 3. Selection: within a section, beats below the energy floor are dropped,
//    the rest are ranked by energy (plus a little jitter) and the top
//    `quota` are kept in time order.
// 4. Pickup split: a `pickup_ratio` share of the selected beats, evenly
//    spaced, become pickups.
// 5. Lanes: obstacles follow the bounce sequence on their own counter
//    (pickups never advance it) with occasional ±1 noise; pickups go to the
//    least-used lane.
// 6. Clusters: loud obstacle beats may widen to 2 or 3 lanes, never leaving
//    fewer than `min_safe_lanes` open.
// 7. Types: pickups alternate ammo/shield; obstacles lean towards the
//    dominant audio band, otherwise follow the configured weights.
//
// The output is unvalidated; validate.rs culls anything unplayable.

use crate::beatmap::BeatMap;
use crate::event::{CourseEvent, EventKind, LANE_COUNT};
use crate::params::DifficultyParameters;
use crate::sampler::sample_at;
use beatcourse_prng::CourseRng;

/// No spawns during the first seconds, so the player can settle in.
pub const INTRO_SKIP_S: f64 = 4.0;
/// No spawns during the last seconds of the track.
pub const OUTRO_SKIP_S: f64 = 2.0;
/// The playable window is divided into this many progressive sections.
pub const NUM_SECTIONS: usize = 8;
/// Lane cursor for obstacles: a full sweep up and back, each end held once.
pub const BOUNCE: [usize; 8] = [0, 1, 2, 3, 3, 2, 1, 0];

/// Energy can move a section's quota at most this far from 1.0.
const ENERGY_QUOTA_SWING: f64 = 0.3;
const BEAT_JITTER: f64 = 0.1;
/// Pickup positions wander by up to this fraction of the pickup spacing.
const PICKUP_SPACING_JITTER: f64 = 0.4;
const SHIELD_CHANCE: f64 = 0.3;
/// A band counts as dominant only above this level.
const DOMINANT_BAND_FLOOR: f64 = 0.3;
const BASS_CRASH_CHANCE: f64 = 0.55;
const PERCUSSIVE_CAR_CHANCE: f64 = 0.45;

/// Inclusive bounds of the window in which events may spawn.
pub fn playable_window(map: &BeatMap) -> (f64, f64) {
    (INTRO_SKIP_S, map.duration_s - OUTRO_SKIP_S)
}

/// A beat chosen to carry an event.
#[derive(Clone, Copy, Debug)]
struct SelectedBeat {
    t: f64,
    energy: f64,
}

/// Generate an unvalidated, time-ordered event list.
///
/// Returns an empty list when the track has no beats in the playable window.
pub fn generate_events(
    map: &BeatMap,
    params: &DifficultyParameters,
    rng: &mut CourseRng,
) -> Vec<CourseEvent> {
    let candidates = candidate_beats(map, params);
    if candidates.is_empty() {
        return Vec::new();
    }

    let selected = select_beats(map, params, &candidates, rng);
    if selected.is_empty() {
        return Vec::new();
    }

    let pickups = pickup_slots(selected.len(), params.pickup_ratio, rng);
    assign_lanes_and_types(map, params, &selected, &pickups, rng)
}

/// Step 1: beats inside the playable window whose index is a multiple of
/// `beat_skip`.
fn candidate_beats(map: &BeatMap, params: &DifficultyParameters) -> Vec<f64> {
    let (start, end) = playable_window(map);
    map.beats
        .iter()
        .enumerate()
        .filter(|&(i, &t)| t >= start && t <= end && i % params.beat_skip == 0)
        .map(|(_, &t)| t)
        .collect()
}

/// Steps 2 and 3: per-section quotas, then energy-ranked selection.
fn select_beats(
    map: &BeatMap,
    params: &DifficultyParameters,
    candidates: &[f64],
    rng: &mut CourseRng,
) -> Vec<SelectedBeat> {
    let (start, end) = playable_window(map);
    let section_dur = (end - start) / NUM_SECTIONS as f64;

    let section_energies: Vec<f64> = (0..NUM_SECTIONS)
        .map(|s| {
            let mid = start + (s as f64 + 0.5) * section_dur;
            sample_at(&map.energy, mid, map.resolution_ms)
        })
        .collect();
    let mean_energy = section_energies.iter().sum::<f64>() / NUM_SECTIONS as f64;

    let mut selected = Vec::new();
    for (s, &section_energy) in section_energies.iter().enumerate() {
        let s_start = start + s as f64 * section_dur;
        let s_end = s_start + section_dur;
        let section_beats: Vec<f64> = candidates
            .iter()
            .copied()
            .filter(|&t| t >= s_start && t < s_end)
            .collect();

        let quota = section_quota(params, s, section_beats.len(), section_energy, mean_energy);
        if quota == 0 || section_beats.is_empty() {
            continue;
        }

        let mut ranked: Vec<(SelectedBeat, f64)> = Vec::new();
        for t in section_beats {
            let energy = sample_at(&map.energy, t, map.resolution_ms);
            if energy < params.energy_floor {
                continue;
            }
            let score = (1.0 - params.energy_influence)
                + params.energy_influence * energy
                + rng.next_f64() * BEAT_JITTER;
            ranked.push((SelectedBeat { t, energy }, score));
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(quota);
        ranked.sort_by(|a, b| a.0.t.total_cmp(&b.0.t));
        selected.extend(ranked.into_iter().map(|(beat, _)| beat));
    }
    selected
}

/// Number of events section `s` should receive.
///
/// The quota fraction climbs linearly from `curve_start` (first section) to
/// 1.0 (last section); energy scales it by at most ±30% around the mean.
fn section_quota(
    params: &DifficultyParameters,
    s: usize,
    beat_count: usize,
    section_energy: f64,
    mean_energy: f64,
) -> usize {
    let progress = s as f64 / (NUM_SECTIONS - 1) as f64;
    let quota_frac = params.curve_start + (1.0 - params.curve_start) * progress;

    let energy_scale = if mean_energy > 0.0 {
        let relative = section_energy / (mean_energy * 2.0).max(0.01);
        (1.0 - ENERGY_QUOTA_SWING + 2.0 * ENERGY_QUOTA_SWING * relative)
            .clamp(1.0 - ENERGY_QUOTA_SWING, 1.0 + ENERGY_QUOTA_SWING)
    } else {
        1.0
    };

    let quota = beat_count as f64 * params.density * quota_frac * energy_scale;
    quota.round().max(0.0) as usize
}

/// Step 4: which of the `n` selected beats become pickups.
///
/// Pickups are spaced evenly by index with forward jitter; at least one
/// pickup is placed whenever there are events.
fn pickup_slots(n: usize, pickup_ratio: f64, rng: &mut CourseRng) -> Vec<bool> {
    let mut slots = vec![false; n];
    if n == 0 {
        return slots;
    }
    let count = ((n as f64 * pickup_ratio).round() as usize).max(1);
    let spacing = n as f64 / count as f64;
    for i in 0..count {
        let pos = i as f64 * spacing + rng.next_f64() * spacing * PICKUP_SPACING_JITTER;
        slots[(pos.round() as usize).min(n - 1)] = true;
    }
    slots
}

/// Steps 5-7: lanes, clusters and types.
fn assign_lanes_and_types(
    map: &BeatMap,
    params: &DifficultyParameters,
    selected: &[SelectedBeat],
    pickups: &[bool],
    rng: &mut CourseRng,
) -> Vec<CourseEvent> {
    let wave_offset = rng.range_usize_inclusive(0, BOUNCE.len() - 1);
    let mut obstacle_wave_idx = 0;
    let mut lane_counts = [0usize; LANE_COUNT];
    let mut events = Vec::with_capacity(selected.len());

    for (beat, &is_pickup) in selected.iter().zip(pickups) {
        let bass = sample_at(&map.bands.bass, beat.t, map.resolution_ms);
        let perc = sample_at(&map.percussive, beat.t, map.resolution_ms);
        let harm = sample_at(&map.harmonic, beat.t, map.resolution_ms);

        if is_pickup {
            let lane = least_used_lane(&lane_counts, rng);
            let kind = pick_type(bass, perc, harm, params, rng, true);
            events.push(CourseEvent::new(beat.t, lane, kind));
            lane_counts[lane] += 1;
            continue;
        }

        let mut cluster_size = 1;
        if params.max_per_cluster >= 2
            && beat.energy > params.cluster2_energy
            && rng.random_bool(params.cluster2_prob)
        {
            cluster_size = 2;
        }
        if params.max_per_cluster >= 3
            && beat.energy > params.cluster3_energy
            && rng.random_bool(params.cluster3_prob)
        {
            cluster_size = 3;
        }

        let primary = wave_lane(obstacle_wave_idx + wave_offset, params, rng);
        let mut lanes = vec![primary];
        if cluster_size > 1 {
            lanes.extend(cluster_lanes(primary, cluster_size, params, &lane_counts));
        }

        for lane in lanes {
            let kind = pick_type(bass, perc, harm, params, rng, false);
            events.push(CourseEvent::new(beat.t, lane, kind));
            lane_counts[lane] += 1;
        }
        obstacle_wave_idx += 1;
    }
    events
}

/// Lane for the `index`-th obstacle: the bounce sequence scaled to the wave
/// amplitude, nudged by ±1 with probability `wave_noise`.
pub fn wave_lane(index: usize, params: &DifficultyParameters, rng: &mut CourseRng) -> usize {
    let top = LANE_COUNT - 1;
    let amplitude = params.wave_amplitude.min(top);
    let centering = (top - amplitude) / 2;
    let mut lane = (BOUNCE[index % BOUNCE.len()] * amplitude / top + centering) as i32;

    if rng.random_bool(params.wave_noise) {
        lane += rng.sign();
    }
    lane.clamp(0, top as i32) as usize
}

/// Least-used lane, ties broken randomly.
fn least_used_lane(lane_counts: &[usize; LANE_COUNT], rng: &mut CourseRng) -> usize {
    let keys: Vec<(usize, f64)> = lane_counts.iter().map(|&c| (c, rng.next_f64())).collect();
    (0..LANE_COUNT)
        .min_by(|&a, &b| {
            keys[a]
                .0
                .cmp(&keys[b].0)
                .then(keys[a].1.total_cmp(&keys[b].1))
        })
        .unwrap_or(0)
}

/// Extra lanes for a cluster around `primary`: adjacent lanes first, then
/// least-used, capped so `min_safe_lanes` stay open.
fn cluster_lanes(
    primary: usize,
    cluster_size: usize,
    params: &DifficultyParameters,
    lane_counts: &[usize; LANE_COUNT],
) -> Vec<usize> {
    let mut available: Vec<usize> = (0..LANE_COUNT).filter(|&l| l != primary).collect();
    available.sort_by_key(|&l| (l.abs_diff(primary), lane_counts[l]));

    let max_blocked = LANE_COUNT.saturating_sub(params.min_safe_lanes);
    let extra = (cluster_size - 1)
        .min(max_blocked.saturating_sub(1))
        .min(available.len());
    available.truncate(extra);
    available
}

/// Choose an event type from the audio features at its beat.
pub fn pick_type(
    bass: f64,
    perc: f64,
    harm: f64,
    params: &DifficultyParameters,
    rng: &mut CourseRng,
    is_pickup: bool,
) -> EventKind {
    if is_pickup {
        return if rng.next_f64() > SHIELD_CHANCE {
            EventKind::PickupAmmo
        } else {
            EventKind::PickupShield
        };
    }

    let dominant = bass.max(perc).max(harm * 0.5);
    if dominant == bass && bass > DOMINANT_BAND_FLOOR {
        if rng.random_bool(BASS_CRASH_CHANCE) {
            return EventKind::Crash;
        }
    } else if dominant == perc && perc > DOMINANT_BAND_FLOOR && rng.random_bool(PERCUSSIVE_CAR_CHANCE)
    {
        return EventKind::Car;
    }

    let total = params.crash_weight + params.car_weight + params.slow_weight;
    let roll = rng.next_f64();
    if roll < params.crash_weight / total {
        EventKind::Crash
    } else if roll < (params.crash_weight + params.car_weight) / total {
        EventKind::Car
    } else {
        EventKind::Slow
    }
}
