// Path validation: culling generated events until the course is playable.
//
// Two hard invariants hold for every time group of the returned list:
//
// - Safety: at least `min_safe_lanes` lanes are free of obstacles. Pickups
//   never block a lane.
// - Reachability: some free lane of the group is within
//   `floor(gap / LANE_CROSS_TIME_S)` lanes of some free lane of the previous
//   surviving group, where `gap` is the time between the two groups.
//
// Repair is greedy: obstacles are removed from the end of the group (the
// most recently generated first) until the invariant holds. This is not a
// minimal repair, and the removal order must stay as is so that courses are
// reproducible from their seed.
//
// Groups are anchored on their first event, so culling an anchor can make
// the survivors regroup differently. Passes repeat until one culls nothing;
// at that point every group of the output, regrouped, satisfies both
// invariants against the group before it.

use crate::event::{CourseEvent, LANE_COUNT, sort_by_time, time_groups};
use crate::params::DifficultyParameters;
use std::borrow::Borrow;

/// Time the player needs to move across one lane.
pub const LANE_CROSS_TIME_S: f64 = 0.3;

/// `blocked[lane]` is true when an obstacle occupies the lane.
pub type LaneMask = [bool; LANE_COUNT];

/// Surviving events and how many were culled to get there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    pub events: Vec<CourseEvent>,
    pub culled: usize,
}

/// Lanes blocked by the obstacles among `events`.
pub fn blocked_lanes<E: Borrow<CourseEvent>>(events: &[E]) -> LaneMask {
    let mut blocked = [false; LANE_COUNT];
    for e in events.iter().map(Borrow::borrow) {
        if !e.is_pickup() {
            blocked[e.lane] = true;
        }
    }
    blocked
}

pub fn safe_lane_count(blocked: &LaneMask) -> usize {
    blocked.iter().filter(|&&b| !b).count()
}

/// Furthest the player can shift lanes in `gap_s` seconds.
pub fn max_lane_shift(gap_s: f64) -> usize {
    (gap_s / LANE_CROSS_TIME_S).floor().max(0.0) as usize
}

/// Whether any free lane of `next` is within `max_shift` of a free lane of
/// `prev`.
pub fn is_reachable(prev: &LaneMask, next: &LaneMask, max_shift: usize) -> bool {
    (0..LANE_COUNT).filter(|&p| !prev[p]).any(|p| {
        (0..LANE_COUNT)
            .filter(|&c| !next[c])
            .any(|c| c.abs_diff(p) <= max_shift)
    })
}

/// Cull events that break the safety or reachability invariants.
pub fn validate_paths(events: &[CourseEvent], params: &DifficultyParameters) -> Validation {
    if events.is_empty() {
        return Validation::default();
    }

    let mut sorted = events.to_vec();
    sort_by_time(&mut sorted);

    let mut culled = 0;
    loop {
        let (kept, pass_culled) = cull_pass(&sorted, params);
        sorted = kept;
        culled += pass_culled;
        if pass_culled == 0 {
            break;
        }
    }

    Validation {
        events: sorted,
        culled,
    }
}

/// One greedy pass over the time groups of `sorted`. Returns the survivors,
/// time-sorted, and the number culled.
fn cull_pass(sorted: &[CourseEvent], params: &DifficultyParameters) -> (Vec<CourseEvent>, usize) {
    let mut validated = Vec::with_capacity(sorted.len());
    let mut culled = 0;
    // Time and blocked lanes of the last group that kept any event.
    let mut prev: Option<(f64, LaneMask)> = None;

    for group in time_groups(sorted) {
        let members = &sorted[group.range];
        let (mut obstacles, pickups): (Vec<CourseEvent>, Vec<CourseEvent>) =
            members.iter().cloned().partition(|e| !e.is_pickup());

        let mut blocked = blocked_lanes(&obstacles);
        while safe_lane_count(&blocked) < params.min_safe_lanes && obstacles.pop().is_some() {
            culled += 1;
            blocked = blocked_lanes(&obstacles);
        }

        if let Some((prev_t, prev_blocked)) = prev {
            let max_shift = max_lane_shift(group.t - prev_t);
            while !is_reachable(&prev_blocked, &blocked, max_shift) && obstacles.pop().is_some() {
                culled += 1;
                blocked = blocked_lanes(&obstacles);
            }
        }

        if obstacles.is_empty() && pickups.is_empty() {
            continue;
        }
        prev = Some((group.t, blocked));
        validated.extend(obstacles);
        validated.extend(pickups);
    }

    sort_by_time(&mut validated);
    (validated, culled)
}
