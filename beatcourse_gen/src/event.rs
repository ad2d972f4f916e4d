// Course events and time grouping.
//
// A course is a time-ordered list of `CourseEvent`s, each occupying one of
// four lanes. Events within `TIME_GROUP_WINDOW_S` of the first event of a
// group are treated as simultaneous: together they form a "wall" the player
// must pass through, which is the unit path validation and flow scoring
// reason about.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Range;

/// The game has exactly four lanes.
pub const LANE_COUNT: usize = 4;

/// Events closer than this to a group's first event join that group.
pub const TIME_GROUP_WINDOW_S: f64 = 0.05;

/// What spawns at an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Crash,
    Car,
    Slow,
    PickupAmmo,
    PickupShield,
    /// A crash projectile timed to intercept a car mid-screen on a beat.
    CarCrashBeat,
    /// A crash placed shortly before an ammo pickup in the same lane.
    Guardian,
    /// A car re-timed to reach the sweet spot on a beat.
    EnemyCar,
}

impl EventKind {
    /// Pickups never block a lane.
    pub fn is_pickup(self) -> bool {
        matches!(self, EventKind::PickupAmmo | EventKind::PickupShield)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Crash => "crash",
            EventKind::Car => "car",
            EventKind::Slow => "slow",
            EventKind::PickupAmmo => "pickup_ammo",
            EventKind::PickupShield => "pickup_shield",
            EventKind::CarCrashBeat => "car_crash_beat",
            EventKind::Guardian => "guardian",
            EventKind::EnemyCar => "enemy_car",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One spawn in a course.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourseEvent {
    /// Seconds from track start. For obstacles this is the kill-zone
    /// arrival time; for `enemy_car` it is the sweet-spot arrival time.
    pub t: f64,
    /// 0..LANE_COUNT
    pub lane: usize,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Spawn lead time in seconds, only set for `car_crash_beat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<f64>,
}

impl CourseEvent {
    /// An event at `t` (rounded to the millisecond) with no lead.
    pub fn new(t: f64, lane: usize, kind: EventKind) -> Self {
        CourseEvent {
            t: round3(t),
            lane,
            kind,
            lead: None,
        }
    }

    pub fn is_pickup(&self) -> bool {
        self.kind.is_pickup()
    }
}

/// Round to three decimal places (millisecond precision).
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Stable sort by time. Events at equal times keep their relative order.
pub fn sort_by_time(events: &mut [CourseEvent]) {
    events.sort_by(|a, b| a.t.total_cmp(&b.t));
}

/// A run of simultaneous events inside a time-sorted slice.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGroup {
    /// Time of the group's first event.
    pub t: f64,
    /// Index range of the group's events in the sorted slice.
    pub range: Range<usize>,
}

/// Partition a time-sorted slice into time groups.
pub fn time_groups<E: Borrow<CourseEvent>>(sorted: &[E]) -> Vec<TimeGroup> {
    let mut groups: Vec<TimeGroup> = Vec::new();
    for (i, event) in sorted.iter().enumerate() {
        let t = event.borrow().t;
        match groups.last_mut() {
            Some(group) if (t - group.t).abs() < TIME_GROUP_WINDOW_S => group.range.end = i + 1,
            _ => groups.push(TimeGroup { t, range: i..i + 1 }),
        }
    }
    groups
}
