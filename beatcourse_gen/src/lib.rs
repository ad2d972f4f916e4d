// Beat Course Generator
//
// Turns a precomputed per-track audio feature map (a "beat map") into a
// deterministic, quality-scored course of timed lane events for a four-lane
// rhythm game, at three difficulty tiers. Courses are found by search:
// generate a candidate, cull what is unplayable, score it on seven axes, nudge
// the parameters toward the weak axes and try again, keeping the best.
//
// Architecture:
// - error.rs: `CourseError` and the crate `Result` alias
// - beatmap.rs: Beat-map JSON document, uint8 signal decoding, validation
// - sampler.rs: Signal interpolation and nearest-beat binary search
// - params.rs: Difficulty tiers, the parameter bundle, presets, JSON overrides
// - event.rs: Course events, event kinds, time grouping
// - generator.rs: Candidate beats -> section quotas -> wave lanes -> types
// - validate.rs: Safety and reachability culling (greedy, from the tail)
// - scoring.rs: Seven sub-scores and their weighted total
// - adjust.rs: Score-driven parameter adaptation between attempts
// - search.rs: Attempt loop with seed = attempt number, champion tracking
// - post.rs: car_crash_beat / guardian / enemy_car passes on the champion
// - course.rs: Output document, end-to-end `generate_course`, file I/O
//
// Everything between loading the beat map and writing the course is a pure
// function of its inputs, so a course can be regenerated bit-for-bit.

pub mod adjust;
pub mod beatmap;
pub mod course;
pub mod error;
pub mod event;
pub mod generator;
pub mod params;
pub mod post;
pub mod sampler;
pub mod scoring;
pub mod search;
pub mod validate;
