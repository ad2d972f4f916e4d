// Time-indexed lookup into beat-map signals.
//
// Signals are uniformly sampled every `resolution_ms`. `sample_at` linearly
// interpolates between the two neighboring samples and clamps to the first
// or last sample outside the covered range. `find_nearest_beat` is an
// explicit binary search over the ascending beat sequence; it is called for
// every event during scoring, so it must stay O(log n).

/// Distance reported by `find_nearest_beat` when there are no beats at all.
pub const NO_BEAT_DISTANCE_S: f64 = 999.0;

/// Linearly interpolate `signal` at time `t_s`.
///
/// Returns 0.0 for an empty signal.
pub fn sample_at(signal: &[f64], t_s: f64, resolution_ms: u32) -> f64 {
    let Some(&last) = signal.last() else {
        return 0.0;
    };
    let idx = t_s * 1000.0 / f64::from(resolution_ms);
    if idx < 0.0 {
        return signal[0];
    }
    let i0 = idx.floor() as usize;
    if i0 >= signal.len() - 1 {
        return last;
    }
    let frac = idx - i0 as f64;
    signal[i0] * (1.0 - frac) + signal[i0 + 1] * frac
}

/// Index of the first beat at or after `t_s` (the insertion point), or
/// `beats.len() - 1` if every beat precedes `t_s`.
fn insertion_point(beats: &[f64], t_s: f64) -> usize {
    let (mut lo, mut hi) = (0, beats.len() - 1);
    while lo < hi {
        let mid = (lo + hi) / 2;
        if beats[mid] < t_s {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Absolute distance in seconds from `t_s` to the closest beat.
///
/// Returns [`NO_BEAT_DISTANCE_S`] when `beats` is empty.
pub fn find_nearest_beat(beats: &[f64], t_s: f64) -> f64 {
    nearest_beat(beats, t_s).map_or(NO_BEAT_DISTANCE_S, |b| (b - t_s).abs())
}

/// The beat timestamp closest to `t_s`. Ties go to the earlier beat.
pub fn nearest_beat(beats: &[f64], t_s: f64) -> Option<f64> {
    if beats.is_empty() {
        return None;
    }
    let lo = insertion_point(beats, t_s);
    let mut best = beats[lo];
    if lo > 0 && (beats[lo - 1] - t_s).abs() <= (best - t_s).abs() {
        best = beats[lo - 1];
    }
    Some(best)
}
