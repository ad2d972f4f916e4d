// Beat map: the per-track audio feature document that drives generation.
//
// The document is produced by an external analysis pipeline and stored as
// JSON. Continuous signals are quantized to uint8 (0-255 for 0.0-1.0) and
// uniformly sampled every `resolution_ms`; `beats` and `onsets` are
// timestamps in seconds. Loading decodes every uint8 signal to [0, 1] once,
// so the rest of the crate only ever sees normalized `f64` samples.
//
// Validation happens here, before any generation starts: a malformed or
// inconsistent map is a caller-facing configuration error. An empty `beats`
// sequence is *not* an error, it simply yields an empty course.
//
// Consumed by sampler.rs (signal lookup), generator.rs, scoring.rs and
// post.rs.

use crate::error::{CourseError, Result};
use serde::Deserialize;
use std::path::Path;

/// Raw band energies as stored in the JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct BandsDocument {
    pub bass: Vec<u8>,
    pub low_mid: Vec<u8>,
    pub mid: Vec<u8>,
    pub high_mid: Vec<u8>,
    pub high: Vec<u8>,
}

/// The beat map exactly as serialized by the analysis pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct BeatMapDocument {
    pub resolution_ms: u32,
    pub duration_s: f64,
    pub bpm: f64,
    pub bands: BandsDocument,
    pub energy: Vec<u8>,
    pub percussive: Vec<u8>,
    pub harmonic: Vec<u8>,
    pub onset_env: Vec<u8>,
    pub centroid: Vec<f64>,
    pub beats: Vec<f64>,
    pub onsets: Vec<f64>,
    #[serde(default)]
    pub spotify_track_id: Option<String>,
}

/// Decoded band energies, each sample in [0, 1].
#[derive(Debug, Clone, Default)]
pub struct Bands {
    pub bass: Vec<f64>,
    pub low_mid: Vec<f64>,
    pub mid: Vec<f64>,
    pub high_mid: Vec<f64>,
    pub high: Vec<f64>,
}

/// Immutable, decoded per-track audio features.
#[derive(Debug, Clone)]
pub struct BeatMap {
    pub track_id: Option<String>,
    /// Spacing between consecutive signal samples, in milliseconds.
    pub resolution_ms: u32,
    pub duration_s: f64,
    pub bpm: f64,
    pub bands: Bands,
    pub energy: Vec<f64>,
    pub percussive: Vec<f64>,
    pub harmonic: Vec<f64>,
    pub onset_env: Vec<f64>,
    /// Spectral centroid in Hz (not normalized).
    pub centroid: Vec<f64>,
    /// Beat timestamps in seconds, strictly ascending.
    pub beats: Vec<f64>,
    pub onsets: Vec<f64>,
}

/// Decode a fixed-point uint8 signal to [0, 1].
fn decode(raw: &[u8]) -> Vec<f64> {
    raw.iter().map(|&v| f64::from(v) / 255.0).collect()
}

impl BeatMap {
    /// Load, decode and validate a beat map from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CourseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, &path.display().to_string())
    }

    /// Parse a beat map from a JSON string. `origin` names the source in
    /// error messages.
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        let doc: BeatMapDocument =
            serde_json::from_str(json).map_err(|source| CourseError::Json {
                origin: origin.to_string(),
                source,
            })?;
        Self::from_document(doc)
    }

    /// Decode a raw document and validate the result.
    pub fn from_document(doc: BeatMapDocument) -> Result<Self> {
        let map = BeatMap {
            track_id: doc.spotify_track_id,
            resolution_ms: doc.resolution_ms,
            duration_s: doc.duration_s,
            bpm: doc.bpm,
            bands: Bands {
                bass: decode(&doc.bands.bass),
                low_mid: decode(&doc.bands.low_mid),
                mid: decode(&doc.bands.mid),
                high_mid: decode(&doc.bands.high_mid),
                high: decode(&doc.bands.high),
            },
            energy: decode(&doc.energy),
            percussive: decode(&doc.percussive),
            harmonic: decode(&doc.harmonic),
            onset_env: decode(&doc.onset_env),
            centroid: doc.centroid,
            beats: doc.beats,
            onsets: doc.onsets,
        };
        map.validate()?;
        Ok(map)
    }

    /// Check the structural invariants every consumer relies on.
    pub fn validate(&self) -> Result<()> {
        if self.resolution_ms == 0 {
            return Err(CourseError::InvalidBeatMap(
                "resolution_ms must be positive".into(),
            ));
        }
        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return Err(CourseError::InvalidBeatMap(format!(
                "duration_s must be a non-negative number, got {}",
                self.duration_s
            )));
        }
        if !self.bpm.is_finite() || self.bpm < 0.0 {
            return Err(CourseError::InvalidBeatMap(format!(
                "bpm must be a non-negative number, got {}",
                self.bpm
            )));
        }

        let expected = self.energy.len();
        let signals: [(&str, usize); 10] = [
            ("bands.bass", self.bands.bass.len()),
            ("bands.low_mid", self.bands.low_mid.len()),
            ("bands.mid", self.bands.mid.len()),
            ("bands.high_mid", self.bands.high_mid.len()),
            ("bands.high", self.bands.high.len()),
            ("percussive", self.percussive.len()),
            ("harmonic", self.harmonic.len()),
            ("onset_env", self.onset_env.len()),
            ("centroid", self.centroid.len()),
            ("energy", expected),
        ];
        for (name, len) in signals {
            if len != expected {
                return Err(CourseError::InvalidBeatMap(format!(
                    "{name} has {len} samples but energy has {expected}"
                )));
            }
        }

        for (i, &t) in self.beats.iter().enumerate() {
            if !t.is_finite() {
                return Err(CourseError::InvalidBeatMap(format!(
                    "beat {i} is not a finite timestamp"
                )));
            }
            if i > 0 && t <= self.beats[i - 1] {
                return Err(CourseError::InvalidBeatMap(format!(
                    "beats must be strictly ascending (beat {i} at {t}s follows {}s)",
                    self.beats[i - 1]
                )));
            }
        }
        if self.onsets.iter().any(|t| !t.is_finite()) {
            return Err(CourseError::InvalidBeatMap(
                "onsets must be finite timestamps".into(),
            ));
        }
        Ok(())
    }

    /// Number of samples in each signal.
    pub fn sample_count(&self) -> usize {
        self.energy.len()
    }
}

/// A beat map with every signal held at `level`, for unit tests.
#[cfg(test)]
pub(crate) fn constant_beat_map(duration_s: f64, beats: Vec<f64>, level: f64) -> BeatMap {
    let resolution_ms = 50;
    let n = (duration_s * 1000.0 / f64::from(resolution_ms)).ceil() as usize + 1;
    let flat = vec![level; n];
    BeatMap {
        track_id: Some("test-track".into()),
        resolution_ms,
        duration_s,
        bpm: 120.0,
        bands: Bands {
            bass: flat.clone(),
            low_mid: flat.clone(),
            mid: flat.clone(),
            high_mid: flat.clone(),
            high: flat.clone(),
        },
        energy: flat.clone(),
        percussive: flat.clone(),
        harmonic: flat.clone(),
        onset_env: flat,
        centroid: vec![1500.0; n],
        beats,
        onsets: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_json(beats: &str) -> String {
        format!(
            r#"{{
                "resolution_ms": 50, "duration_s": 0.2, "bpm": 128.0,
                "bands": {{ "bass": [0, 255, 51, 0], "low_mid": [0, 0, 0, 0],
                           "mid": [0, 0, 0, 0], "high_mid": [0, 0, 0, 0],
                           "high": [0, 0, 0, 0] }},
                "energy": [0, 255, 102, 0], "percussive": [1, 2, 3, 4],
                "harmonic": [4, 3, 2, 1], "onset_env": [0, 0, 0, 0],
                "centroid": [1000.0, 1100.5, 900.0, 950.0],
                "beats": {beats}, "onsets": [0.05],
                "spotify_track_id": "abc123"
            }}"#
        )
    }

    #[test]
    fn test_uint8_signals_decoded_to_unit_range() {
        let map = BeatMap::from_json(&document_json("[0.0, 0.1]"), "inline").unwrap();
        assert_eq!(map.energy[1], 1.0);
        assert!((map.energy[2] - 0.4).abs() < 1e-12);
        assert!((map.bands.bass[2] - 0.2).abs() < 1e-12);
        assert_eq!(map.centroid[1], 1100.5, "centroid stays in Hz");
        assert_eq!(map.track_id.as_deref(), Some("abc123"));
        assert_eq!(map.sample_count(), 4);
    }

    #[test]
    fn test_missing_field_fails_fast() {
        let json = document_json("[0.0]").replace(r#""bpm": 128.0,"#, "");
        let err = BeatMap::from_json(&json, "inline").unwrap_err();
        assert!(
            matches!(err, CourseError::Json { .. }),
            "missing bpm should be a JSON error, got {err}"
        );
        assert!(err.to_string().contains("bpm"), "error should name the field: {err}");
    }

    #[test]
    fn test_out_of_order_beats_rejected() {
        let err = BeatMap::from_json(&document_json("[0.1, 0.1]"), "inline").unwrap_err();
        assert!(matches!(err, CourseError::InvalidBeatMap(_)), "got {err}");
    }

    #[test]
    fn test_empty_beats_accepted() {
        let map = BeatMap::from_json(&document_json("[]"), "inline").unwrap();
        assert!(map.beats.is_empty());
    }

    #[test]
    fn test_mismatched_signal_lengths_rejected() {
        let mut map = constant_beat_map(10.0, vec![1.0], 0.5);
        map.harmonic.pop();
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("harmonic"), "got {err}");
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut map = constant_beat_map(10.0, vec![1.0], 0.5);
        map.resolution_ms = 0;
        assert!(map.validate().is_err());
    }
}
