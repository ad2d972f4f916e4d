// Error type for the course generator library.
//
// Only the edges of the pipeline can fail: loading and validating a beat
// map, validating a parameter override, and writing a course. Generation,
// path validation, scoring, adjustment and post-processing are total
// functions over validated inputs and never return errors.

use std::path::PathBuf;

/// Errors surfaced to callers of the course generator.
#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid beat map: {0}")]
    InvalidBeatMap(String),

    #[error("invalid difficulty parameters: {0}")]
    InvalidParameters(String),

    #[error("unknown difficulty '{0}' (expected easy, normal or hard)")]
    UnknownDifficulty(String),
}

pub type Result<T> = std::result::Result<T, CourseError>;
