use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what}: expected {expected} frames, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Malformed bounding box: expected 4 coordinates, got {0}")]
    MalformedBBox(usize),

    #[error("Track categories differ in length: players {players}, referees {referees}, ball {ball}")]
    InconsistentTracks {
        players: usize,
        referees: usize,
        ball: usize,
    },

    #[error("Cache required but not found at {0}")]
    CacheMissing(PathBuf),

    #[error("Cache at {path} is corrupt: {source}")]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Calibration quadrilateral is degenerate")]
    DegenerateCalibration,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
