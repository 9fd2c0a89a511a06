use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the decomposition library.
///
/// None of these are fatal to a decomposition run: the orchestrator logs
/// per-frequency failures and carries on with the remaining frequencies.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("invalid frequency factor {0}: must be finite with |f| >= 1/pi")]
    InvalidFrequency(f64),

    #[error("reference tone cache conflict for frequency {frequency} at length {length}")]
    CacheConflict { frequency: f64, length: usize },

    #[error("analysis window for frequency {frequency} overflows: {width} samples x {padding} padding")]
    WindowTooLarge {
        frequency: f64,
        width: usize,
        padding: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    ParseConfig(#[from] toml::de::Error),

    #[error("invalid sample {value:?} at position {position}")]
    ParseSample { position: usize, value: String },
}

pub type Result<T> = std::result::Result<T, DecomposeError>;
