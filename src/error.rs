use std::path::PathBuf;

use thiserror::Error;

/// Lookup failures for the static music tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown genre: {0}")]
    UnknownGenre(String),
}

/// Failures that prevent a jam session from starting or being saved.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("microphone unavailable: {0}")]
    Capture(String),
    #[error("session already live")]
    AlreadyLive,
    #[error("could not start the key sampler: {0}")]
    Sampler(#[source] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode recordings index: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not write wav {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no usable data directory (set JAMPILOT_DATA_DIR or --data-dir)")]
    NoDataDir,
}
