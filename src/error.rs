//! Error types shared by every stage of a training run.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can abort a run.
///
/// None of these are retried: they propagate to the process boundary and the
/// last epoch-end checkpoint remains the recovery point.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Logger setup error: {0}")]
    Logger(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn logger(msg: impl Into<String>) -> Self {
        Self::Logger(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Wraps an I/O error together with the path that caused it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;
