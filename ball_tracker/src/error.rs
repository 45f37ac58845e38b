use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the frame acquisition collaborator.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The device or file could not be opened; the session never starts.
    #[error("failed to open frame source: {0}")]
    Open(String),
    /// The source failed mid-session.
    #[error("failed to read frame: {0}")]
    Read(String),
    /// No frame arrived within the configured wait.
    #[error("no frame received within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A display collaborator failure. Never fatal to a session.
#[derive(Debug, Error)]
#[error("viewer error: {0}")]
pub struct ViewerError(pub String);

/// Everything that can end a tracking session early.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("failed to write sample log {path}: {source}")]
    Persistence { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TrackerError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
