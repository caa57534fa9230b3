//! Error types for audian-io

use std::path::PathBuf;
use thiserror::Error;

/// Source error type
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened as a sample source.
    #[error("Cannot open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    /// I/O error during reads or writes
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV decoding/encoding error
    #[error("WAV error: {0}")]
    Hound(#[from] hound::Error),

    /// Sample format or container not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source was closed before the read.
    #[error("Source is closed")]
    Closed,

    /// Invalid audio data (empty channels, mismatched lengths, bad rate)
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, Error>;
