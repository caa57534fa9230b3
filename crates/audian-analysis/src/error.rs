//! Error types for audian-analysis

use thiserror::Error;

/// Overview error type
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the recording failed.
    #[error("Source error: {0}")]
    Source(#[from] audian_io::Error),

    /// The worker thread could not be started.
    #[error("Failed to spawn overview worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("Overview worker panicked")]
    WorkerPanicked,

    /// The worker stopped with an error.
    #[error("Overview failed: {0}")]
    Failed(String),

    /// The overview was cancelled before it finished.
    #[error("Overview cancelled")]
    Cancelled,
}

/// Result type for overview operations
pub type Result<T> = std::result::Result<T, Error>;
