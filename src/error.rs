//! Centralized error type for the audian umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O: {0}")]
    Source(#[from] audian_io::Error),

    #[error("DSP: {0}")]
    Dsp(#[from] audian_dsp::Error),

    #[error(transparent)]
    Series(#[from] audian_core::Error),

    #[error("Overview: {0}")]
    Analysis(#[from] audian_analysis::Error),

    #[error("Unknown series '{0}'")]
    UnknownSeries(String),

    #[error("Series '{0}' is already registered")]
    DuplicateSeries(String),

    /// The series exists but holds more than one value per frame.
    #[error("Series '{0}' is not one-dimensional")]
    NotOneDimensional(String),

    #[error("Config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error rejected a parameter change and left the previous
    /// settings in place.
    pub fn is_invalid_filter(&self) -> bool {
        matches!(self, Error::Series(audian_core::Error::InvalidFilter(_)))
    }
}
