//! Error types for audian-dsp

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidParameter(String),
    InvalidCutoff(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::InvalidCutoff(msg) => write!(f, "Invalid cutoff: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
