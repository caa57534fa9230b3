//! Error types for audian-core

use crate::Window;
use thiserror::Error;

/// Series error type
#[derive(Error, Debug)]
pub enum Error {
    /// Reading from the underlying sample source failed.
    #[error("Source error: {0}")]
    Source(#[from] audian_io::Error),

    /// DSP setup failed.
    #[error("DSP error: {0}")]
    Dsp(#[from] audian_dsp::Error),

    /// Rejected filter or envelope cutoffs. The previous configuration stays
    /// in effect.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The upstream has no frames or an unusable rate.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// A read outside the materialized window.
    #[error("Frames {offset}..{} are not buffered (window {window})", .offset.saturating_add(*.frames))]
    NotBuffered {
        offset: usize,
        frames: usize,
        window: Window,
    },

    #[error("Channel {channel} out of range ({channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },
}

/// Result type for series operations
pub type Result<T> = std::result::Result<T, Error>;
