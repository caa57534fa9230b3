//! # Audian - Streaming Data Pipeline for Long Recordings
//!
//! Browse multichannel recordings far larger than memory: only the time
//! window on screen is read, filtered and analyzed, and it is recomputed
//! only when the window moves or a parameter changes.
//!
//! ## Architecture
//!
//! Audian is an umbrella crate that coordinates:
//! - **audian-io** - Random-access sources (out-of-core WAV, in-memory) and region export
//! - **audian-dsp** - Butterworth filters, zero-phase filtering, STFT power spectra
//! - **audian-core** - Windowed series: source, filtered, envelope, spectrogram
//! - **audian-analysis** - Whole-recording overview computed on a worker thread
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audian::prelude::*;
//!
//! # fn main() -> audian::Result<()> {
//! let mut pipeline = DataPipeline::builder()
//!     .highpass(500.0)
//!     .lowpass(8000.0)
//!     .open("recording.wav")?;
//!
//! // Show seconds 60..70
//! pipeline.update_window(60.0, 70.0)?;
//! let filtered = pipeline.get_samples("filtered", 0, 60.0, 70.0)?;
//! let (zmin, zmax) = pipeline.spectrogram_color_range()?.unwrap_or((-100.0, -40.0));
//!
//! // Narrow the band on channel 1 only
//! pipeline.set_filter(1, 1000.0, 4000.0)?;
//! pipeline.update_window(60.0, 70.0)?;
//! # let _ = (filtered, zmin, zmax);
//! # Ok(())
//! # }
//! ```

/// Re-export of audian-io for direct access
pub use audian_io as io;

/// Re-export of audian-dsp
pub use audian_dsp as dsp;

/// Re-export of audian-core
pub use audian_core as core;

/// Re-export of audian-analysis
pub use audian_analysis as analysis;

mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::AudianConfig;

pub mod events;
pub use events::PipelineEvent;

pub mod graph;
pub use graph::{SeriesGraph, SeriesNode};

mod builder;
mod pipeline;

pub use builder::{DataPipelineBuilder, SeriesFactory};
pub use pipeline::{DataPipeline, SeriesExtent};

/// Convenience prelude for common imports
pub mod prelude {
    // Pipeline
    pub use crate::{AudianConfig, DataPipeline, DataPipelineBuilder, PipelineEvent};

    // Series
    pub use crate::core::{
        shared, EnvelopeConfig, EnvelopeSeries, FilterConfig, FilteredSeries, Series,
        SharedSeries, SpectrogramExtent, SpectrogramSeries, Window,
    };

    // Sources
    pub use crate::io::{MemorySource, RandomAccessSource, SampleBuffer, WavSource};

    // Overview
    pub use crate::analysis::{Overview, OverviewCache, OverviewHandle, OverviewStatus};

    // Error
    pub use crate::{Error, Result};
}
