//! # Audian Analysis
//!
//! Whole-recording overviews for navigation.
//!
//! - **Waveform summaries**: multi-resolution min/max/RMS blocks
//! - **Overview worker**: summarizes a recording on a background thread
//!   through its own reader, polled without blocking
//! - **Overview cache**: LRU cache of finished overviews
//!
//! ## Example
//!
//! ```rust
//! use audian_analysis::{OverviewConfig, OverviewHandle};
//! use audian_io::MemorySource;
//!
//! let source = MemorySource::new(1000.0, vec![vec![0.5f32; 10_000]]).unwrap();
//! let handle = OverviewHandle::start(Box::new(source), &OverviewConfig::default()).unwrap();
//! let overview = handle.wait().unwrap();
//! assert_eq!(overview.peak(), 0.5);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod cache;
pub use cache::{overview_key, OverviewCache};

pub mod overview;
pub use overview::{Overview, OverviewConfig, OverviewHandle, OverviewStatus};

pub mod waveform;
pub use waveform::{
    compute_summary, MultiResolutionSummary, SummaryBuilder, WaveformBlock, WaveformSummary,
};
