//! # Audian Core
//!
//! Lazily materialized, windowed signal series.
//!
//! A series holds values for one window of its time axis and recomputes only
//! when asked for frames it does not cover or when a parameter it depends on
//! changed. Series form a chain, each pulling margin-expanded windows from
//! its upstream:
//!
//! - **SourceSeries**: raw samples from a [`RandomAccessSource`](audian_io::RandomAccessSource), with readahead
//! - **FilteredSeries**: zero-phase Butterworth band limiting, per channel
//! - **EnvelopeSeries**: `sqrt(2) * lowpass(|x|)`, optionally decimated
//! - **SpectrogramSeries**: Hann-windowed STFT power in dB
//!
//! The graph is single-threaded: series are shared as
//! `Rc<RefCell<dyn Series>>` and borrowed only for the duration of a call.
//!
//! ## Example
//!
//! ```rust
//! use audian_core::{shared, FilterConfig, FilteredSeries, ReadaheadConfig, Series, SourceSeries, Window};
//! use audian_io::MemorySource;
//!
//! let memory = MemorySource::new(1000.0, vec![vec![0.25f32; 5000]]).unwrap();
//! let source = shared(SourceSeries::new(Box::new(memory), ReadaheadConfig::default()).unwrap());
//! let mut filtered = FilteredSeries::new(source, &FilterConfig::band(10.0, 100.0)).unwrap();
//!
//! filtered.request_window(Window::new(1000, 500)).unwrap();
//! let values = filtered.read(1200, 10, 0).unwrap();
//! assert_eq!(values.len(), 10);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{
    seconds_to_frames, EnvelopeConfig, FilterConfig, ReadaheadConfig, SpectrogramConfig,
};

mod window;
pub use window::Window;

mod buffer;
pub use buffer::SeriesBuffer;

mod series;
pub use series::{shared, Series, SharedSeries};

mod source;
pub use source::SourceSeries;

mod filtered;
pub use filtered::FilteredSeries;

mod envelope;
pub use envelope::EnvelopeSeries;

pub mod spectrogram;
pub use spectrogram::{snap_nfft, SpectrogramExtent, SpectrogramSeries};
