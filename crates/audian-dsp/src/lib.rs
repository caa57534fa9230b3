//! Offline DSP for windowed signal analysis: Butterworth second-order-section
//! filters with zero-phase (forward-backward) application, integer decimation,
//! Hann-windowed STFT power spectra and decibel helpers.
//!
//! Everything works on plain `&[f32]` slices. Filter state is kept in `f64`.

mod error;
pub use error::{Error, Result};

pub mod filter;
pub use filter::{Biquad, FilterKind, SosFilter};

mod zero_phase;
pub use zero_phase::filtfilt;

pub mod resample;
pub use resample::{decimate, decimated_len};

pub mod stft;
pub use stft::{hann_window, Stft};

pub mod spectral;
pub use spectral::{percentile, power_to_db};
