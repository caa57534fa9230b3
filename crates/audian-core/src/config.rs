//! Series configuration.
//!
//! Plain values passed in at construction. All structs deserialize with
//! missing fields taking their defaults.

use serde::{Deserialize, Serialize};

/// Band-limiting filter applied by [`FilteredSeries`](crate::FilteredSeries).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// High-pass cutoff in Hz, 0 disables (default: 0.0)
    pub highpass: f64,
    /// Low-pass cutoff in Hz, `None` means Nyquist (default: None)
    pub lowpass: Option<f64>,
    /// Butterworth order (default: 2)
    pub order: usize,
    /// Context filtered on each side of the window, in seconds (default: 1.0)
    pub margin_seconds: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            highpass: 0.0,
            lowpass: None,
            order: 2,
            margin_seconds: 1.0,
        }
    }
}

impl FilterConfig {
    /// Band-pass between `highpass` and `lowpass` Hz.
    pub fn band(highpass: f64, lowpass: f64) -> Self {
        Self {
            highpass,
            lowpass: Some(lowpass),
            ..Default::default()
        }
    }

    /// Low-pass cutoff resolved against a sample rate.
    pub fn lowpass_at(&self, rate: f64) -> f64 {
        self.lowpass.unwrap_or(rate / 2.0)
    }

    pub fn margin_frames(&self, rate: f64) -> usize {
        seconds_to_frames(self.margin_seconds, rate)
    }
}

/// Amplitude envelope settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Smoothing low-pass cutoff in Hz (default: 500.0)
    pub cutoff: f64,
    /// Look-behind in seconds (default: 1.0)
    pub margin_before: f64,
    /// Look-ahead in seconds (default: 1.0)
    pub margin_after: f64,
    /// Reduce the envelope rate to about ten times the cutoff (default: false)
    pub downsample: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            cutoff: 500.0,
            margin_before: 1.0,
            margin_after: 1.0,
            downsample: false,
        }
    }
}

impl EnvelopeConfig {
    /// Decimation step for an upstream at `rate` Hz.
    pub fn step(&self, cutoff: f64, rate: f64) -> usize {
        if !self.downsample || !(cutoff > 0.0) {
            return 1;
        }
        ((rate / (10.0 * cutoff)).floor() as usize).max(1)
    }
}

/// Spectrogram resolution and scrolling look-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// FFT length in frames (default: 512)
    pub nfft: usize,
    /// Hop as a fraction of `nfft` (default: 0.5)
    pub hop_fraction: f64,
    /// Extra time computed past the requested window, in seconds
    /// (default: 10.0)
    pub lookahead_seconds: f64,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            nfft: 512,
            hop_fraction: 0.5,
            lookahead_seconds: 10.0,
        }
    }
}

/// Readahead around windows read from the sample source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadaheadConfig {
    /// Extra seconds read before the window (default: 0.0)
    pub seconds_before: f64,
    /// Extra seconds read after the window (default: 2.0)
    pub seconds_after: f64,
    /// Reads are aligned to multiples of this many frames (default: 16384)
    pub chunk_frames: usize,
}

impl Default for ReadaheadConfig {
    fn default() -> Self {
        Self {
            seconds_before: 0.0,
            seconds_after: 2.0,
            chunk_frames: 16384,
        }
    }
}

impl ReadaheadConfig {
    /// Read exactly the requested frames.
    pub fn none() -> Self {
        Self {
            seconds_before: 0.0,
            seconds_after: 0.0,
            chunk_frames: 1,
        }
    }

    /// Create config with custom look-ahead.
    pub fn with_seconds_after(seconds: f64) -> Self {
        Self {
            seconds_after: seconds.max(0.0),
            ..Default::default()
        }
    }

    /// The frames to actually load for a requested range, before clamping.
    pub fn expand(&self, offset: usize, frames: usize, rate: f64) -> (usize, usize) {
        let chunk = self.chunk_frames.max(1);
        let before = seconds_to_frames(self.seconds_before, rate);
        let after = seconds_to_frames(self.seconds_after, rate);

        let start = offset.saturating_sub(before) / chunk * chunk;
        let end = offset
            .saturating_add(frames)
            .saturating_add(after)
            .div_ceil(chunk)
            .saturating_mul(chunk);
        (start, end - start)
    }
}

/// Whole frames covering `seconds` at `rate`; negative or non-finite is 0.
pub fn seconds_to_frames(seconds: f64, rate: f64) -> usize {
    let frames = (seconds * rate).ceil();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}
