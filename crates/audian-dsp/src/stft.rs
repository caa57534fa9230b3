//! Short-time power spectra.

use crate::{Error, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Periodic Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

/// Hann-windowed STFT producing one-sided power spectral density.
///
/// Each frame is mean-detrended, windowed, transformed and scaled by
/// `1 / (rate * sum(w^2))`; all bins except DC (and Nyquist for even `nfft`)
/// are doubled to fold in the negative frequencies.
pub struct Stft {
    nfft: usize,
    hop: usize,
    rate: f64,
    window: Vec<f32>,
    scale: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("nfft", &self.nfft)
            .field("hop", &self.hop)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl Stft {
    pub fn new(nfft: usize, hop: usize, rate: f64) -> Result<Self> {
        if nfft < 2 {
            return Err(Error::InvalidParameter(format!("nfft {nfft} must be >= 2")));
        }
        if hop == 0 || hop > nfft {
            return Err(Error::InvalidParameter(format!(
                "hop {hop} outside 1..={nfft}"
            )));
        }
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidParameter(format!("sample rate {rate}")));
        }

        let window = hann_window(nfft);
        let energy: f64 = window.iter().map(|&w| (w as f64) * (w as f64)).sum();
        let scale = (1.0 / (rate * energy)) as f32;

        let fft = FftPlanner::new().plan_fft_forward(nfft);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        Ok(Self {
            nfft,
            hop,
            rate,
            window,
            scale,
            fft,
            buffer: vec![Complex::default(); nfft],
            scratch,
        })
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of one-sided frequency bins, `nfft / 2 + 1`.
    pub fn freq_bins(&self) -> usize {
        self.nfft / 2 + 1
    }

    /// Center frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.rate / self.nfft as f64
    }

    /// Power spectrum of one frame into `out` (`freq_bins()` values).
    ///
    /// `frame` may be shorter than `nfft`; the rest is zero padding.
    pub fn power_frame(&mut self, frame: &[f32], out: &mut [f32]) {
        let n = frame.len().min(self.nfft);
        let mean = if n > 0 {
            frame[..n].iter().sum::<f32>() / n as f32
        } else {
            0.0
        };

        // The mean is removed from the samples only, padding stays zero.
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < n { frame[i] - mean } else { 0.0 };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let bins = self.freq_bins();
        let nyquist_bin = if self.nfft % 2 == 0 { bins - 1 } else { bins };
        for (k, value) in out.iter_mut().take(bins).enumerate() {
            let mut power = self.buffer[k].norm_sqr() * self.scale;
            if k > 0 && k < nyquist_bin {
                power *= 2.0;
            }
            *value = power;
        }
    }

    /// Power spectra of `frames` consecutive frames starting at `signal[0]`,
    /// stepping by `hop`. Frames that run past the end of `signal` are zero
    /// padded. Returns a row-major `[frame][bin]` array.
    pub fn spectrogram(&mut self, signal: &[f32], frames: usize) -> Vec<f32> {
        let bins = self.freq_bins();
        let mut out = vec![0.0; frames * bins];
        for (t, row) in out.chunks_exact_mut(bins).enumerate() {
            let start = (t * self.hop).min(signal.len());
            let end = (start + self.nfft).min(signal.len());
            self.power_frame(&signal[start..end], row);
        }
        out
    }
}
