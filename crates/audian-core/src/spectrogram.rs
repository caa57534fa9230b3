//! Short-time power spectrogram in decibels.
//!
//! Frame `i` of the spectrogram is the Hann-windowed spectrum of upstream
//! frames `[i * hop, i * hop + nfft)`, so the series runs at `rate / hop`
//! and each frame holds `nfft / 2 + 1` bins. Frames reaching past the end of
//! the recording are zero padded.
//!
//! Requests are extended forward by a look-ahead so that scrolling does not
//! recompute on every step.

use crate::series::{stale_channels, upstream_layout};
use crate::{
    seconds_to_frames, Result, Series, SeriesBuffer, SharedSeries, SpectrogramConfig, Window,
};
use audian_dsp::{percentile, power_to_db, Stft};
use tracing::{debug, trace};

/// Smallest FFT length accepted by [`SpectrogramSeries::set_resolution`].
pub const MIN_NFFT: usize = 8;

/// Dynamic range of the default color scale in dB.
pub const COLOR_RANGE_DB: f32 = 60.0;

/// Time and frequency bounds of the materialized tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrogramExtent {
    pub t_start: f64,
    pub f_start: f64,
    pub t_end: f64,
    pub f_end: f64,
}

/// Round `nfft` to the nearest power of two, for stepping resolution up and
/// down in powers of two.
pub fn snap_nfft(nfft: usize) -> usize {
    let nfft = nfft.max(1);
    let upper = nfft.next_power_of_two();
    let lower = upper / 2;
    if lower > 0 && nfft - lower < upper - nfft {
        lower
    } else {
        upper
    }
}

pub struct SpectrogramSeries {
    upstream: SharedSeries,
    source_rate: f64,
    source_frames: usize,
    channels: usize,
    nfft: usize,
    hop: usize,
    hop_fraction: f64,
    lookahead_seconds: f64,
    stft: Stft,
    version: u64,
    dirty: Vec<bool>,
    seen: Vec<u64>,
    buffer: SeriesBuffer,
    recomputes: u64,
}

impl SpectrogramSeries {
    pub fn new(upstream: SharedSeries, config: &SpectrogramConfig) -> Result<Self> {
        let (source_rate, source_frames, channels) = upstream_layout(&upstream)?;
        let (nfft, hop) = resolve(config.nfft, config.hop_fraction, source_frames);
        let stft = Stft::new(nfft, hop, source_rate)?;

        Ok(Self {
            upstream,
            source_rate,
            source_frames,
            channels,
            nfft,
            hop,
            hop_fraction: config.hop_fraction,
            lookahead_seconds: config.lookahead_seconds,
            buffer: SeriesBuffer::new(channels, stft.freq_bins()),
            stft,
            version: 0,
            dirty: vec![true; channels],
            seen: vec![0; channels],
            recomputes: 0,
        })
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn hop_fraction(&self) -> f64 {
        self.hop_fraction
    }

    pub fn freq_bins(&self) -> usize {
        self.stft.freq_bins()
    }

    /// Seconds between spectrogram frames.
    pub fn time_resolution(&self) -> f64 {
        self.hop as f64 / self.source_rate
    }

    /// Hz between frequency bins.
    pub fn freq_resolution(&self) -> f64 {
        self.source_rate / self.nfft as f64
    }

    /// Change FFT length and hop.
    ///
    /// `nfft` is clamped to `[8, frames / 2]` and the hop to `[1, nfft]`;
    /// nothing is rejected. Returns whether the resolution actually changed,
    /// in which case the whole tile is recomputed on the next request.
    pub fn set_resolution(&mut self, nfft: usize, hop_fraction: f64) -> Result<bool> {
        let (nfft, hop) = resolve(nfft, hop_fraction, self.source_frames);
        self.hop_fraction = hop_fraction;
        if nfft == self.nfft && hop == self.hop {
            return Ok(false);
        }

        self.stft = Stft::new(nfft, hop, self.source_rate)?;
        self.nfft = nfft;
        self.hop = hop;
        self.buffer = SeriesBuffer::new(self.channels, self.stft.freq_bins());
        self.dirty.fill(true);
        self.version += 1;

        debug!(nfft, hop, "spectrogram resolution changed");
        Ok(true)
    }

    pub fn extent(&self) -> SpectrogramExtent {
        let window = self.buffer.window();
        SpectrogramExtent {
            t_start: self.frame_to_time(window.offset),
            f_start: 0.0,
            t_end: self.frame_to_time(window.end()),
            f_end: self.stft.bin_frequency(self.freq_bins() - 1),
        }
    }

    /// Default color scale `(zmin, zmax)` in dB for the current tile.
    ///
    /// `zmin` estimates the noise floor as the 95th percentile of the top
    /// sixteenth of frequency bins across all channels; `zmax` is 60 dB
    /// above it. `None` while nothing is materialized.
    pub fn color_range(&self) -> Option<(f32, f32)> {
        let window = self.buffer.window();
        if window.is_empty() {
            return None;
        }
        let bins = self.freq_bins();
        let top = (bins / 16).max(1);

        let mut values = Vec::with_capacity(self.channels * window.frames * top);
        for c in 0..self.channels {
            for row in self.buffer.channel(c).chunks_exact(bins) {
                values.extend_from_slice(&row[bins - top..]);
            }
        }
        let zmin = percentile(&values, 95.0)?;
        Some((zmin, zmin + COLOR_RANGE_DB))
    }

    fn lookahead(&self, window: Window) -> Window {
        let frames = seconds_to_frames(self.lookahead_seconds, self.rate());
        Window::new(window.offset, window.frames.saturating_add(frames)).clamp(self.frames())
    }

    fn upstream_range(&self, window: Window) -> Window {
        if window.is_empty() {
            return Window::new(window.offset * self.hop, 0);
        }
        let start = window.offset * self.hop;
        let end = (window.end() - 1) * self.hop + self.nfft;
        Window::from_range(start, end).clamp(self.source_frames)
    }

    fn recompute(&mut self, window: Window, channels: Vec<usize>) -> Result<()> {
        let up = self.upstream_range(window);
        let available = self.upstream.borrow_mut().request_window(up)?;
        let up = up.intersect(&available);

        // Zero padding is only valid at the true end of the file; elsewhere
        // keep the frames that fit entirely inside what was delivered.
        let last = if up.end() >= self.source_frames {
            self.frames()
        } else if up.end() >= self.nfft {
            (up.end() - self.nfft) / self.hop + 1
        } else {
            0
        };
        let window = window.intersect(&Window::from_range(up.offset.div_ceil(self.hop), last));

        let channels = if window == self.buffer.window() {
            channels
        } else {
            self.buffer.reset(window);
            (0..self.channels).collect()
        };

        let upstream = self.upstream.borrow();
        let skip = (window.offset * self.hop).saturating_sub(up.offset);
        for &c in &channels {
            let input = upstream.read(up.offset, up.frames, c)?;
            let signal = &input[skip.min(input.len())..];
            let mut tile = self.stft.spectrogram(signal, window.frames);
            power_to_db(&mut tile);
            self.buffer.channel_mut(c).copy_from_slice(&tile);
            self.dirty[c] = false;
            self.seen[c] = upstream.version(c);
        }
        self.recomputes += 1;

        debug!(
            window = %window,
            upstream = %up,
            nfft = self.nfft,
            hop = self.hop,
            "spectrogram recompute"
        );
        Ok(())
    }
}

fn resolve(nfft: usize, hop_fraction: f64, source_frames: usize) -> (usize, usize) {
    let max_nfft = (source_frames / 2).max(MIN_NFFT);
    let clamped = nfft.clamp(MIN_NFFT, max_nfft);
    if clamped != nfft {
        debug!(requested = nfft, nfft = clamped, "nfft clamped");
    }
    let hop = (hop_fraction * clamped as f64).round();
    let hop = if hop.is_finite() && hop >= 1.0 {
        (hop as usize).min(clamped)
    } else {
        1
    };
    (clamped, hop)
}

impl Series for SpectrogramSeries {
    fn kind(&self) -> &'static str {
        "spectrogram"
    }

    fn rate(&self) -> f64 {
        self.source_rate / self.hop as f64
    }

    fn frames(&self) -> usize {
        self.source_frames.div_ceil(self.hop)
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn frame_shape(&self) -> usize {
        self.freq_bins()
    }

    fn window(&self) -> Window {
        self.buffer.window()
    }

    fn upstream_window(&self, window: Window) -> Window {
        self.upstream_range(self.lookahead(window.clamp(self.frames())))
    }

    fn request_window(&mut self, window: Window) -> Result<Window> {
        let want = window.clamp(self.frames());
        if want.is_empty() {
            return Ok(want);
        }

        let stale = stale_channels(&self.dirty, &self.seen, &*self.upstream.borrow());
        let current = self.buffer.window();
        if current.contains(&want) {
            if stale.is_empty() {
                trace!(window = %want, "spectrogram window cached");
                return Ok(current);
            }
            self.recompute(current, stale)?;
        } else {
            let target = self.lookahead(want);
            self.recompute(target, (0..self.channels).collect())?;
        }
        Ok(self.buffer.window())
    }

    fn read(&self, offset: usize, frames: usize, channel: usize) -> Result<&[f32]> {
        self.buffer.read(offset, frames, channel)
    }

    fn is_dirty(&self) -> bool {
        !stale_channels(&self.dirty, &self.seen, &*self.upstream.borrow()).is_empty()
    }

    fn version(&self, channel: usize) -> u64 {
        self.version + self.upstream.borrow().version(channel)
    }

    fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shared, FilterConfig, FilteredSeries, ReadaheadConfig, SourceSeries};
    use approx::assert_abs_diff_eq;
    use audian_io::MemorySource;
    use std::f32::consts::PI;

    const RATE: f64 = 8000.0;

    fn tone_source(seconds: usize, freq: f32, amplitude: f32) -> SharedSeries {
        let frames = seconds * RATE as usize;
        let tone: Vec<f32> = (0..frames)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / RATE as f32).sin())
            .collect();
        let memory = MemorySource::new(RATE, vec![tone]).unwrap();
        shared(SourceSeries::new(Box::new(memory), ReadaheadConfig::none()).unwrap())
    }

    fn config(nfft: usize) -> SpectrogramConfig {
        SpectrogramConfig {
            nfft,
            hop_fraction: 0.5,
            lookahead_seconds: 0.0,
        }
    }

    #[test]
    fn test_shape() {
        let mut spec = SpectrogramSeries::new(tone_source(2, 1000.0, 1.0), &config(256)).unwrap();
        assert_eq!(spec.hop(), 128);
        assert_eq!(spec.freq_bins(), 129);
        assert_eq!(spec.frame_shape(), 129);
        assert_eq!(spec.rate(), RATE / 128.0);
        assert_eq!(spec.frames(), 16000usize.div_ceil(128));

        spec.request_window(Window::new(10, 20)).unwrap();
        assert_eq!(spec.read(10, 20, 0).unwrap().len(), 20 * 129);
        assert_eq!(spec.time_resolution(), 128.0 / RATE);
        assert_eq!(spec.freq_resolution(), RATE / 256.0);
    }

    #[test]
    fn test_tone_peak_bin() {
        let mut spec = SpectrogramSeries::new(tone_source(2, 1000.0, 1.0), &config(256)).unwrap();
        spec.request_window(Window::new(20, 10)).unwrap();
        let row = spec.read(25, 1, 0).unwrap();
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, 32);
    }

    #[test]
    fn test_nfft_clamping() {
        let mut spec = SpectrogramSeries::new(tone_source(1, 1000.0, 1.0), &config(256)).unwrap();
        assert!(spec.set_resolution(2, 0.5).unwrap());
        assert_eq!(spec.nfft(), MIN_NFFT);
        assert_eq!(spec.hop(), 4);

        spec.set_resolution(1 << 20, 0.5).unwrap();
        assert_eq!(spec.nfft(), 4000);

        spec.set_resolution(64, 0.0).unwrap();
        assert_eq!(spec.hop(), 1);
        spec.set_resolution(64, 3.0).unwrap();
        assert_eq!(spec.hop(), 64);
        assert!(!spec.set_resolution(64, 2.0).unwrap());
    }

    #[test]
    fn test_snap_nfft() {
        assert_eq!(snap_nfft(256), 256);
        assert_eq!(snap_nfft(300), 256);
        assert_eq!(snap_nfft(400), 512);
        assert_eq!(snap_nfft(1), 1);
    }

    #[test]
    fn test_zero_padded_at_end() {
        let mut spec = SpectrogramSeries::new(tone_source(1, 1000.0, 1.0), &config(256)).unwrap();
        let frames = spec.frames();
        let window = spec.request_window(Window::new(frames - 5, 50)).unwrap();
        assert_eq!(window.end(), frames);
        let row = spec.read(frames - 1, 1, 0).unwrap();
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_lookahead_serves_scrolling() {
        let mut cfg = config(256);
        cfg.lookahead_seconds = 1.0;
        let mut spec = SpectrogramSeries::new(tone_source(4, 1000.0, 1.0), &cfg).unwrap();
        let window = spec.request_window(Window::new(0, 10)).unwrap();
        assert!(window.frames >= 10 + (RATE / 128.0) as usize);
        spec.request_window(Window::new(30, 10)).unwrap();
        assert_eq!(spec.recompute_count(), 1);
    }

    #[test]
    fn test_resolution_change_leaves_upstream_clean() {
        let source = tone_source(2, 1000.0, 1.0);
        let filtered =
            shared(FilteredSeries::new(source, &FilterConfig::band(200.0, 3000.0)).unwrap());
        let mut spec = SpectrogramSeries::new(filtered.clone(), &config(256)).unwrap();
        spec.request_window(Window::new(0, 40)).unwrap();
        let filtered_recomputes = filtered.borrow().recompute_count();

        spec.set_resolution(512, 0.25).unwrap();
        assert!(!filtered.borrow().is_dirty());
        assert_eq!(filtered.borrow().version(0), 0);
        spec.request_window(Window::new(0, 40)).unwrap();
        assert_eq!(spec.freq_bins(), 257);
        assert_eq!(spec.read(0, 40, 0).unwrap().len(), 40 * 257);
        // The longer frames need more upstream, but only as a window move.
        assert_eq!(filtered.borrow().recompute_count(), filtered_recomputes + 1);
        assert_eq!(filtered.borrow().version(0), 0);
    }

    #[test]
    fn test_color_range_tracks_level() {
        let quiet_source = tone_source(1, 1000.0, 0.01);
        let loud_source = {
            // Broadband content raises the top bins.
            let frames = RATE as usize;
            let noise: Vec<f32> = (0..frames)
                .map(|i| ((i * 7919 % 1000) as f32 / 500.0 - 1.0) * 0.5)
                .collect();
            let memory = MemorySource::new(RATE, vec![noise]).unwrap();
            shared(SourceSeries::new(Box::new(memory), ReadaheadConfig::none()).unwrap())
        };

        let mut quiet = SpectrogramSeries::new(quiet_source, &config(256)).unwrap();
        let mut loud = SpectrogramSeries::new(loud_source, &config(256)).unwrap();
        assert!(quiet.color_range().is_none());

        quiet.request_window(Window::new(0, 40)).unwrap();
        loud.request_window(Window::new(0, 40)).unwrap();
        let (qmin, qmax) = quiet.color_range().unwrap();
        let (lmin, _) = loud.color_range().unwrap();
        assert_abs_diff_eq!(qmax - qmin, COLOR_RANGE_DB, epsilon = 1e-3);
        assert!(lmin > qmin);
    }

    #[test]
    fn test_extent() {
        let mut spec = SpectrogramSeries::new(tone_source(2, 1000.0, 1.0), &config(256)).unwrap();
        spec.request_window(Window::new(10, 20)).unwrap();
        let extent = spec.extent();
        assert_eq!(extent.t_start, 10.0 * 128.0 / RATE);
        assert_eq!(extent.t_end, 30.0 * 128.0 / RATE);
        assert_eq!(extent.f_start, 0.0);
        assert_eq!(extent.f_end, RATE / 2.0);
    }
}
