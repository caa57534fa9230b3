//! Amplitude envelope.
//!
//! `envelope(t) = sqrt(2) * lowpass(|x(t)|)` with a second-order Butterworth
//! low-pass applied forward and backward. A sine of amplitude `A` settles at
//! `A * 2 * sqrt(2) / pi`, about `0.9 * A`.

use crate::series::{stale_channels, upstream_layout};
use crate::{
    seconds_to_frames, EnvelopeConfig, Error, Result, Series, SeriesBuffer, SharedSeries, Window,
};
use audian_dsp::{decimate, decimated_len, filtfilt, FilterKind, SosFilter};
use std::f32::consts::SQRT_2;
use tracing::{debug, trace};

const ENVELOPE_ORDER: usize = 2;

/// Highest configured cutoff accepted at construction, as a fraction of the
/// upstream rate.
const MAX_CUTOFF_FRACTION: f64 = 0.45;

pub struct EnvelopeSeries {
    upstream: SharedSeries,
    source_rate: f64,
    source_frames: usize,
    channels: usize,
    config: EnvelopeConfig,
    cutoff: f64,
    filter: SosFilter,
    step: usize,
    version: u64,
    dirty: Vec<bool>,
    seen: Vec<u64>,
    buffer: SeriesBuffer,
    recomputes: u64,
}

impl EnvelopeSeries {
    pub fn new(upstream: SharedSeries, config: &EnvelopeConfig) -> Result<Self> {
        let (source_rate, source_frames, channels) = upstream_layout(&upstream)?;
        let cutoff = fit_cutoff(config.cutoff, source_rate);
        let filter = design(cutoff, source_rate)?;

        Ok(Self {
            upstream,
            source_rate,
            source_frames,
            channels,
            config: *config,
            cutoff,
            filter,
            step: config.step(cutoff, source_rate),
            version: 0,
            dirty: vec![true; channels],
            seen: vec![0; channels],
            buffer: SeriesBuffer::new(channels, 1),
            recomputes: 0,
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Decimation step relative to the upstream.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Change the smoothing cutoff.
    ///
    /// With downsampling enabled the step may change too, which moves the
    /// frame axis and drops the buffered window. Returns whether anything
    /// changed.
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<bool> {
        let filter = design(cutoff, self.source_rate)?;
        if cutoff == self.cutoff {
            return Ok(false);
        }

        let step = self.config.step(cutoff, self.source_rate);
        if step != self.step {
            self.step = step;
            self.buffer.clear();
        }
        self.cutoff = cutoff;
        self.filter = filter;
        self.dirty.fill(true);
        self.version += 1;

        debug!(cutoff, step, "envelope cutoff changed");
        Ok(true)
    }

    fn upstream_range(&self, window: Window) -> Window {
        if window.is_empty() {
            return Window::new(window.offset * self.step, 0);
        }
        let start = window.offset * self.step;
        let end = (window.end() - 1) * self.step + 1;
        let before = seconds_to_frames(self.config.margin_before, self.source_rate);
        let after = seconds_to_frames(self.config.margin_after, self.source_rate);
        Window::from_range(start, end)
            .expand(before, after)
            .clamp(self.source_frames)
    }

    fn recompute(&mut self, window: Window, channels: Vec<usize>) -> Result<()> {
        let up = self.upstream_range(window);
        let available = self.upstream.borrow_mut().request_window(up)?;
        let up = up.intersect(&available);

        // Keep only envelope frames whose upstream sample was delivered.
        let first = up.offset.div_ceil(self.step);
        let last = up.end().div_ceil(self.step);
        let window = window.intersect(&Window::from_range(first, last));

        let channels = if window == self.buffer.window() {
            channels
        } else {
            self.buffer.reset(window);
            (0..self.channels).collect()
        };

        let upstream = self.upstream.borrow();
        for &c in &channels {
            let rectified: Vec<f32> = upstream
                .read(up.offset, up.frames, c)?
                .iter()
                .map(|s| s.abs())
                .collect();
            let smoothed = filtfilt(&self.filter, &rectified);
            let kept = decimate(&smoothed[window.offset * self.step - up.offset..], self.step);

            let out = self.buffer.channel_mut(c);
            for (value, sample) in out.iter_mut().zip(kept) {
                *value = SQRT_2 * sample;
            }
            self.dirty[c] = false;
            self.seen[c] = upstream.version(c);
        }
        self.recomputes += 1;

        debug!(window = %window, upstream = %up, step = self.step, "envelope recompute");
        Ok(())
    }
}

/// Pull a configured cutoff at or near Nyquist down to
/// `MAX_CUTOFF_FRACTION * rate`, so a default config opens low-rate files.
fn fit_cutoff(cutoff: f64, rate: f64) -> f64 {
    let limit = MAX_CUTOFF_FRACTION * rate;
    if cutoff.is_finite() && cutoff > limit {
        debug!(configured = cutoff, cutoff = limit, "envelope cutoff lowered below Nyquist");
        limit
    } else {
        cutoff
    }
}

fn design(cutoff: f64, rate: f64) -> Result<SosFilter> {
    if !cutoff.is_finite() || cutoff <= 0.0 || cutoff >= rate / 2.0 {
        return Err(Error::InvalidFilter(format!(
            "envelope cutoff {cutoff} Hz outside (0, {}) Hz",
            rate / 2.0
        )));
    }
    SosFilter::butterworth(FilterKind::Lowpass { cutoff }, ENVELOPE_ORDER, rate)
        .map_err(|e| Error::InvalidFilter(e.to_string()))
}

impl Series for EnvelopeSeries {
    fn kind(&self) -> &'static str {
        "envelope"
    }

    fn rate(&self) -> f64 {
        self.source_rate / self.step as f64
    }

    fn frames(&self) -> usize {
        decimated_len(self.source_frames, self.step)
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn window(&self) -> Window {
        self.buffer.window()
    }

    fn upstream_window(&self, window: Window) -> Window {
        self.upstream_range(window.clamp(self.frames()))
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
                trace!(window = %want, "envelope window cached");
                return Ok(current);
            }
            self.recompute(current, stale)?;
        } else {
            self.recompute(want, (0..self.channels).collect())?;
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
