//! Band-limited copy of an upstream series.
//!
//! Each channel carries its own Butterworth design. Values are computed with
//! zero-phase filtering over the window plus a margin on both sides, and the
//! margin is trimmed off before storing, so edge transients never reach the
//! exposed window.

use crate::series::{stale_channels, upstream_layout};
use crate::{Error, FilterConfig, Result, Series, SeriesBuffer, SharedSeries, Window};
use audian_dsp::{filtfilt, FilterKind, SosFilter};
use tracing::{debug, trace};

pub struct FilteredSeries {
    upstream: SharedSeries,
    rate: f64,
    frames: usize,
    channels: usize,
    order: usize,
    margin: usize,
    filters: Vec<SosFilter>,
    versions: Vec<u64>,
    dirty: Vec<bool>,
    seen: Vec<u64>,
    buffer: SeriesBuffer,
    recomputes: u64,
    channel_recomputes: Vec<u64>,
}

impl FilteredSeries {
    /// Wrap `upstream`, applying `config`'s cutoffs to every channel.
    pub fn new(upstream: SharedSeries, config: &FilterConfig) -> Result<Self> {
        let (rate, frames, channels) = upstream_layout(&upstream)?;
        let filter = design(config.highpass, config.lowpass_at(rate), config.order, rate)?;

        Ok(Self {
            upstream,
            rate,
            frames,
            channels,
            order: config.order,
            margin: config.margin_frames(rate),
            filters: vec![filter; channels],
            versions: vec![0; channels],
            dirty: vec![true; channels],
            seen: vec![0; channels],
            buffer: SeriesBuffer::new(channels, 1),
            recomputes: 0,
            channel_recomputes: vec![0; channels],
        })
    }

    /// Set the cutoffs of one channel.
    ///
    /// `highpass == 0` disables the high-pass and `lowpass >= rate / 2`
    /// disables the low-pass. Returns whether anything changed; on error the
    /// channel keeps its previous filter and values.
    pub fn set_filter(&mut self, channel: usize, highpass: f64, lowpass: f64) -> Result<bool> {
        if channel >= self.channels {
            return Err(Error::ChannelOutOfRange {
                channel,
                channels: self.channels,
            });
        }
        let filter = design(highpass, lowpass, self.order, self.rate)?;
        Ok(self.install(channel, filter))
    }

    /// Set the same cutoffs on every channel. Validation happens once, so
    /// either all channels change or none do.
    pub fn set_filter_all(&mut self, highpass: f64, lowpass: f64) -> Result<bool> {
        let filter = design(highpass, lowpass, self.order, self.rate)?;
        let mut changed = false;
        for channel in 0..self.channels {
            changed |= self.install(channel, filter.clone());
        }
        Ok(changed)
    }

    fn install(&mut self, channel: usize, filter: SosFilter) -> bool {
        if self.filters[channel].kind() == filter.kind() {
            return false;
        }
        debug!(channel, kind = ?filter.kind(), "filter changed");
        self.filters[channel] = filter;
        self.dirty[channel] = true;
        self.versions[channel] += 1;
        true
    }

    /// Current response of a channel.
    pub fn filter_kind(&self, channel: usize) -> Option<FilterKind> {
        self.filters.get(channel).map(SosFilter::kind)
    }

    /// `(highpass, lowpass)` of a channel, with disabled sides reported as 0
    /// and Nyquist.
    pub fn cutoffs(&self, channel: usize) -> Option<(f64, f64)> {
        let nyquist = self.rate / 2.0;
        self.filter_kind(channel).map(|kind| match kind {
            FilterKind::PassThrough => (0.0, nyquist),
            FilterKind::Lowpass { cutoff } => (0.0, cutoff),
            FilterKind::Highpass { cutoff } => (cutoff, nyquist),
            FilterKind::Bandpass { low, high } => (low, high),
        })
    }

    /// Recompute passes that touched `channel`.
    pub fn channel_recompute_count(&self, channel: usize) -> u64 {
        self.channel_recomputes.get(channel).copied().unwrap_or(0)
    }

    /// Margin in frames on each side.
    pub fn margin(&self) -> usize {
        self.margin
    }

    fn recompute(&mut self, window: Window, channels: Vec<usize>) -> Result<()> {
        let up = self.upstream_window(window);
        let available = self.upstream.borrow_mut().request_window(up)?;
        let up = up.intersect(&available);
        let window = window.intersect(&up);

        let channels = if window == self.buffer.window() {
            channels
        } else {
            self.buffer.reset(window);
            (0..self.channels).collect()
        };

        let upstream = self.upstream.borrow();
        let skip = window.offset - up.offset;
        for &c in &channels {
            let input = upstream.read(up.offset, up.frames, c)?;
            let output = filtfilt(&self.filters[c], input);
            self.buffer
                .channel_mut(c)
                .copy_from_slice(&output[skip..skip + window.frames]);
            self.dirty[c] = false;
            self.seen[c] = upstream.version(c);
            self.channel_recomputes[c] += 1;
        }
        self.recomputes += 1;

        debug!(window = %window, upstream = %up, ?channels, "filtered recompute");
        Ok(())
    }
}

fn design(highpass: f64, lowpass: f64, order: usize, rate: f64) -> Result<SosFilter> {
    let kind = FilterKind::from_cutoffs(highpass, lowpass, rate)
        .map_err(|e| Error::InvalidFilter(e.to_string()))?;
    SosFilter::butterworth(kind, order, rate).map_err(|e| Error::InvalidFilter(e.to_string()))
}

impl Series for FilteredSeries {
    fn kind(&self) -> &'static str {
        "filtered"
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn frames(&self) -> usize {
        self.frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn window(&self) -> Window {
        self.buffer.window()
    }

    fn upstream_window(&self, window: Window) -> Window {
        if window.is_empty() {
            return window;
        }
        window.expand(self.margin, self.margin).clamp(self.frames)
    }

    fn request_window(&mut self, window: Window) -> Result<Window> {
        let want = window.clamp(self.frames);
        if want.is_empty() {
            return Ok(want);
        }

        let stale = stale_channels(&self.dirty, &self.seen, &*self.upstream.borrow());
        let current = self.buffer.window();
        if current.contains(&want) {
            if stale.is_empty() {
                trace!(window = %want, "filtered window cached");
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
        self.versions.get(channel).copied().unwrap_or(0) + self.upstream.borrow().version(channel)
    }

    fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}
