//! The buffered series contract.

use crate::{Result, Window};
use std::cell::RefCell;
use std::rc::Rc;

/// A series shared between its consumers in a single-threaded graph.
pub type SharedSeries = Rc<RefCell<dyn Series>>;

/// Wrap a series for sharing. The typed handle coerces to [`SharedSeries`].
pub fn shared<S: Series + 'static>(series: S) -> Rc<RefCell<S>> {
    Rc::new(RefCell::new(series))
}

/// A lazily materialized, windowed cache of values over time.
///
/// A series covers `frames()` frames at `rate()` Hz, each frame carrying
/// `frame_shape()` values per channel. Only the frames of `window()` are
/// held in memory; [`request_window`](Series::request_window) moves or
/// refreshes it and [`read`](Series::read) serves sub-ranges of it.
pub trait Series {
    /// Short static name for diagnostics.
    fn kind(&self) -> &'static str;

    fn rate(&self) -> f64;

    fn frames(&self) -> usize;

    fn channels(&self) -> usize;

    /// Values per frame.
    fn frame_shape(&self) -> usize {
        1
    }

    /// Currently materialized frames.
    fn window(&self) -> Window;

    /// The upstream frames needed to compute `window`, margins included and
    /// clamped to the upstream length. Does not touch any buffer.
    fn upstream_window(&self, window: Window) -> Window;

    /// Make `window` (clamped to `frames()`) readable.
    ///
    /// Recomputes only when the window is not covered or values are stale;
    /// repeating a satisfied request does nothing. Returns the materialized
    /// window, which may be narrower than requested at a truncated file end.
    fn request_window(&mut self, window: Window) -> Result<Window>;

    /// `frames * frame_shape()` values of `channel` from absolute frame
    /// `offset`. Fails with `NotBuffered` outside the materialized window.
    fn read(&self, offset: usize, frames: usize, channel: usize) -> Result<&[f32]>;

    /// True when the next request will recompute regardless of coverage.
    fn is_dirty(&self) -> bool;

    /// Counter that changes whenever a parameter affecting `channel`
    /// changes, here or anywhere upstream.
    fn version(&self, channel: usize) -> u64;

    /// Number of recompute passes so far.
    fn recompute_count(&self) -> u64;

    /// First frame at or after time `t`, clamped to `[0, frames]`.
    fn time_to_frame(&self, t: f64) -> usize {
        let frame = (t * self.rate()).floor();
        if frame > 0.0 {
            (frame as usize).min(self.frames())
        } else {
            0
        }
    }

    fn frame_to_time(&self, frame: usize) -> f64 {
        frame as f64 / self.rate()
    }

    /// Frames covering the time span `[t0, t1)`, clamped.
    fn window_for(&self, t0: f64, t1: f64) -> Window {
        let end = (t1 * self.rate()).ceil();
        let end = if end > 0.0 {
            (end as usize).min(self.frames())
        } else {
            0
        };
        Window::from_range(self.time_to_frame(t0), end)
    }
}

/// Channels that must be recomputed: flagged locally, or computed against
/// an older upstream version.
pub(crate) fn stale_channels(dirty: &[bool], seen: &[u64], upstream: &dyn Series) -> Vec<usize> {
    (0..dirty.len().min(seen.len()))
        .filter(|&c| dirty[c] || upstream.version(c) != seen[c])
        .collect()
}

/// Check that an upstream is usable and report `(rate, frames, channels)`.
pub(crate) fn upstream_layout(upstream: &SharedSeries) -> Result<(f64, usize, usize)> {
    let upstream = upstream.borrow();
    let rate = upstream.rate();
    let frames = upstream.frames();
    let channels = upstream.channels();
    if !(rate.is_finite() && rate > 0.0) {
        return Err(crate::Error::InvalidSource(format!(
            "{} series has rate {rate}",
            upstream.kind()
        )));
    }
    if frames == 0 || channels == 0 {
        return Err(crate::Error::InvalidSource(format!(
            "{} series is empty",
            upstream.kind()
        )));
    }
    Ok((rate, frames, channels))
}
