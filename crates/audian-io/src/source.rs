//! The random-access source contract.

use crate::{Result, SampleBuffer};

/// A multichannel sample sequence of known rate, length and width that can be
/// read in arbitrary windows.
///
/// Implementations may over-read and cache internally; callers only rely on
/// `read_window` returning exactly the clamped range they asked for.
pub trait RandomAccessSource {
    /// Sample rate in Hz.
    fn rate(&self) -> f64;

    /// Total number of frames.
    fn frames(&self) -> usize;

    fn channels(&self) -> usize;

    /// Read frames `[offset, offset + nframes)` clamped to `[0, frames)`.
    ///
    /// A range that lies entirely outside the source returns an empty buffer.
    fn read_window(&mut self, offset: usize, nframes: usize) -> Result<SampleBuffer>;

    /// Release file handles. Calling it again is a no-op.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Open an independent reader over the same data, for work that runs off
    /// the calling thread.
    fn try_clone_reader(&self) -> Result<Box<dyn RandomAccessSource + Send>>;

    fn stats(&self) -> ReadStats {
        ReadStats::default()
    }

    /// Duration in seconds.
    fn duration(&self) -> f64 {
        self.frames() as f64 / self.rate()
    }
}

/// Read counters for a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Number of non-empty reads
    pub reads: u64,
    /// Total frames delivered
    pub frames_read: u64,
}

impl ReadStats {
    pub(crate) fn record(&mut self, frames: usize) {
        if frames > 0 {
            self.reads += 1;
            self.frames_read += frames as u64;
        }
    }
}

/// Clamp `[offset, offset + nframes)` to `[0, total)`.
///
/// Returns `(start, len)`; `len` is zero when the range misses entirely.
pub fn clamp_range(offset: usize, nframes: usize, total: usize) -> (usize, usize) {
    let start = offset.min(total);
    let end = offset.saturating_add(nframes).min(total);
    (start, end - start)
}
