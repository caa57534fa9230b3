//! The raw-sample series at the root of every graph.

use crate::{Error, ReadaheadConfig, Result, Series, SeriesBuffer, Window};
use audian_io::{RandomAccessSource, ReadStats};
use tracing::{debug, trace};

/// Exposes a [`RandomAccessSource`] as a [`Series`].
///
/// Requests that are not covered read the window plus the configured
/// readahead, aligned to whole chunks, in one `read_window` call. Source
/// values never go stale, so `version` is always 0.
pub struct SourceSeries {
    source: Box<dyn RandomAccessSource>,
    rate: f64,
    frames: usize,
    channels: usize,
    readahead: ReadaheadConfig,
    buffer: SeriesBuffer,
    loads: u64,
}

impl SourceSeries {
    pub fn new(source: Box<dyn RandomAccessSource>, readahead: ReadaheadConfig) -> Result<Self> {
        let rate = source.rate();
        let frames = source.frames();
        let channels = source.channels();
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidSource(format!("sample rate {rate}")));
        }
        if frames == 0 || channels == 0 {
            return Err(Error::InvalidSource(format!(
                "{channels} channels with {frames} frames"
            )));
        }

        Ok(Self {
            source,
            rate,
            frames,
            channels,
            readahead,
            buffer: SeriesBuffer::new(channels, 1),
            loads: 0,
        })
    }

    pub fn source(&self) -> &dyn RandomAccessSource {
        self.source.as_ref()
    }

    /// Independent reader over the same recording.
    pub fn try_clone_reader(&self) -> Result<Box<dyn RandomAccessSource + Send>> {
        Ok(self.source.try_clone_reader()?)
    }

    pub fn read_stats(&self) -> ReadStats {
        self.source.stats()
    }

    /// Close the underlying source and drop the buffer. Idempotent.
    pub fn close(&mut self) {
        self.source.close();
        self.buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_closed()
    }

    fn load(&mut self, want: Window) -> Result<()> {
        let (offset, frames) = self.readahead.expand(want.offset, want.frames, self.rate);
        let load = Window::new(offset, frames).clamp(self.frames);
        let data = self.source.read_window(load.offset, load.frames)?;

        let loaded = Window::new(load.offset, data.frames());
        self.buffer.reset(loaded);
        for c in 0..self.channels {
            self.buffer.channel_mut(c).copy_from_slice(data.channel(c));
        }
        self.loads += 1;

        debug!(
            requested = %want,
            loaded = %loaded,
            "source window loaded"
        );
        Ok(())
    }
}

impl Series for SourceSeries {
    fn kind(&self) -> &'static str {
        "source"
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
        window.clamp(self.frames)
    }

    fn request_window(&mut self, window: Window) -> Result<Window> {
        let want = window.clamp(self.frames);
        if self.buffer.window().contains(&want) {
            trace!(window = %want, "source window cached");
            return Ok(self.buffer.window());
        }
        self.load(want)?;
        Ok(self.buffer.window())
    }

    fn read(&self, offset: usize, frames: usize, channel: usize) -> Result<&[f32]> {
        self.buffer.read(offset, frames, channel)
    }

    fn is_dirty(&self) -> bool {
        false
    }

    fn version(&self, _channel: usize) -> u64 {
        0
    }

    fn recompute_count(&self) -> u64 {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audian_io::MemorySource;

    fn ramp(frames: usize) -> Box<dyn RandomAccessSource> {
        let ch0: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        let ch1: Vec<f32> = (0..frames).map(|i| -(i as f32)).collect();
        Box::new(MemorySource::new(100.0, vec![ch0, ch1]).unwrap())
    }

    #[test]
    fn test_request_then_read() {
        let mut series = SourceSeries::new(ramp(1000), ReadaheadConfig::none()).unwrap();
        let window = series.request_window(Window::new(100, 50)).unwrap();
        assert_eq!(window, Window::new(100, 50));
        assert_eq!(series.read(120, 2, 1).unwrap(), &[-120.0, -121.0]);
        assert!(series.read(99, 2, 0).is_err());
    }

    #[test]
    fn test_readahead_serves_forward_scroll() {
        let readahead = ReadaheadConfig {
            seconds_before: 0.0,
            seconds_after: 1.0,
            chunk_frames: 1,
        };
        let mut series = SourceSeries::new(ramp(1000), readahead).unwrap();
        series.request_window(Window::new(0, 50)).unwrap();
        series.request_window(Window::new(60, 50)).unwrap();
        assert_eq!(series.recompute_count(), 1);
        assert_eq!(series.read_stats().reads, 1);
    }

    #[test]
    fn test_clamps_at_end() {
        let mut series = SourceSeries::new(ramp(1000), ReadaheadConfig::default()).unwrap();
        let window = series.request_window(Window::new(990, 100)).unwrap();
        assert_eq!(window.end(), 1000);
        assert_eq!(series.read(999, 1, 0).unwrap(), &[999.0]);

        let beyond = series.request_window(Window::new(5000, 10)).unwrap();
        assert_eq!(series.recompute_count(), 1);
        assert!(beyond.contains(&Window::new(5000, 10).clamp(1000)));
    }

    #[test]
    fn test_closed_source_errors() {
        let mut series = SourceSeries::new(ramp(100), ReadaheadConfig::none()).unwrap();
        series.close();
        series.close();
        assert!(series.is_closed());
        assert!(matches!(
            series.request_window(Window::new(0, 10)),
            Err(Error::Source(audian_io::Error::Closed))
        ));
    }
}
