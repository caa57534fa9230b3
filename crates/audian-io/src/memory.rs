//! In-memory sample source.

use crate::source::{clamp_range, ReadStats};
use crate::{Error, RandomAccessSource, Result, SampleBuffer};
use std::sync::Arc;

/// Planar samples held in memory.
///
/// The sample data is shared, so cloning (and [`try_clone_reader`]) never
/// copies it.
///
/// [`try_clone_reader`]: RandomAccessSource::try_clone_reader
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[f32]>,
    rate: f64,
    channels: usize,
    frames: usize,
    closed: bool,
    stats: ReadStats,
}

impl MemorySource {
    /// Create a source from one `Vec` per channel.
    ///
    /// All channels must have the same, non-zero length and the rate must be
    /// positive and finite.
    pub fn new(rate: f64, channels: Vec<Vec<f32>>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::InvalidData("no channels".into()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Error::InvalidData(
                "channels have different lengths".into(),
            ));
        }
        Self::from_buffer(rate, SampleBuffer::from_planar(channels))
    }

    pub fn from_buffer(rate: f64, buffer: SampleBuffer) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidData(format!("invalid sample rate {rate}")));
        }
        if buffer.channels() == 0 || buffer.is_empty() {
            return Err(Error::InvalidData("source has no samples".into()));
        }
        let channels = buffer.channels();
        let frames = buffer.frames();
        let mut data = Vec::with_capacity(channels * frames);
        for c in 0..channels {
            data.extend_from_slice(buffer.channel(c));
        }
        Ok(Self {
            data: data.into(),
            rate,
            channels,
            frames,
            closed: false,
            stats: ReadStats::default(),
        })
    }
}

impl RandomAccessSource for MemorySource {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn frames(&self) -> usize {
        self.frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn read_window(&mut self, offset: usize, nframes: usize) -> Result<SampleBuffer> {
        if self.closed {
            return Err(Error::Closed);
        }
        let (start, len) = clamp_range(offset, nframes, self.frames);
        let mut buffer = SampleBuffer::new(self.channels, len);
        for c in 0..self.channels {
            let base = c * self.frames + start;
            buffer
                .channel_mut(c)
                .copy_from_slice(&self.data[base..base + len]);
        }
        self.stats.record(len);
        Ok(buffer)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn try_clone_reader(&self) -> Result<Box<dyn RandomAccessSource + Send>> {
        if self.closed {
            return Err(Error::Closed);
        }
        let mut reader = self.clone();
        reader.stats = ReadStats::default();
        Ok(Box::new(reader))
    }

    fn stats(&self) -> ReadStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_source() -> MemorySource {
        let ch0: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let ch1: Vec<f32> = (0..100).map(|i| -(i as f32)).collect();
        MemorySource::new(100.0, vec![ch0, ch1]).unwrap()
    }

    #[test]
    fn test_read_inside() {
        let mut source = ramp_source();
        let buffer = source.read_window(10, 5).unwrap();
        assert_eq!(buffer.channel(0), &[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(buffer.channel(1), &[-10.0, -11.0, -12.0, -13.0, -14.0]);
    }

    #[test]
    fn test_read_clamped_at_end() {
        let mut source = ramp_source();
        let buffer = source.read_window(90, 100).unwrap();
        assert_eq!(buffer.frames(), 10);
        assert_eq!(buffer.get(9, 0), 99.0);
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let mut source = ramp_source();
        let buffer = source.read_window(500, 10).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.channels(), 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(MemorySource::new(0.0, vec![vec![0.0; 10]]).is_err());
        assert!(MemorySource::new(44100.0, vec![]).is_err());
        assert!(MemorySource::new(44100.0, vec![vec![0.0; 10], vec![0.0; 9]]).is_err());
        assert!(MemorySource::new(44100.0, vec![vec![]]).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = ramp_source();
        source.close();
        source.close();
        assert!(source.is_closed());
        assert!(matches!(source.read_window(0, 1), Err(Error::Closed)));
    }

    #[test]
    fn test_stats_count_reads() {
        let mut source = ramp_source();
        source.read_window(0, 10).unwrap();
        source.read_window(95, 10).unwrap();
        source.read_window(200, 10).unwrap();
        let stats = source.stats();
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.frames_read, 15);
    }
}
