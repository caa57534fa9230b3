//! Per-series materialized storage.

use crate::{Error, Result, Window};

/// Values of one series over its current [`Window`], one contiguous block per
/// channel.
///
/// Every frame carries `shape` values (1 for time series, the number of
/// frequency bins for spectrograms), so channel `c` holds
/// `window.frames * shape` values.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    data: Vec<f32>,
    channels: usize,
    shape: usize,
    window: Window,
}

impl SeriesBuffer {
    pub fn new(channels: usize, shape: usize) -> Self {
        Self {
            data: Vec::new(),
            channels,
            shape: shape.max(1),
            window: Window::default(),
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn shape(&self) -> usize {
        self.shape
    }

    /// Move to `window` with zeroed contents.
    pub fn reset(&mut self, window: Window) {
        self.window = window;
        self.data.clear();
        self.data.resize(self.channels * window.frames * self.shape, 0.0);
    }

    /// Drop everything; the window becomes empty.
    pub fn clear(&mut self) {
        self.reset(Window::new(self.window.offset, 0));
    }

    fn stride(&self) -> usize {
        self.window.frames * self.shape
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let stride = self.stride();
        &self.data[channel * stride..(channel + 1) * stride]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let stride = self.stride();
        &mut self.data[channel * stride..(channel + 1) * stride]
    }

    /// `frames * shape` values of `channel` starting at absolute frame
    /// `offset`.
    pub fn read(&self, offset: usize, frames: usize, channel: usize) -> Result<&[f32]> {
        if channel >= self.channels {
            return Err(Error::ChannelOutOfRange {
                channel,
                channels: self.channels,
            });
        }
        let wanted = Window::new(offset, frames);
        if !self.window.contains(&wanted) {
            return Err(Error::NotBuffered {
                offset,
                frames,
                window: self.window,
            });
        }
        if frames == 0 {
            return Ok(&[]);
        }
        let start = (offset - self.window.offset) * self.shape;
        Ok(&self.channel(channel)[start..start + frames * self.shape])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inside_window() {
        let mut buffer = SeriesBuffer::new(2, 1);
        buffer.reset(Window::new(100, 4));
        buffer.channel_mut(1).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.read(101, 2, 1).unwrap(), &[2.0, 3.0]);
        assert_eq!(buffer.read(100, 4, 0).unwrap(), &[0.0; 4]);
    }

    #[test]
    fn test_read_outside_window() {
        let mut buffer = SeriesBuffer::new(1, 1);
        buffer.reset(Window::new(100, 4));
        assert!(matches!(
            buffer.read(99, 2, 0),
            Err(Error::NotBuffered { .. })
        ));
        assert!(matches!(
            buffer.read(102, 3, 0),
            Err(Error::NotBuffered { .. })
        ));
        assert!(matches!(
            buffer.read(100, 1, 1),
            Err(Error::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_shaped_frames() {
        let mut buffer = SeriesBuffer::new(1, 3);
        buffer.reset(Window::new(10, 2));
        buffer
            .channel_mut(0)
            .copy_from_slice(&[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(buffer.read(11, 1, 0).unwrap(), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_clear_empties_window() {
        let mut buffer = SeriesBuffer::new(1, 1);
        buffer.reset(Window::new(10, 2));
        buffer.clear();
        assert!(buffer.window().is_empty());
        assert!(buffer.read(10, 1, 0).is_err());
        assert!(buffer.read(10, 0, 0).is_ok());
    }
}
