//! Planar multichannel sample storage.

/// A `[frames, channels]` block of samples stored channel-major in one flat
/// allocation.
///
/// Channel `c` occupies `data[c * frames..(c + 1) * frames]`, so a single
/// channel is always a contiguous slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl SampleBuffer {
    /// Zero-filled buffer.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    /// Buffer with no frames.
    pub fn empty(channels: usize) -> Self {
        Self::new(channels, 0)
    }

    /// Build from one `Vec` per channel. Channels are truncated to the
    /// shortest one.
    pub fn from_planar(channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        let mut data = Vec::with_capacity(frames * channels.len());
        for channel in &channels {
            data.extend_from_slice(&channel[..frames]);
        }
        Self {
            data,
            channels: channels.len(),
            frames,
        }
    }

    /// Build from interleaved samples `[f0c0, f0c1, f1c0, ...]`.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Self {
        if channels == 0 {
            return Self::default();
        }
        let frames = samples.len() / channels;
        let mut buffer = Self::new(channels, frames);
        for (i, &sample) in samples[..frames * channels].iter().enumerate() {
            buffer.set(i / channels, i % channels, sample);
        }
        buffer
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Contiguous samples of one channel.
    ///
    /// # Panics
    /// If `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> f32 {
        self.data[channel * self.frames + frame]
    }

    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        self.data[channel * self.frames + frame] = value;
    }

    /// Copy of frames `[start, start + len)`, clamped to the buffer.
    pub fn slice(&self, start: usize, len: usize) -> SampleBuffer {
        let start = start.min(self.frames);
        let len = len.min(self.frames - start);
        let mut out = Self::new(self.channels, len);
        for c in 0..self.channels {
            out.channel_mut(c)
                .copy_from_slice(&self.channel(c)[start..start + len]);
        }
        out
    }

    /// Keep only the first `frames` frames.
    pub fn truncate(&mut self, frames: usize) {
        if frames >= self.frames {
            return;
        }
        let mut data = Vec::with_capacity(frames * self.channels);
        for c in 0..self.channels {
            let start = c * self.frames;
            data.extend_from_slice(&self.data[start..start + frames]);
        }
        self.data = data;
        self.frames = frames;
    }

    /// Interleaved copy `[f0c0, f0c1, f1c0, ...]`.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for frame in 0..self.frames {
            for c in 0..self.channels {
                out.push(self.get(frame, c));
            }
        }
        out
    }

    /// Largest absolute sample over all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |a, s| a.max(s.abs()))
    }
}
