//! Out-of-core WAV source.
//!
//! Only the requested window is decoded: every read seeks the underlying
//! `hound` reader to the first frame and decodes `nframes * channels`
//! samples. Integer PCM is normalized to `[-1.0, 1.0)`.

use crate::source::{clamp_range, ReadStats};
use crate::{Error, RandomAccessSource, Result, SampleBuffer};
use hound::{SampleFormat, WavReader, WavSpec};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct WavSource {
    path: PathBuf,
    reader: Option<WavReader<BufReader<File>>>,
    spec: WavSpec,
    frames: usize,
    stats: ReadStats,
}

impl WavSource {
    /// Open a WAV file for windowed reading.
    ///
    /// Fails with [`Error::Open`] when the file is missing, not a WAV file,
    /// uses an unsupported sample format, or contains no frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path).map_err(|e| Error::open(&path, e))?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(Error::open(&path, "file declares zero channels"));
        }
        if spec.sample_rate == 0 {
            return Err(Error::open(&path, "file declares a zero sample rate"));
        }
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) | (SampleFormat::Int, 8..=32) => {}
            (format, bits) => {
                return Err(Error::open(
                    &path,
                    Error::UnsupportedFormat(format!("{format:?} with {bits} bits per sample")),
                ));
            }
        }

        let frames = reader.duration() as usize;
        if frames == 0 {
            return Err(Error::open(&path, "file contains no sample frames"));
        }

        debug!(
            path = %path.display(),
            rate = spec.sample_rate,
            channels = spec.channels,
            frames,
            "opened wav source"
        );

        Ok(Self {
            path,
            reader: Some(reader),
            spec,
            frames,
            stats: ReadStats::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }
}

impl RandomAccessSource for WavSource {
    fn rate(&self) -> f64 {
        self.spec.sample_rate as f64
    }

    fn frames(&self) -> usize {
        self.frames
    }

    fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    fn read_window(&mut self, offset: usize, nframes: usize) -> Result<SampleBuffer> {
        let channels = self.spec.channels as usize;
        let reader = self.reader.as_mut().ok_or(Error::Closed)?;

        let (start, len) = clamp_range(offset, nframes, self.frames);
        if len == 0 {
            return Ok(SampleBuffer::empty(channels));
        }

        reader.seek(start as u32)?;

        let total = len * channels;
        let mut buffer = SampleBuffer::new(channels, len);
        let mut decoded = 0usize;

        match self.spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.samples::<f32>().take(total) {
                    buffer.set(decoded / channels, decoded % channels, sample?);
                    decoded += 1;
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample - 1)) as f32;
                for sample in reader.samples::<i32>().take(total) {
                    buffer.set(
                        decoded / channels,
                        decoded % channels,
                        sample? as f32 * scale,
                    );
                    decoded += 1;
                }
            }
        }

        // A truncated data chunk ends early; expose only the complete frames.
        let complete = decoded / channels;
        if complete < len {
            debug!(
                path = %self.path.display(),
                requested = len,
                complete,
                "short read from wav source"
            );
            buffer.truncate(complete);
        }

        self.stats.record(buffer.frames());
        Ok(buffer)
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(path = %self.path.display(), "closed wav source");
        }
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    fn try_clone_reader(&self) -> Result<Box<dyn RandomAccessSource + Send>> {
        Ok(Box::new(WavSource::open(&self.path)?))
    }

    fn stats(&self) -> ReadStats {
        self.stats
    }
}
