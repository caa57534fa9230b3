//! WAV region writer.
//!
//! Writes a contiguous multichannel block to disk, e.g. a selected time range
//! or a computed envelope.

use crate::{Error, Result, SampleBuffer};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;

/// Output sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Int16,
    Int24,
    Float32,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }

    fn spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bits(),
            sample_format: match self {
                BitDepth::Float32 => SampleFormat::Float,
                _ => SampleFormat::Int,
            },
        }
    }
}

/// Write `buffer` to a WAV file at `path`.
///
/// Samples are expected in `[-1.0, 1.0]`; integer encodings clip outside it.
pub fn write_wav(
    path: impl AsRef<Path>,
    buffer: &SampleBuffer,
    sample_rate: u32,
    bit_depth: BitDepth,
) -> Result<()> {
    if buffer.channels() == 0 || buffer.channels() > u16::MAX as usize {
        return Err(Error::InvalidData(format!(
            "cannot write {} channels",
            buffer.channels()
        )));
    }
    if sample_rate == 0 {
        return Err(Error::InvalidData("sample rate must be positive".into()));
    }

    let spec = bit_depth.spec(buffer.channels() as u16, sample_rate);
    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    write_samples(&mut writer, buffer, bit_depth)?;
    writer.finalize()?;
    Ok(())
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    buffer: &SampleBuffer,
    bit_depth: BitDepth,
) -> Result<()> {
    for frame in 0..buffer.frames() {
        for c in 0..buffer.channels() {
            let sample = buffer.get(frame, c);
            match bit_depth {
                BitDepth::Int16 => writer.write_sample(float_to_int(sample, 16) as i16)?,
                BitDepth::Int24 => writer.write_sample(float_to_int(sample, 24))?,
                BitDepth::Float32 => writer.write_sample(sample)?,
            }
        }
    }
    Ok(())
}

#[inline]
fn float_to_int(sample: f32, bits: u32) -> i32 {
    let max = ((1i64 << (bits - 1)) - 1) as f32;
    (sample.clamp(-1.0, 1.0) * max).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_int_clips() {
        assert_eq!(float_to_int(2.0, 16), 32767);
        assert_eq!(float_to_int(-2.0, 16), -32767);
        assert_eq!(float_to_int(0.0, 24), 0);
    }

    #[test]
    fn test_write_and_reread_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region.wav");
        let buffer = SampleBuffer::from_planar(vec![vec![0.5; 64], vec![-0.5; 64], vec![0.0; 64]]);
        write_wav(&path, &buffer, 22050, BitDepth::Int24).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 3);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(reader.duration(), 64);
    }

    #[test]
    fn test_rejects_empty_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        assert!(write_wav(&path, &SampleBuffer::default(), 44100, BitDepth::Int16).is_err());
        let buffer = SampleBuffer::new(1, 4);
        assert!(write_wav(&path, &buffer, 0, BitDepth::Int16).is_err());
    }
}
