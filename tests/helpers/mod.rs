//! Test helpers and fixtures for Audian integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (pass-through)
//! - `DSP_EPSILON` (1e-4): Filtering over different margins
//! - `STOPBAND_RMS` (0.01): Residue of a tone outside the passband

#![allow(dead_code)]

pub mod tolerances;

use audian::prelude::*;
use audian::analysis::OverviewConfig;
use audian::dsp::Stft;
use std::path::{Path, PathBuf};

/// Default test sample rate
pub const TEST_SAMPLE_RATE: f64 = 44100.0;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 4.0 - 1.0
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Frequency of the strongest bin of a single Hann-windowed spectrum of
/// the first `nfft` samples.
pub fn dominant_frequency(samples: &[f32], sample_rate: f64, nfft: usize) -> f64 {
    let mut stft = Stft::new(nfft, nfft, sample_rate).expect("valid stft");
    let mut power = vec![0.0f32; stft.freq_bins()];
    stft.power_frame(&samples[..nfft.min(samples.len())], &mut power);
    let (bin, _) = power
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, f32::MIN), |best, (k, &p)| if p > best.1 { (k, p) } else { best });
    stft.bin_frequency(bin)
}

/// Config with the overview worker off, so tests stay single-threaded
/// unless they ask for it.
pub fn quiet_config() -> AudianConfig {
    AudianConfig {
        overview: OverviewConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// In-memory pipeline over the given channels.
pub fn memory_pipeline(sample_rate: f64, channels: Vec<Vec<f32>>, config: AudianConfig) -> DataPipeline {
    let source = MemorySource::new(sample_rate, channels).expect("valid source");
    DataPipeline::builder()
        .config(config)
        .open_source(Box::new(source))
        .expect("pipeline opens")
}

/// The same 1 kHz tone on two channels.
pub fn tone_pipeline(seconds: usize) -> DataPipeline {
    let tone = generate_sine(1000.0, TEST_SAMPLE_RATE, seconds * TEST_SAMPLE_RATE as usize);
    memory_pipeline(TEST_SAMPLE_RATE, vec![tone.clone(), tone], quiet_config())
}

/// Write planar channels to a 16-bit WAV file.
pub fn write_test_wav(dir: &Path, name: &str, sample_rate: u32, channels: &[Vec<f32>]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for frame in 0..channels[0].len() {
        for channel in channels {
            let sample = (channel[frame].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(sample).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
    path
}
