//! Pipelines over WAV files on disk.

mod helpers;

use approx::assert_abs_diff_eq;
use audian::graph::{ENVELOPE, FILTERED, SOURCE};
use audian::prelude::*;
use helpers::tolerances::*;
use helpers::*;

fn two_channel_file(dir: &std::path::Path) -> (std::path::PathBuf, Vec<Vec<f32>>) {
    let left: Vec<f32> = generate_sine(440.0, 8000.0, 8000 * 6)
        .iter()
        .map(|s| 0.5 * s)
        .collect();
    let right = generate_noise(8000 * 6, 11)
        .iter()
        .map(|s| 0.25 * s)
        .collect();
    let channels = vec![left, right];
    let path = write_test_wav(dir, "two_channel.wav", 8000, &channels);
    (path, channels)
}

#[test]
fn test_reads_match_file() {
    let dir = tempfile::tempdir().unwrap();
    let (path, channels) = two_channel_file(dir.path());
    let mut pipeline = DataPipeline::open(&path, &quiet_config()).unwrap();

    assert_eq!(pipeline.path(), Some(path.as_path()));
    assert_eq!(pipeline.rate(), 8000.0);
    assert_eq!(pipeline.channels(), 2);
    assert_eq!(pipeline.frames(), 48_000);

    for c in 0..2 {
        let read = pipeline.get_samples(SOURCE, c, 2.5, 3.5).unwrap();
        assert_eq!(read.len(), 8000);
        for (a, b) in read.iter().zip(&channels[c][20_000..28_000]) {
            assert_abs_diff_eq!(a, b, epsilon = 2.0 * INT16_EPSILON);
        }
    }
}

#[test]
fn test_never_reads_past_end() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = two_channel_file(dir.path());
    let mut pipeline = DataPipeline::open(&path, &quiet_config()).unwrap();

    let tail = pipeline.get_samples(FILTERED, 0, 5.5, 60.0).unwrap();
    assert_eq!(tail.len(), 4000);
    assert!(pipeline.source_stats().frames_read <= 48_000);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = DataPipeline::open(dir.path().join("absent.wav"), &AudianConfig::default());
    assert!(matches!(
        result,
        Err(Error::Source(audian::io::Error::Open { .. }))
    ));
}

#[test]
fn test_not_a_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"field notes, not audio").unwrap();
    assert!(DataPipeline::open(&path, &AudianConfig::default()).is_err());
}

#[test]
fn test_save_envelope_region() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = two_channel_file(dir.path());
    let mut config = quiet_config();
    config.envelope.cutoff = 50.0;
    let mut pipeline = DataPipeline::open(&path, &config).unwrap();

    let out = dir.path().join("envelope.wav");
    let frames = pipeline.save_region(&out, ENVELOPE, &[0], 1.0, 3.0).unwrap();
    assert_eq!(frames, 16_000);

    let mut reader = hound::WavReader::open(&out).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);

    let saved: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    let envelope = pipeline.get_samples(ENVELOPE, 0, 1.0, 3.0).unwrap();
    assert_eq!(saved, envelope);
    // 0.5 amplitude sine: envelope settles near 0.45.
    assert_abs_diff_eq!(saved[8000], 0.45, epsilon = 0.01);
}

#[test]
fn test_save_downsampled_envelope_rounds_rate() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = two_channel_file(dir.path());
    let mut config = quiet_config();
    config.envelope.cutoff = 70.0;
    config.envelope.downsample = true;
    let mut pipeline = DataPipeline::open(&path, &config).unwrap();

    // Step 11 at 8 kHz: 727.27 Hz.
    let extent = pipeline.series_extent(ENVELOPE).unwrap();
    assert_abs_diff_eq!(extent.rate, 8000.0 / 11.0, epsilon = 1e-9);

    let out = dir.path().join("envelope_ds.wav");
    let frames = pipeline.save_region(&out, ENVELOPE, &[], 1.0, 3.0).unwrap();
    let reader = hound::WavReader::open(&out).unwrap();
    assert_eq!(reader.spec().sample_rate, 727);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.duration() as usize, frames);
}

#[test]
fn test_save_rejects_spectrogram() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = two_channel_file(dir.path());
    let mut pipeline = DataPipeline::open(&path, &quiet_config()).unwrap();
    let out = dir.path().join("tile.wav");
    assert!(matches!(
        pipeline.save_region(&out, "spectrogram", &[], 0.0, 1.0),
        Err(Error::NotOneDimensional(_))
    ));
    assert!(!out.exists());
}

#[test]
fn test_close_releases_file() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = two_channel_file(dir.path());
    let mut pipeline = DataPipeline::open(&path, &quiet_config()).unwrap();
    pipeline.update_window(0.0, 1.0).unwrap();
    pipeline.close();
    assert!(pipeline.get_samples(SOURCE, 0, 0.0, 1.0).is_err());
}
