//! Waveform summaries
//!
//! Min/max/RMS per block of samples, at several zoom levels. Summaries can
//! be built incrementally from consecutive chunks of any size.

use serde::{Deserialize, Serialize};

/// A single block of waveform summary data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformBlock {
    /// Minimum sample value in this block
    pub min: f32,
    /// Maximum sample value in this block
    pub max: f32,
    /// RMS level of this block
    pub rms: f32,
}

impl WaveformBlock {
    pub fn peak(&self) -> f32 {
        self.min.abs().max(self.max.abs())
    }
}

/// Waveform summary for a single channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformSummary {
    pub blocks: Vec<WaveformBlock>,
    /// Samples per block
    pub samples_per_block: usize,
    /// Total number of samples summarized
    pub total_samples: usize,
}

impl WaveformSummary {
    pub fn new(samples_per_block: usize) -> Self {
        Self {
            blocks: Vec::new(),
            samples_per_block,
            total_samples: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Overall peak level
    pub fn peak(&self) -> f32 {
        self.blocks
            .iter()
            .map(WaveformBlock::peak)
            .fold(0.0f32, f32::max)
    }

    /// Average RMS level
    pub fn average_rms(&self) -> f32 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.blocks.iter().map(|b| b.rms).sum();
        sum / self.blocks.len() as f32
    }

    /// Combine adjacent blocks 2:1.
    fn downsample(&self) -> WaveformSummary {
        let blocks = self
            .blocks
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => WaveformBlock {
                    min: a.min.min(b.min),
                    max: a.max.max(b.max),
                    // Power average
                    rms: ((a.rms * a.rms + b.rms * b.rms) / 2.0).sqrt(),
                },
                [a] => *a,
                _ => WaveformBlock::default(),
            })
            .collect();

        WaveformSummary {
            blocks,
            samples_per_block: self.samples_per_block * 2,
            total_samples: self.total_samples,
        }
    }
}

/// Builds a [`WaveformSummary`] from consecutive chunks of one channel.
///
/// Blocks that straddle chunk boundaries are carried over, so the result is
/// identical to summarizing all samples at once.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    summary: WaveformSummary,
    min: f32,
    max: f32,
    sum_sq: f64,
    count: usize,
}

impl SummaryBuilder {
    pub fn new(samples_per_block: usize) -> Self {
        Self {
            summary: WaveformSummary::new(samples_per_block.max(1)),
            min: f32::MAX,
            max: f32::MIN,
            sum_sq: 0.0,
            count: 0,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        let spb = self.summary.samples_per_block;
        for &sample in samples {
            self.min = self.min.min(sample);
            self.max = self.max.max(sample);
            self.sum_sq += (sample as f64) * (sample as f64);
            self.count += 1;
            if self.count == spb {
                self.flush();
            }
        }
        self.summary.total_samples += samples.len();
    }

    fn flush(&mut self) {
        if self.count == 0 {
            return;
        }
        self.summary.blocks.push(WaveformBlock {
            min: self.min,
            max: self.max,
            rms: (self.sum_sq / self.count as f64).sqrt() as f32,
        });
        self.min = f32::MAX;
        self.max = f32::MIN;
        self.sum_sq = 0.0;
        self.count = 0;
    }

    /// Complete blocks so far.
    pub fn summary(&self) -> &WaveformSummary {
        &self.summary
    }

    /// Close the trailing partial block and return the summary.
    pub fn finish(mut self) -> WaveformSummary {
        self.flush();
        self.summary
    }
}

/// Compute a summary of one channel in one go.
pub fn compute_summary(samples: &[f32], samples_per_block: usize) -> WaveformSummary {
    let mut builder = SummaryBuilder::new(samples_per_block);
    builder.push(samples);
    builder.finish()
}

/// Waveform summaries at power-of-two zoom levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiResolutionSummary {
    /// Index 0 = finest, each next level 2x coarser
    pub levels: Vec<WaveformSummary>,
    /// Samples per block at the finest level
    pub base_samples_per_block: usize,
}

impl MultiResolutionSummary {
    /// Derive `num_levels` levels (at least one) from a finest summary.
    pub fn from_summary(finest: WaveformSummary, num_levels: usize) -> Self {
        let base_samples_per_block = finest.samples_per_block;
        let mut levels = Vec::with_capacity(num_levels.max(1));
        levels.push(finest);
        for level in 1..num_levels {
            let coarse = levels[level - 1].downsample();
            levels.push(coarse);
        }
        Self {
            levels,
            base_samples_per_block,
        }
    }

    pub fn from_samples(samples: &[f32], base_samples_per_block: usize, num_levels: usize) -> Self {
        Self::from_summary(compute_summary(samples, base_samples_per_block), num_levels)
    }

    /// Summary at `level`, or the coarsest one past the end.
    pub fn at_level(&self, level: usize) -> &WaveformSummary {
        &self.levels[level.min(self.levels.len() - 1)]
    }

    /// The coarsest level whose blocks are no wider than `samples_per_pixel`.
    pub fn for_zoom(&self, samples_per_pixel: usize) -> &WaveformSummary {
        let level = self
            .levels
            .iter()
            .take_while(|summary| summary.samples_per_block <= samples_per_pixel)
            .count();
        self.at_level(level.saturating_sub(1))
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn peak(&self) -> f32 {
        self.at_level(0).peak()
    }
}
