//! Pipeline configuration.
//!
//! One explicit struct, built once and handed to [`DataPipeline`](crate::DataPipeline)
//! at open. Every section deserializes with missing fields taking defaults, so a
//! config file only needs to name what it changes:
//!
//! ```rust
//! use audian::AudianConfig;
//!
//! let config = AudianConfig::from_json_str(r#"{ "filter": { "highpass": 500.0 } }"#).unwrap();
//! assert_eq!(config.filter.highpass, 500.0);
//! assert_eq!(config.envelope.cutoff, 500.0);
//! ```

use crate::Result;
use audian_analysis::OverviewConfig;
use audian_core::{EnvelopeConfig, FilterConfig, ReadaheadConfig, SpectrogramConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudianConfig {
    pub filter: FilterConfig,
    pub envelope: EnvelopeConfig,
    pub spectrogram: SpectrogramConfig,
    pub readahead: ReadaheadConfig,
    pub overview: OverviewConfig,
}

impl AudianConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Self>(json)?.sanitized())
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create config with a band-pass filter.
    pub fn with_band(highpass: f64, lowpass: f64) -> Self {
        Self {
            filter: FilterConfig::band(highpass, lowpass),
            ..Default::default()
        }
    }

    /// Clamp values that would make a series unusable.
    ///
    /// Cutoffs are left alone; they are fitted to the sample rate when the
    /// pipeline opens.
    pub fn sanitized(mut self) -> Self {
        self.filter.order = self.filter.order.clamp(1, audian_dsp::filter::MAX_ORDER);
        self.filter.margin_seconds = non_negative(self.filter.margin_seconds);
        self.envelope.margin_before = non_negative(self.envelope.margin_before);
        self.envelope.margin_after = non_negative(self.envelope.margin_after);
        self.spectrogram.lookahead_seconds = non_negative(self.spectrogram.lookahead_seconds);
        self.readahead.seconds_before = non_negative(self.readahead.seconds_before);
        self.readahead.seconds_after = non_negative(self.readahead.seconds_after);
        self.readahead.chunk_frames = self.readahead.chunk_frames.max(1);
        self.overview.samples_per_block = self.overview.samples_per_block.max(1);
        self.overview.levels = self.overview.levels.max(1);
        self.overview.chunk_frames = self.overview.chunk_frames.max(1);
        self
    }
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}
