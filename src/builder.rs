//! Builder for configuring and opening a `DataPipeline`.

use crate::config::AudianConfig;
use crate::graph::{SeriesGraph, SeriesNode, ENVELOPE, FILTERED, SOURCE, SPECTROGRAM};
use crate::pipeline::DefaultSeries;
use crate::{DataPipeline, Result};
use audian_analysis::OverviewCache;
use audian_core::{
    shared, EnvelopeSeries, FilterConfig, FilteredSeries, SourceSeries, SpectrogramSeries,
};
use audian_io::{RandomAccessSource, WavSource};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds an extra series once the default ones exist.
///
/// The factory looks up its upstream by name in the graph and returns the
/// new series together with that name.
pub type SeriesFactory = Box<dyn FnOnce(&SeriesGraph, &AudianConfig) -> Result<SeriesNode>>;

/// The default graph is `source -> filtered -> {envelope, spectrogram}`.
/// Extra series registered with [`series`](Self::series) are built after it,
/// in registration order, and follow every window update.
///
/// # Example
///
/// ```rust
/// use audian::prelude::*;
/// use audian::graph::{SeriesNode, FILTERED};
///
/// let memory = MemorySource::new(1000.0, vec![vec![0.1f32; 10_000]]).unwrap();
/// let pipeline = DataPipeline::builder()
///     .highpass(20.0)
///     .series("slow_envelope", |graph, config| {
///         let filtered = graph.require(FILTERED)?;
///         let envelope = EnvelopeSeries::new(
///             filtered,
///             &EnvelopeConfig { cutoff: 5.0, ..config.envelope },
///         )?;
///         Ok(SeriesNode::derived(FILTERED, shared(envelope)))
///     })
///     .open_source(Box::new(memory))
///     .unwrap();
///
/// assert!(pipeline.series("slow_envelope").is_some());
/// ```
pub struct DataPipelineBuilder {
    config: AudianConfig,
    defaults: bool,
    factories: Vec<(String, SeriesFactory)>,
    overview_cache: Option<Arc<Mutex<OverviewCache>>>,
}

impl Default for DataPipelineBuilder {
    fn default() -> Self {
        Self {
            config: AudianConfig::default(),
            defaults: true,
            factories: Vec::new(),
            overview_cache: None,
        }
    }
}

impl DataPipelineBuilder {
    pub fn config(mut self, config: AudianConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial high-pass cutoff for every channel. Default: 0 (off)
    pub fn highpass(mut self, cutoff: f64) -> Self {
        self.config.filter.highpass = cutoff;
        self
    }

    /// Initial low-pass cutoff for every channel. Default: Nyquist (off)
    pub fn lowpass(mut self, cutoff: f64) -> Self {
        self.config.filter.lowpass = Some(cutoff);
        self
    }

    pub fn series<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(&SeriesGraph, &AudianConfig) -> Result<SeriesNode> + 'static,
    {
        self.factories.push((name.into(), Box::new(factory)));
        self
    }

    /// Only build the source series (plus registered extras).
    pub fn without_defaults(mut self) -> Self {
        self.defaults = false;
        self
    }

    /// Serve and store overviews through `cache`, typically shared by all
    /// pipelines of an application. Only file-backed pipelines use it.
    pub fn overview_cache(mut self, cache: Arc<Mutex<OverviewCache>>) -> Self {
        self.overview_cache = Some(cache);
        self
    }

    /// Open a WAV file.
    pub fn open(self, path: impl AsRef<Path>) -> Result<DataPipeline> {
        let path = path.as_ref();
        let source = WavSource::open(path)?;
        self.build(Box::new(source), Some(path.to_path_buf()))
    }

    /// Use an already opened source, e.g. a `MemorySource`.
    pub fn open_source(self, source: Box<dyn RandomAccessSource>) -> Result<DataPipeline> {
        self.build(source, None)
    }

    fn build(
        self,
        source: Box<dyn RandomAccessSource>,
        path: Option<PathBuf>,
    ) -> Result<DataPipeline> {
        let mut config = self.config.sanitized();
        let mut graph = SeriesGraph::default();

        let source = shared(SourceSeries::new(source, config.readahead)?);
        graph.insert(SOURCE, SeriesNode::root(source.clone()))?;

        let defaults = if self.defaults {
            let filtered = match FilteredSeries::new(source.clone(), &config.filter) {
                Ok(filtered) => filtered,
                Err(audian_core::Error::InvalidFilter(reason)) => {
                    warn!(%reason, "configured band does not fit the recording, filter disabled");
                    config.filter = FilterConfig {
                        highpass: 0.0,
                        lowpass: None,
                        ..config.filter
                    };
                    FilteredSeries::new(source.clone(), &config.filter)?
                }
                Err(e) => return Err(e.into()),
            };
            let filtered = shared(filtered);
            graph.insert(FILTERED, SeriesNode::derived(SOURCE, filtered.clone()))?;

            let envelope = shared(EnvelopeSeries::new(filtered.clone(), &config.envelope)?);
            graph.insert(ENVELOPE, SeriesNode::derived(FILTERED, envelope.clone()))?;

            let spectrogram =
                shared(SpectrogramSeries::new(filtered.clone(), &config.spectrogram)?);
            graph.insert(SPECTROGRAM, SeriesNode::derived(FILTERED, spectrogram.clone()))?;

            Some(DefaultSeries {
                filtered,
                envelope,
                spectrogram,
            })
        } else {
            None
        };

        for (name, factory) in self.factories {
            let node = factory(&graph, &config)?;
            graph.insert(name, node)?;
        }

        debug!(
            path = ?path,
            series = graph.len(),
            "pipeline opened"
        );
        DataPipeline::from_parts(
            path,
            config,
            graph,
            source,
            defaults,
            self.overview_cache,
        )
    }
}
