//! The data pipeline of one open recording.

use crate::builder::DataPipelineBuilder;
use crate::config::AudianConfig;
use crate::events::{EventBus, PipelineEvent};
use crate::graph::{SeriesGraph, ENVELOPE, FILTERED, SPECTROGRAM};
use crate::{Error, Result};
use audian_analysis::{overview_key, OverviewCache, OverviewHandle};
use audian_core::{
    EnvelopeSeries, FilteredSeries, Series, SharedSeries, SourceSeries, SpectrogramExtent,
    SpectrogramSeries,
};
use audian_io::{write_wav, BitDepth, ReadStats, SampleBuffer};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typed handles to the series built by default.
pub(crate) struct DefaultSeries {
    pub(crate) filtered: Rc<RefCell<FilteredSeries>>,
    pub(crate) envelope: Rc<RefCell<EnvelopeSeries>>,
    pub(crate) spectrogram: Rc<RefCell<SpectrogramSeries>>,
}

/// Time span and sampling of a series' materialized window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesExtent {
    pub t_start: f64,
    pub t_end: f64,
    pub rate: f64,
    pub frames: usize,
    pub channels: usize,
    /// Values per frame.
    pub frame_shape: usize,
}

/// Buffered, on-demand pipeline over one recording.
///
/// Nothing is computed at open. [`update_window`](Self::update_window)
/// materializes a time span in every series, and values are read back
/// with [`get_samples`](Self::get_samples). Parameter changes only mark the
/// affected series stale; they recompute on the next update.
///
/// The series graph is single-threaded (`!Send`). Only the overview runs on
/// a worker thread, with its own reader.
///
/// # Example
///
/// ```rust
/// use audian::prelude::*;
///
/// let tone: Vec<f32> = (0..48_000)
///     .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 8000.0).sin())
///     .collect();
/// let memory = MemorySource::new(8000.0, vec![tone]).unwrap();
/// let mut pipeline = DataPipeline::builder()
///     .highpass(500.0)
///     .lowpass(2000.0)
///     .open_source(Box::new(memory))
///     .unwrap();
///
/// pipeline.update_window(2.0, 3.0).unwrap();
/// let envelope = pipeline.get_samples("envelope", 0, 2.0, 3.0).unwrap();
/// assert_eq!(envelope.len(), 8000);
/// ```
pub struct DataPipeline {
    path: Option<PathBuf>,
    config: AudianConfig,
    graph: SeriesGraph,
    source: Rc<RefCell<SourceSeries>>,
    defaults: Option<DefaultSeries>,
    window: Option<(f64, f64)>,
    events: EventBus,
    overview: Option<OverviewHandle>,
    overview_cache: Option<Arc<Mutex<OverviewCache>>>,
    closed: bool,
}

impl DataPipeline {
    pub fn builder() -> DataPipelineBuilder {
        DataPipelineBuilder::default()
    }

    /// Open a WAV file with the default series.
    pub fn open(path: impl AsRef<Path>, config: &AudianConfig) -> Result<Self> {
        Self::builder().config(*config).open(path)
    }

    pub(crate) fn from_parts(
        path: Option<PathBuf>,
        config: AudianConfig,
        graph: SeriesGraph,
        source: Rc<RefCell<SourceSeries>>,
        defaults: Option<DefaultSeries>,
        overview_cache: Option<Arc<Mutex<OverviewCache>>>,
    ) -> Result<Self> {
        let mut pipeline = Self {
            path,
            config,
            graph,
            source,
            defaults,
            window: None,
            events: EventBus::default(),
            overview: None,
            overview_cache,
            closed: false,
        };
        if pipeline.config.overview.enabled {
            pipeline.overview = Some(pipeline.start_overview()?);
        }
        Ok(pipeline)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Path of the recording, `None` for in-memory sources.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &AudianConfig {
        &self.config
    }

    /// Sample rate of the recording in Hz.
    pub fn rate(&self) -> f64 {
        self.source.borrow().rate()
    }

    pub fn frames(&self) -> usize {
        self.source.borrow().frames()
    }

    pub fn channels(&self) -> usize {
        self.source.borrow().channels()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.rate()
    }

    /// The last requested time span.
    pub fn current_window(&self) -> Option<(f64, f64)> {
        self.window
    }

    pub fn series(&self, name: &str) -> Option<SharedSeries> {
        self.graph.get(name)
    }

    pub fn graph(&self) -> &SeriesGraph {
        &self.graph
    }

    pub fn source_stats(&self) -> ReadStats {
        self.source.borrow().read_stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // =========================================================================
    // Window and samples
    // =========================================================================

    /// Materialize the time span `[t0, t1)` in every series.
    ///
    /// Times are clamped to the recording. Each upstream is asked once for the
    /// union of what its consumers need, then series are updated source first.
    /// Repeating a satisfied request recomputes nothing.
    pub fn update_window(&mut self, t0: f64, t1: f64) -> Result<()> {
        self.ensure_open()?;
        let (t0, t1) = self.clamp_span(t0, t1);
        self.graph.request(t0, t1)?;

        if self.window != Some((t0, t1)) {
            self.window = Some((t0, t1));
            self.events.emit(PipelineEvent::WindowChanged { t0, t1 });
        }
        Ok(())
    }

    /// Values of `series` for `channel` over `[t0, t1)` on the series' own
    /// time axis, after updating the window to that span.
    ///
    /// A spectrogram yields `frame_shape` values per frame, time-major.
    /// Near a truncated file end fewer frames than the span covers may come
    /// back.
    pub fn get_samples(
        &mut self,
        series: &str,
        channel: usize,
        t0: f64,
        t1: f64,
    ) -> Result<Vec<f32>> {
        let handle = self.graph.require(series)?;
        self.update_window(t0, t1)?;
        let (t0, t1) = self.clamp_span(t0, t1);

        let series = handle.borrow();
        if channel >= series.channels() {
            return Err(audian_core::Error::ChannelOutOfRange {
                channel,
                channels: series.channels(),
            }
            .into());
        }
        let want = series.window_for(t0, t1).intersect(&series.window());
        if want.is_empty() {
            return Ok(Vec::new());
        }
        let values = series.read(want.offset, want.frames, channel)?.to_vec();
        Ok(values)
    }

    fn clamp_span(&self, t0: f64, t1: f64) -> (f64, f64) {
        let duration = self.duration();
        let clamp = |t: f64| {
            if t.is_nan() {
                0.0
            } else {
                t.clamp(0.0, duration)
            }
        };
        let (t0, t1) = (clamp(t0), clamp(t1));
        (t0, t1.max(t0))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(audian_io::Error::Closed.into());
        }
        Ok(())
    }

    // =========================================================================
    // Controls
    // =========================================================================

    fn defaults(&self) -> Result<&DefaultSeries> {
        self.defaults
            .as_ref()
            .ok_or_else(|| Error::UnknownSeries(FILTERED.to_string()))
    }

    /// Set the band of one channel. Only that channel and what is derived
    /// from it recompute. Invalid cutoffs leave everything unchanged.
    pub fn set_filter(&mut self, channel: usize, highpass: f64, lowpass: f64) -> Result<bool> {
        let changed = self
            .defaults()?
            .filtered
            .borrow_mut()
            .set_filter(channel, highpass, lowpass)?;
        if changed {
            self.events.emit(PipelineEvent::FilterChanged {
                channel: Some(channel),
                highpass,
                lowpass,
            });
        }
        Ok(changed)
    }

    /// Set the same band on every channel.
    pub fn set_filter_all(&mut self, highpass: f64, lowpass: f64) -> Result<bool> {
        let changed = self
            .defaults()?
            .filtered
            .borrow_mut()
            .set_filter_all(highpass, lowpass)?;
        if changed {
            self.events.emit(PipelineEvent::FilterChanged {
                channel: None,
                highpass,
                lowpass,
            });
        }
        Ok(changed)
    }

    pub fn set_envelope_cutoff(&mut self, cutoff: f64) -> Result<bool> {
        let changed = self.defaults()?.envelope.borrow_mut().set_cutoff(cutoff)?;
        if changed {
            self.events.emit(PipelineEvent::EnvelopeCutoffChanged { cutoff });
        }
        Ok(changed)
    }

    /// Change the spectrogram FFT length and hop fraction. Out-of-range
    /// values are clamped, never rejected.
    pub fn set_spectrogram_resolution(&mut self, nfft: usize, hop_fraction: f64) -> Result<bool> {
        let mut spectrogram = self.defaults()?.spectrogram.borrow_mut();
        let changed = spectrogram.set_resolution(nfft, hop_fraction)?;
        let (nfft, hop) = (spectrogram.nfft(), spectrogram.hop());
        drop(spectrogram);

        if changed {
            self.events.emit(PipelineEvent::ResolutionChanged { nfft, hop });
        }
        Ok(changed)
    }

    // =========================================================================
    // Extents
    // =========================================================================

    pub fn series_extent(&self, name: &str) -> Result<SeriesExtent> {
        let series = self.graph.require(name)?;
        let series = series.borrow();
        let window = series.window();
        Ok(SeriesExtent {
            t_start: series.frame_to_time(window.offset),
            t_end: series.frame_to_time(window.end()),
            rate: series.rate(),
            frames: series.frames(),
            channels: series.channels(),
            frame_shape: series.frame_shape(),
        })
    }

    pub fn spectrogram_extent(&self) -> Result<SpectrogramExtent> {
        Ok(self.spectrogram()?.borrow().extent())
    }

    /// Default `(zmin, zmax)` color scale in dB, `None` before the first
    /// update.
    pub fn spectrogram_color_range(&self) -> Result<Option<(f32, f32)>> {
        Ok(self.spectrogram()?.borrow().color_range())
    }

    fn spectrogram(&self) -> Result<&Rc<RefCell<SpectrogramSeries>>> {
        self.defaults
            .as_ref()
            .map(|d| &d.spectrogram)
            .ok_or_else(|| Error::UnknownSeries(SPECTROGRAM.to_string()))
    }

    /// Typed access to the filtered series.
    pub fn filtered(&self) -> Option<&Rc<RefCell<FilteredSeries>>> {
        self.defaults.as_ref().map(|d| &d.filtered)
    }

    /// Typed access to the envelope series.
    pub fn envelope(&self) -> Option<&Rc<RefCell<EnvelopeSeries>>> {
        self.defaults.as_ref().map(|d| &d.envelope)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Receive parameter and window changes of this pipeline.
    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Overview
    // =========================================================================

    /// The whole-recording overview, started on first use when it is not
    /// enabled at open.
    pub fn overview(&mut self) -> Result<&mut OverviewHandle> {
        self.ensure_open()?;
        let handle = match self.overview.take() {
            Some(handle) => handle,
            None => self.start_overview()?,
        };
        Ok(self.overview.insert(handle))
    }

    fn start_overview(&self) -> Result<OverviewHandle> {
        let source = self.source.borrow();
        let reader = source.try_clone_reader()?;
        let config = &self.config.overview;

        let handle = match (&self.overview_cache, &self.path) {
            (Some(cache), Some(path)) => {
                let key = overview_key(
                    &path.to_string_lossy(),
                    source.frames(),
                    source.channels(),
                    config,
                );
                OverviewHandle::start_cached(reader, config, Arc::clone(cache), key)?
            }
            _ => OverviewHandle::start(reader, config)?,
        };
        Ok(handle)
    }

    // =========================================================================
    // Export and teardown
    // =========================================================================

    /// Write `[t0, t1)` of a one-dimensional series to a 32-bit float WAV
    /// file. An empty `channels` slice writes every channel. Returns the
    /// number of frames written.
    ///
    /// WAV headers hold whole-Hz rates, so a fractional series rate (a
    /// downsampled envelope, say 44100 / 44 Hz) is written rounded to the
    /// nearest Hz and at least 1 Hz.
    pub fn save_region(
        &mut self,
        path: impl AsRef<Path>,
        series: &str,
        channels: &[usize],
        t0: f64,
        t1: f64,
    ) -> Result<usize> {
        let handle = self.graph.require(series)?;
        let (rate, all) = {
            let handle = handle.borrow();
            if handle.frame_shape() != 1 {
                return Err(Error::NotOneDimensional(series.to_string()));
            }
            (handle.rate(), handle.channels())
        };

        let selected: Vec<usize> = if channels.is_empty() {
            (0..all).collect()
        } else {
            channels.to_vec()
        };
        let data = selected
            .iter()
            .map(|&c| self.get_samples(series, c, t0, t1))
            .collect::<Result<Vec<_>>>()?;

        let buffer = SampleBuffer::from_planar(data);
        write_wav(path.as_ref(), &buffer, header_rate(rate), BitDepth::Float32)?;
        info!(
            path = %path.as_ref().display(),
            series,
            frames = buffer.frames(),
            channels = buffer.channels(),
            "region saved"
        );
        Ok(buffer.frames())
    }

    /// Cancel the overview and close the source. Idempotent; later updates
    /// fail with a closed-source error.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.overview = None;
        self.source.borrow_mut().close();
        self.closed = true;
        debug!(path = ?self.path, "pipeline closed");
    }
}

impl Drop for DataPipeline {
    fn drop(&mut self) {
        self.close();
    }
}

/// Whole-Hz sample rate for a WAV header.
fn header_rate(rate: f64) -> u32 {
    let rounded = rate.round().clamp(1.0, u32::MAX as f64);
    if rounded != rate {
        warn!(rate, header = rounded, "series rate rounded for WAV header");
    }
    rounded as u32
}
