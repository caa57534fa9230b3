//! Whole-recording overview computed on a worker thread.
//!
//! The worker reads the recording chunk by chunk through its own reader and
//! appends min/max/RMS blocks into a buffer shared with the handle. The
//! handle never blocks in [`OverviewHandle::poll`]; it can also hand out the
//! blocks finished so far for progressive display.

use crate::cache::OverviewCache;
use crate::waveform::{MultiResolutionSummary, SummaryBuilder, WaveformSummary};
use crate::{Error, Result};
use audian_io::RandomAccessSource;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Overview preprocessing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Start the overview when a recording is opened (default: true)
    pub enabled: bool,
    /// Frames per block at the finest level (default: 1024)
    pub samples_per_block: usize,
    /// Number of zoom levels (default: 8)
    pub levels: usize,
    /// Frames read per worker step (default: 65536)
    pub chunk_frames: usize,
    /// Finished overviews kept in an [`OverviewCache`] (default: 16)
    pub cache_entries: usize,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            samples_per_block: 1024,
            levels: 8,
            chunk_frames: 1 << 16,
            cache_entries: 16,
        }
    }
}

/// Finished overview of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub rate: f64,
    pub frames: usize,
    pub channels: Vec<MultiResolutionSummary>,
}

impl Overview {
    pub fn channel(&self, channel: usize) -> Option<&MultiResolutionSummary> {
        self.channels.get(channel)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .map(MultiResolutionSummary::peak)
            .fold(0.0, f32::max)
    }

    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.rate
    }
}

pub enum OverviewStatus {
    /// Fraction of frames processed, 0.0..1.0.
    Running(f32),
    Complete(Arc<Overview>),
    Failed(String),
    Cancelled,
}

enum State {
    Running,
    Complete(Arc<Overview>),
    Failed(String),
    Cancelled,
}

/// State shared by the worker and the handle.
struct OverviewBuffer {
    builders: Vec<SummaryBuilder>,
    frames_done: usize,
    total_frames: usize,
    state: State,
}

impl OverviewBuffer {
    fn progress(&self) -> f32 {
        if self.total_frames == 0 {
            return 1.0;
        }
        (self.frames_done as f64 / self.total_frames as f64) as f32
    }
}

/// Handle to a background overview computation.
///
/// Dropping the handle cancels the worker.
pub struct OverviewHandle {
    shared: Arc<Mutex<OverviewBuffer>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OverviewHandle {
    /// Start summarizing `reader` on a dedicated thread.
    pub fn start(
        reader: Box<dyn RandomAccessSource + Send>,
        config: &OverviewConfig,
    ) -> Result<Self> {
        Self::spawn(reader, config, None)
    }

    /// Like [`start`](Self::start), but resolve immediately from `cache` when
    /// `key` is present and store the result there when the worker finishes.
    pub fn start_cached(
        reader: Box<dyn RandomAccessSource + Send>,
        config: &OverviewConfig,
        cache: Arc<Mutex<OverviewCache>>,
        key: u64,
    ) -> Result<Self> {
        if let Some(overview) = cache.lock().get(key) {
            debug!(key, "overview served from cache");
            return Ok(Self::from_cached(overview));
        }
        Self::spawn(reader, config, Some((cache, key)))
    }

    /// A handle that is already complete.
    pub fn from_cached(overview: Arc<Overview>) -> Self {
        let frames = overview.frames;
        Self {
            shared: Arc::new(Mutex::new(OverviewBuffer {
                builders: Vec::new(),
                frames_done: frames,
                total_frames: frames,
                state: State::Complete(overview),
            })),
            cancel: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn spawn(
        mut reader: Box<dyn RandomAccessSource + Send>,
        config: &OverviewConfig,
        cache: Option<(Arc<Mutex<OverviewCache>>, u64)>,
    ) -> Result<Self> {
        let config = *config;
        let shared = Arc::new(Mutex::new(OverviewBuffer {
            builders: (0..reader.channels())
                .map(|_| SummaryBuilder::new(config.samples_per_block))
                .collect(),
            frames_done: 0,
            total_frames: reader.frames(),
            state: State::Running,
        }));
        let cancel = Arc::new(AtomicBool::new(false));

        let worker_shared = Arc::clone(&shared);
        let worker_cancel = Arc::clone(&cancel);
        let thread = std::thread::Builder::new()
            .name("audian-overview".into())
            .spawn(move || {
                let result = run(reader.as_mut(), &config, &worker_shared, &worker_cancel);
                reader.close();

                let state = match result {
                    Ok(overview) => {
                        if let Some((cache, key)) = cache {
                            cache.lock().put(key, Arc::clone(&overview));
                        }
                        State::Complete(overview)
                    }
                    Err(Error::Cancelled) => State::Cancelled,
                    Err(e) => {
                        warn!(error = %e, "overview failed");
                        State::Failed(e.to_string())
                    }
                };
                worker_shared.lock().state = state;
            })
            .map_err(Error::Spawn)?;

        Ok(Self {
            shared,
            cancel,
            thread: Some(thread),
        })
    }

    /// Current status (non-blocking).
    pub fn poll(&mut self) -> OverviewStatus {
        if self.thread.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    self.shared.lock().state = State::Failed(Error::WorkerPanicked.to_string());
                }
            }
        }

        let buffer = self.shared.lock();
        match &buffer.state {
            State::Running => OverviewStatus::Running(buffer.progress()),
            State::Complete(overview) => OverviewStatus::Complete(Arc::clone(overview)),
            State::Failed(reason) => OverviewStatus::Failed(reason.clone()),
            State::Cancelled => OverviewStatus::Cancelled,
        }
    }

    /// Block until the worker is done.
    pub fn wait(mut self) -> Result<Arc<Overview>> {
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| Error::WorkerPanicked)?;
        }
        let buffer = self.shared.lock();
        match &buffer.state {
            State::Complete(overview) => Ok(Arc::clone(overview)),
            State::Failed(reason) => Err(Error::Failed(reason.clone())),
            State::Cancelled | State::Running => Err(Error::Cancelled),
        }
    }

    /// Ask the worker to stop after its current chunk.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_done(&self) -> bool {
        !matches!(self.shared.lock().state, State::Running)
    }

    /// Finest-level blocks of `channel` finished so far.
    pub fn snapshot(&self, channel: usize) -> Option<WaveformSummary> {
        let buffer = self.shared.lock();
        match &buffer.state {
            State::Complete(overview) => overview.channel(channel).map(|m| m.at_level(0).clone()),
            _ => buffer.builders.get(channel).map(|b| b.summary().clone()),
        }
    }
}

impl Drop for OverviewHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(
    reader: &mut dyn RandomAccessSource,
    config: &OverviewConfig,
    shared: &Mutex<OverviewBuffer>,
    cancel: &AtomicBool,
) -> Result<Arc<Overview>> {
    let total = reader.frames();
    let channels = reader.channels();
    let chunk_frames = config.chunk_frames.max(1);
    debug!(total, channels, chunk_frames, "overview started");

    let mut offset = 0;
    while offset < total {
        if cancel.load(Ordering::Acquire) {
            debug!(offset, total, "overview cancelled");
            return Err(Error::Cancelled);
        }

        let chunk = reader.read_window(offset, chunk_frames)?;
        if chunk.is_empty() {
            warn!(offset, total, "recording ended early");
            break;
        }

        let mut buffer = shared.lock();
        for (c, builder) in buffer.builders.iter_mut().enumerate() {
            builder.push(chunk.channel(c));
        }
        offset += chunk.frames();
        buffer.frames_done = offset;
    }

    let builders = std::mem::take(&mut shared.lock().builders);
    let overview = Overview {
        rate: reader.rate(),
        frames: offset,
        channels: builders
            .into_iter()
            .map(|b| MultiResolutionSummary::from_summary(b.finish(), config.levels))
            .collect(),
    };
    debug!(frames = offset, "overview complete");
    Ok(Arc::new(overview))
}
