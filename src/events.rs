//! Change notifications.
//!
//! A pipeline never reaches into other pipelines. An outside coordinator
//! subscribes and fans parameter changes out to sibling pipelines itself.

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// `channel` is `None` when every channel got the same band.
    FilterChanged {
        channel: Option<usize>,
        highpass: f64,
        lowpass: f64,
    },
    EnvelopeCutoffChanged { cutoff: f64 },
    /// Effective (clamped) resolution.
    ResolutionChanged { nfft: usize, hop: usize },
    WindowChanged { t0: f64, t1: f64 },
}

/// Fan-out to any number of subscribers. Dropped receivers are pruned on
/// the next emit.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<PipelineEvent>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: PipelineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
