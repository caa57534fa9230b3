//! Named series and their dependency edges.
//!
//! Nodes are kept in insertion order, and a node can only name an upstream
//! that already exists, so the order is always a valid dependency order.

use crate::{Error, Result};
use audian_core::{SharedSeries, Window};
use tracing::trace;

/// Raw samples.
pub const SOURCE: &str = "source";
/// Band-limited samples.
pub const FILTERED: &str = "filtered";
/// Amplitude envelope of the filtered samples.
pub const ENVELOPE: &str = "envelope";
/// Power spectrogram of the filtered samples.
pub const SPECTROGRAM: &str = "spectrogram";

/// A series plus the name of the node it pulls from.
pub struct SeriesNode {
    upstream: Option<String>,
    series: SharedSeries,
}

impl SeriesNode {
    /// A node without an upstream in the graph.
    pub fn root(series: SharedSeries) -> Self {
        Self {
            upstream: None,
            series,
        }
    }

    /// A node fed by the series registered as `upstream`.
    pub fn derived(upstream: impl Into<String>, series: SharedSeries) -> Self {
        Self {
            upstream: Some(upstream.into()),
            series,
        }
    }
}

struct Entry {
    name: String,
    upstream: Option<usize>,
    series: SharedSeries,
}

#[derive(Default)]
pub struct SeriesGraph {
    entries: Vec<Entry>,
}

impl SeriesGraph {
    pub fn get(&self, name: &str) -> Option<SharedSeries> {
        self.index(name).map(|i| self.entries[i].series.clone())
    }

    /// Like [`get`](Self::get), failing with `UnknownSeries`.
    pub fn require(&self, name: &str) -> Result<SharedSeries> {
        self.get(name)
            .ok_or_else(|| Error::UnknownSeries(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    /// Names in dependency order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, node: SeriesNode) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateSeries(name));
        }
        let upstream = match node.upstream {
            Some(upstream) => Some(
                self.index(&upstream)
                    .ok_or(Error::UnknownSeries(upstream))?,
            ),
            None => None,
        };
        self.entries.push(Entry {
            name,
            upstream,
            series: node.series,
        });
        Ok(())
    }

    /// Per node, the frames to request for the time span `[t0, t1)`.
    ///
    /// Each node wants the span on its own axis. Walking downstream to
    /// upstream, every node additionally owes its upstream the margins it
    /// needs, so an upstream shared by several consumers is asked once for
    /// the union instead of being recomputed for each of them in turn.
    /// A consumer that will serve its demand from its buffer owes nothing.
    pub(crate) fn demands(&self, t0: f64, t1: f64) -> Vec<Window> {
        let mut demands: Vec<Window> = self
            .entries
            .iter()
            .map(|e| e.series.borrow().window_for(t0, t1))
            .collect();

        for i in (0..self.entries.len()).rev() {
            let Some(u) = self.entries[i].upstream else {
                continue;
            };
            let series = self.entries[i].series.borrow();
            let want = demands[i].clamp(series.frames());
            if !series.is_dirty() && series.window().contains(&want) {
                continue;
            }
            let need = series.upstream_window(demands[i]);
            demands[u] = demands[u].hull(&need);
        }
        demands
    }

    /// Request every node's demand in dependency order.
    pub(crate) fn request(&self, t0: f64, t1: f64) -> Result<()> {
        let demands = self.demands(t0, t1);
        for (entry, demand) in self.entries.iter().zip(demands) {
            let available = entry.series.borrow_mut().request_window(demand)?;
            trace!(series = %entry.name, demand = %demand, available = %available, "window requested");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audian_core::{
        shared, FilterConfig, FilteredSeries, ReadaheadConfig, Series, SourceSeries,
    };
    use audian_io::MemorySource;

    fn source() -> SharedSeries {
        let memory = MemorySource::new(1000.0, vec![vec![0.0; 20_000]]).unwrap();
        shared(SourceSeries::new(Box::new(memory), ReadaheadConfig::none()).unwrap())
    }

    #[test]
    fn test_insert_rules() {
        let mut graph = SeriesGraph::default();
        let root = source();
        graph.insert(SOURCE, SeriesNode::root(root.clone())).unwrap();

        assert!(matches!(
            graph.insert(SOURCE, SeriesNode::root(root.clone())),
            Err(Error::DuplicateSeries(_))
        ));
        assert!(matches!(
            graph.insert("late", SeriesNode::derived("missing", root)),
            Err(Error::UnknownSeries(_))
        ));
        assert_eq!(graph.len(), 1);
        assert!(graph.require("late").is_err());
    }

    #[test]
    fn test_demands_cover_margins() {
        let mut graph = SeriesGraph::default();
        let root = source();
        let filtered = shared(FilteredSeries::new(root.clone(), &FilterConfig::band(10.0, 100.0)).unwrap());
        graph.insert(SOURCE, SeriesNode::root(root)).unwrap();
        graph.insert(FILTERED, SeriesNode::derived(SOURCE, filtered)).unwrap();

        let demands = graph.demands(5.0, 6.0);
        assert_eq!(demands[1], Window::new(5000, 1000));
        // One second of filter margin on each side.
        assert_eq!(demands[0], Window::new(4000, 3000));
    }

    #[test]
    fn test_request_is_idempotent() {
        let mut graph = SeriesGraph::default();
        let root = source();
        let filtered = shared(FilteredSeries::new(root.clone(), &FilterConfig::default()).unwrap());
        graph.insert(SOURCE, SeriesNode::root(root.clone())).unwrap();
        graph.insert(FILTERED, SeriesNode::derived(SOURCE, filtered.clone())).unwrap();

        graph.request(2.0, 3.0).unwrap();
        graph.request(2.0, 3.0).unwrap();
        graph.request(2.2, 2.8).unwrap();
        assert_eq!(root.borrow().recompute_count(), 1);
        assert_eq!(filtered.borrow().recompute_count(), 1);
    }

    #[test]
    fn test_cached_consumer_owes_no_margin() {
        let mut graph = SeriesGraph::default();
        let root = source();
        let filtered = shared(FilteredSeries::new(root.clone(), &FilterConfig::default()).unwrap());
        graph.insert(SOURCE, SeriesNode::root(root)).unwrap();
        graph.insert(FILTERED, SeriesNode::derived(SOURCE, filtered.clone())).unwrap();

        graph.request(5.0, 8.0).unwrap();
        let demands = graph.demands(6.0, 7.0);
        assert_eq!(demands[0], Window::new(6000, 1000));

        filtered.borrow_mut().set_filter(0, 10.0, 100.0).unwrap();
        let demands = graph.demands(6.0, 7.0);
        assert_eq!(demands[0], Window::new(5000, 3000));
    }
}
