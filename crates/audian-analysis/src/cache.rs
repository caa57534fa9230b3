//! LRU memory cache for finished overviews.
//!
//! Overviews are keyed by a hash of what produced them, so reopening the same
//! recording with the same settings skips the worker entirely.

use crate::overview::{Overview, OverviewConfig};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

pub struct OverviewCache {
    entries: LruCache<u64, Arc<Overview>>,
}

impl OverviewCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// A cache ready to be shared between pipelines and their workers.
    pub fn shared(max_entries: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(max_entries)))
    }

    pub fn get(&mut self, key: u64) -> Option<Arc<Overview>> {
        self.entries.get(&key).cloned()
    }

    /// Return the cached overview or compute and insert it.
    pub fn get_or_compute<F>(&mut self, key: u64, compute: F) -> Arc<Overview>
    where
        F: FnOnce() -> Overview,
    {
        if let Some(overview) = self.entries.get(&key) {
            return Arc::clone(overview);
        }
        let overview = Arc::new(compute());
        self.entries.put(key, Arc::clone(&overview));
        overview
    }

    pub fn put(&mut self, key: u64, overview: Arc<Overview>) {
        self.entries.put(key, overview);
    }

    pub fn remove(&mut self, key: u64) {
        self.entries.pop(&key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for the overview of a recording identified by `identity`
/// (typically its path) with the given layout and settings.
pub fn overview_key(identity: &str, frames: usize, channels: usize, config: &OverviewConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    identity.hash(&mut hasher);
    frames.hash(&mut hasher);
    channels.hash(&mut hasher);
    config.samples_per_block.hash(&mut hasher);
    config.levels.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::MultiResolutionSummary;

    fn overview(frames: usize) -> Overview {
        Overview {
            rate: 1000.0,
            frames,
            channels: vec![MultiResolutionSummary::from_samples(
                &vec![0.5; frames],
                10,
                2,
            )],
        }
    }

    #[test]
    fn test_evicts_least_recent() {
        let mut cache = OverviewCache::new(2);
        cache.put(1, Arc::new(overview(10)));
        cache.put(2, Arc::new(overview(20)));
        assert!(cache.get(1).is_some());
        cache.put(3, Arc::new(overview(30)));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let mut cache = OverviewCache::new(4);
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_compute(9, || {
                calls += 1;
                overview(100)
            });
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = OverviewCache::new(0);
        cache.put(1, Arc::new(overview(10)));
        assert_eq!(cache.len(), 1);
        cache.remove(1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_depends_on_settings() {
        let config = OverviewConfig::default();
        let coarse = OverviewConfig {
            samples_per_block: 4096,
            ..config
        };
        let a = overview_key("a.wav", 100, 2, &config);
        assert_eq!(a, overview_key("a.wav", 100, 2, &config));
        assert_ne!(a, overview_key("b.wav", 100, 2, &config));
        assert_ne!(a, overview_key("a.wav", 100, 2, &coarse));
    }
}
