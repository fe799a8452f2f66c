//! Parsed interval cache
//!
//! Keeps the intervals of tracks already fetched for the current video so
//! re-selecting a track does not hit the network again.

use dashmap::DashMap;

use super::IntervalStore;

/// Cache of parsed caption tracks, keyed by the URL they were fetched from
#[derive(Debug, Default)]
pub struct IntervalCache {
    entries: DashMap<String, IntervalStore>,
}

impl IntervalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<IntervalStore> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, url: &str, intervals: IntervalStore) {
        self.entries.insert(url.to_string(), intervals);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything, e.g. when the page moves to another video
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            tracing::debug!("Cleared {} cached caption track(s)", count);
        }
    }
}
