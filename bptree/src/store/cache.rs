//! In-memory cache of decoded objects.
//!
//! Entries are type-erased `Arc`s so one cache can hold every object type
//! stored in a file. Every cached entry mirrors what is on disk, so
//! evicting one never loses data.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use super::allocator::Label;

/// A shared, type-erased decoded object.
pub type CachedObject = Arc<dyn Any + Send + Sync>;

#[derive(Debug)]
struct CacheEntry {
    object: CachedObject,
    last_used: u64,
}

/// Least-recently-used cache of decoded objects, keyed by label.
///
/// `recency` maps each entry's `last_used` tick back to its label, so the
/// eviction victim is always its first key.
#[derive(Debug)]
pub struct ObjectCache {
    entries: HashMap<Label, CacheEntry>,
    recency: BTreeMap<u64, Label>,
    capacity: usize,
    clock: u64,
}

impl ObjectCache {
    /// Create a cache holding at most `capacity` objects (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: Label) -> bool {
        self.entries.contains_key(&label)
    }

    /// Fetch an object, marking it recently used.
    #[allow(clippy::disallowed_methods)] // Arc::clone hands out a shared handle
    pub fn get(&mut self, label: Label) -> Option<CachedObject> {
        let entry = self.entries.get_mut(&label)?;
        self.clock += 1;
        self.recency.remove(&entry.last_used);
        self.recency.insert(self.clock, label);
        entry.last_used = self.clock;
        Some(Arc::clone(&entry.object))
    }

    /// Insert or replace an object, evicting the least recently used one
    /// when over capacity.
    pub fn insert(&mut self, label: Label, object: CachedObject) {
        self.clock += 1;
        let previous = self.entries.insert(
            label,
            CacheEntry {
                object,
                last_used: self.clock,
            },
        );
        if let Some(previous) = previous {
            self.recency.remove(&previous.last_used);
        }
        self.recency.insert(self.clock, label);

        while self.entries.len() > self.capacity {
            let Some((_, victim)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&victim);
            trace!(label = victim, "evicted cached object");
        }
    }

    pub fn remove(&mut self, label: Label) -> Option<CachedObject> {
        let entry = self.entries.remove(&label)?;
        self.recency.remove(&entry.last_used);
        Some(entry.object)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}
