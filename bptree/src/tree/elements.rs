//! Bounded sorted container used as the storage of one node.
//!
//! An `Elements` holds up to `capacity` entries sorted strictly by key.
//! In a leaf the payload is the stored value; in a middle node it is the
//! id of the child node whose minimum key is the entry key.

use super::comparator::Comparator;

/// Insertion was refused because the container is full.
///
/// The rejected entry is handed back so the caller can route it elsewhere.
#[derive(Debug, PartialEq, Eq)]
pub struct Full<T>(pub T);

/// A fixed-capacity, order-maintaining sequence of `(key, payload)` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elements<K, P> {
    entries: Vec<(K, P)>,
    capacity: usize,
}

impl<K, P> Elements<K, P> {
    /// Create an empty container.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Wrap entries that are already sorted and unique.
    ///
    /// # Panics
    ///
    /// Panics if more entries than `capacity` are given.
    #[must_use]
    pub fn from_sorted(capacity: usize, entries: Vec<(K, P)>) -> Self {
        assert!(
            entries.len() <= capacity,
            "{} entries exceed capacity {capacity}",
            entries.len()
        );
        Self { entries, capacity }
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
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Find `key` by binary search.
    ///
    /// `Ok(index)` when present, otherwise `Err(index)` where the key would
    /// be inserted to keep the order.
    pub fn locate<C: Comparator<K>>(&self, key: &K, cmp: &C) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| cmp.compare(k, key))
    }

    /// Index of the first entry whose key is not less than `key`.
    ///
    /// Equals `len()` when every key is smaller.
    pub fn locate_branch<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
        self.entries.partition_point(|(k, _)| cmp.less(k, key))
    }

    /// Index of the entry responsible for `key` when entry keys are the
    /// minimum keys of consecutive ranges.
    ///
    /// An exact match wins; otherwise the last entry whose key is below
    /// `key`. Keys smaller than every entry go to the first entry.
    pub fn select_branch<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
        match self.locate(key, cmp) {
            Ok(index) => index,
            Err(0) => 0,
            Err(index) => index - 1,
        }
    }

    /// Insert keeping the order, returning the index used.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present.
    pub fn insert<C: Comparator<K>>(
        &mut self,
        key: K,
        payload: P,
        cmp: &C,
    ) -> Result<usize, Full<(K, P)>> {
        if self.is_full() {
            return Err(Full((key, payload)));
        }
        let Err(index) = self.locate(&key, cmp) else {
            panic!("duplicate key inserted into a node");
        };
        self.entries.insert(index, (key, payload));
        Ok(index)
    }

    /// Insert at a known position.
    ///
    /// # Panics
    ///
    /// Panics if the container is full or `index > len()`.
    pub fn insert_at(&mut self, index: usize, key: K, payload: P) {
        assert!(!self.is_full(), "insert into a full node");
        self.entries.insert(index, (key, payload));
    }

    /// Append an entry that sorts after every existing key.
    pub fn push_back(&mut self, key: K, payload: P) {
        self.insert_at(self.entries.len(), key, payload);
    }

    /// Prepend an entry that sorts before every existing key.
    pub fn push_front(&mut self, key: K, payload: P) {
        self.insert_at(0, key, payload);
    }

    pub fn pop_front(&mut self) -> Option<(K, P)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn pop_back(&mut self) -> Option<(K, P)> {
        self.entries.pop()
    }

    /// Remove and return the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> (K, P) {
        self.entries.remove(index)
    }

    /// Remove `count` entries from one end, preserving their order.
    pub fn remove_items(&mut self, from_front: bool, count: usize) -> Vec<(K, P)> {
        let count = count.min(self.entries.len());
        if from_front {
            self.entries.drain(..count).collect()
        } else {
            let start = self.entries.len() - count;
            self.entries.split_off(start)
        }
    }

    /// Take every entry out, leaving the container empty.
    pub fn pop_out_all(&mut self) -> Vec<(K, P)> {
        std::mem::take(&mut self.entries)
    }

    /// Split at `at`: entries `[at, len)` move into the returned container.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> Self {
        Self {
            entries: self.entries.split_off(at),
            capacity: self.capacity,
        }
    }

    /// Append all of `other`'s entries, which must sort after ours.
    ///
    /// # Panics
    ///
    /// Panics if the combined length exceeds capacity.
    pub fn absorb(&mut self, other: Vec<(K, P)>) {
        assert!(
            self.entries.len() + other.len() <= self.capacity,
            "merged node would overflow"
        );
        self.entries.extend(other);
    }

    #[must_use]
    pub fn key_at(&self, index: usize) -> &K {
        &self.entries[index].0
    }

    #[must_use]
    pub fn payload_at(&self, index: usize) -> &P {
        &self.entries[index].1
    }

    pub fn payload_at_mut(&mut self, index: usize) -> &mut P {
        &mut self.entries[index].1
    }

    /// Replace the key at `index`, returning the previous one.
    pub fn set_key_at(&mut self, index: usize, key: K) -> K {
        std::mem::replace(&mut self.entries[index].0, key)
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&K> {
        self.entries.first().map(|(k, _)| k)
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&K> {
        self.entries.last().map(|(k, _)| k)
    }

    /// Index of the first entry whose payload satisfies `predicate`.
    pub fn position_by(&self, mut predicate: impl FnMut(&P) -> bool) -> Option<usize> {
        self.entries.iter().position(|(_, p)| predicate(p))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (K, P)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn payloads(&self) -> impl Iterator<Item = &P> {
        self.entries.iter().map(|(_, p)| p)
    }
}

impl<'a, K, P> IntoIterator for &'a Elements<K, P> {
    type Item = &'a (K, P);
    type IntoIter = std::slice::Iter<'a, (K, P)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
