//! In-order iteration along the leaf chain.

use super::node::{NodeArena, NodeId};

/// Iterator over `(key, value)` pairs in key order.
///
/// Starts at the leftmost leaf and follows `next` links, never touching
/// middle nodes.
pub struct Iter<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    leaf: Option<NodeId>,
    index: usize,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) const fn new(nodes: &'a NodeArena<K, V>, first_leaf: Option<NodeId>, len: usize) -> Self {
        Self {
            nodes,
            leaf: first_leaf,
            index: 0,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.nodes.leaf(self.leaf?);
            if self.index < leaf.elements.len() {
                let key = leaf.elements.key_at(self.index);
                let value = leaf.elements.payload_at(self.index);
                self.index += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((key, value));
            }
            self.leaf = leaf.next;
            self.index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over keys in order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(super) const fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
