//! Bottom-up construction from a batch of entries.

use tracing::debug;

use super::btree::Btree;
use super::comparator::{Comparator, Natural};
use super::error::TreeError;
use super::node::{Entry, Node, NodeId};

/// Sizes of consecutive nodes holding `total` entries.
///
/// Nodes are filled to `order` from the left; if the last node would fall
/// below `ceil(order / 2)` the last two share their entries evenly.
pub(super) fn chunk_sizes(total: usize, order: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let count = total.div_ceil(order);
    let mut sizes = vec![order; count];
    let last = total - order * (count - 1);
    sizes[count - 1] = last;

    let low = order.div_ceil(2);
    if count > 1 && last < low {
        let combined = order + last;
        sizes[count - 2] = combined.div_ceil(2);
        sizes[count - 1] = combined / 2;
    }
    sizes
}

impl<K: Clone, V> Btree<K, V, Natural>
where
    Natural: Comparator<K>,
{
    /// Build a tree from unsorted entries ordered by `K: Ord`.
    pub fn from_entries(order: usize, entries: Vec<(K, V)>) -> Result<Self, TreeError<K>> {
        Self::from_entries_with(order, Natural, entries)
    }
}

impl<K: Clone, V, C: Comparator<K>> Btree<K, V, C> {
    /// Build a tree from unsorted entries with a custom comparator.
    ///
    /// Entries are sorted first; a repeated key fails with `DuplicateKey`
    /// before any node is built. Leaves are filled left to right, chained,
    /// and grouped under middle levels until one root remains.
    pub fn from_entries_with(
        order: usize,
        comparator: C,
        mut entries: Vec<(K, V)>,
    ) -> Result<Self, TreeError<K>> {
        let mut tree = Self::with_comparator(order, comparator)?;

        entries.sort_by(|a, b| tree.comparator.compare(&a.0, &b.0));
        if let Some(pair) = entries
            .windows(2)
            .find(|pair| tree.comparator.equal(&pair[0].0, &pair[1].0))
        {
            return Err(TreeError::DuplicateKey(pair[1].0.clone()));
        }
        if entries.is_empty() {
            return Ok(tree);
        }

        tree.key_count = entries.len();
        let mut level = tree.build_leaves(entries);
        let mut levels = 1;
        while level.len() > 1 {
            level = tree.build_middles(level);
            levels += 1;
        }
        tree.root = level.pop().map(|(_, id)| id);
        debug!(keys = tree.key_count, levels, "bulk built tree");
        Ok(tree)
    }

    /// Create and chain the leaves, returning `(min key, id)` per leaf.
    fn build_leaves(&mut self, entries: Vec<(K, V)>) -> Vec<(K, NodeId)> {
        let sizes = chunk_sizes(entries.len(), self.order);
        let mut source = entries.into_iter();
        let mut built: Vec<(K, NodeId)> = Vec::with_capacity(sizes.len());

        for size in sizes {
            let mut node = Node::new_leaf(self.order);
            for (key, value) in source.by_ref().take(size) {
                node.push_back(Entry::Leaf(key, value));
            }
            let min = node.min_key().cloned();
            let id = self.nodes.alloc(node);
            if let Some((_, previous)) = built.last() {
                let previous = *previous;
                self.nodes.leaf_mut(previous).next = Some(id);
                self.nodes.leaf_mut(id).previous = Some(previous);
            }
            if let Some(min) = min {
                built.push((min, id));
            }
        }
        built
    }

    /// Group one level of nodes under a new level of middle nodes.
    fn build_middles(&mut self, children: Vec<(K, NodeId)>) -> Vec<(K, NodeId)> {
        let sizes = chunk_sizes(children.len(), self.order);
        let mut source = children.into_iter();
        let mut built = Vec::with_capacity(sizes.len());

        for size in sizes {
            let group: Vec<(K, NodeId)> = source.by_ref().take(size).collect();
            let Some(min) = group.first().map(|(key, _)| key.clone()) else {
                continue;
            };
            let mut node = Node::new_middle(self.order);
            let ids: Vec<NodeId> = group.iter().map(|(_, id)| *id).collect();
            for (key, child) in group {
                node.push_back(Entry::Middle(key, child));
            }
            let id = self.nodes.alloc(node);
            for child in ids {
                self.nodes.get_mut(child).set_parent(Some(id));
            }
            built.push((min, id));
        }
        built
    }
}
