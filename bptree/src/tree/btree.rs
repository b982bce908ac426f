//! The tree facade.
//!
//! `Btree` owns the node arena, the root id, the key count and the
//! comparator. Public operations route a key from the root to its leaf and
//! hand structural work to the rebalancing code in `rebalance.rs`.

use tracing::trace;

use super::comparator::{Comparator, Natural};
use super::error::{MIN_ORDER, TreeError};
use super::iter::{Iter, Keys};
use super::node::{Entry, Node, NodeArena, NodeId};
use crate::config::IndexConfig;

/// An order-parameterised B+Tree.
///
/// Every node holds at most `order` entries; every node other than the root
/// holds at least `ceil(order / 2)`. Values live only in leaves, and the
/// leaves are chained in key order.
///
/// # Invariants
///
/// - `is_empty() == (len() == 0) == root.is_none()`
/// - Each middle entry's key is the minimum key of the subtree it points at
/// - All leaves are at the same depth
#[derive(Debug)]
pub struct Btree<K, V, C = Natural> {
    pub(super) order: usize,
    pub(super) comparator: C,
    pub(super) nodes: NodeArena<K, V>,
    pub(super) root: Option<NodeId>,
    pub(super) key_count: usize,
}

impl<K: Clone, V> Btree<K, V, Natural>
where
    Natural: Comparator<K>,
{
    /// Create an empty tree ordered by `K: Ord`.
    pub fn new(order: usize) -> Result<Self, TreeError<K>> {
        Self::with_comparator(order, Natural)
    }

    /// Create an empty tree using the order from `config`.
    pub fn with_config(config: &IndexConfig) -> Result<Self, TreeError<K>> {
        Self::new(config.order)
    }
}

impl<K: Clone, V, C: Comparator<K>> Btree<K, V, C> {
    /// Create an empty tree with a custom comparator.
    pub fn with_comparator(order: usize, comparator: C) -> Result<Self, TreeError<K>> {
        if order < MIN_ORDER {
            return Err(TreeError::InvalidOrder(order));
        }
        Ok(Self {
            order,
            comparator,
            nodes: NodeArena::new(),
            root: None,
            key_count: 0,
        })
    }

    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    #[must_use]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Number of keys stored.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.key_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of levels, 0 for an empty tree.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = match self.nodes.get(id) {
                Node::Leaf(_) => None,
                Node::Middle(middle) => Some(*middle.elements.payload_at(0)),
            };
        }
        height
    }

    /// Entries in the root node: children for a middle root, keys for a
    /// leaf root.
    #[must_use]
    pub fn root_fanout(&self) -> usize {
        self.root.map_or(0, |root| self.nodes.get(root).len())
    }

    /// Number of leaves, counted along the leaf chain.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut current = self.first_leaf();
        while let Some(id) = current {
            count += 1;
            current = self.nodes.leaf(id).next;
        }
        count
    }

    /// Minimum entries for a non-root node.
    pub(super) const fn min_fill(&self) -> usize {
        self.order.div_ceil(2)
    }

    /// Walk from the root to the leaf responsible for `key`.
    pub(super) fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            match self.nodes.get(current) {
                Node::Leaf(_) => return Some(current),
                Node::Middle(middle) => {
                    let index = middle.elements.select_branch(key, &self.comparator);
                    current = *middle.elements.payload_at(index);
                }
            }
        }
    }

    /// The leftmost leaf, where the leaf chain starts.
    pub(super) fn first_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        while let Node::Middle(middle) = self.nodes.get(current) {
            current = *middle.elements.payload_at(0);
        }
        Some(current)
    }

    /// The rightmost leaf.
    pub(super) fn last_leaf(&self) -> Option<NodeId> {
        let mut current = self.root?;
        while let Node::Middle(middle) = self.nodes.get(current) {
            current = *middle.elements.payload_at(middle.elements.len() - 1);
        }
        Some(current)
    }

    /// Look up the value stored under `key`.
    pub fn search(&self, key: &K) -> Result<&V, TreeError<K>> {
        let leaf = self.find_leaf(key).ok_or(TreeError::NotFound)?;
        let elements = &self.nodes.leaf(leaf).elements;
        match elements.locate(key, &self.comparator) {
            Ok(index) => Ok(elements.payload_at(index)),
            Err(_) => Err(TreeError::NotFound),
        }
    }

    /// Mutable access to the value stored under `key`.
    pub fn search_mut(&mut self, key: &K) -> Result<&mut V, TreeError<K>> {
        let leaf = self.find_leaf(key).ok_or(TreeError::NotFound)?;
        let elements = &mut self.nodes.leaf_mut(leaf).elements;
        match elements.locate(key, &self.comparator) {
            Ok(index) => Ok(elements.payload_at_mut(index)),
            Err(_) => Err(TreeError::NotFound),
        }
    }

    /// Returns true if `key` is stored.
    #[must_use]
    pub fn have(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    /// Insert a new key.
    ///
    /// Fails with `DuplicateKey` if the key is present; the tree is left
    /// unchanged in that case.
    pub fn add(&mut self, key: K, value: V) -> Result<(), TreeError<K>> {
        let Some(leaf) = self.find_leaf(&key) else {
            let mut node = Node::new_leaf(self.order);
            node.push_back(Entry::Leaf(key, value));
            self.root = Some(self.nodes.alloc(node));
            self.key_count = 1;
            return Ok(());
        };

        let position = match self.nodes.leaf(leaf).elements.locate(&key, &self.comparator) {
            Ok(_) => return Err(TreeError::DuplicateKey(key)),
            Err(position) => position,
        };
        self.insert_entry(leaf, position, Entry::Leaf(key, value));
        self.key_count += 1;
        Ok(())
    }

    /// Replace the value of an existing key, returning the old value.
    pub fn modify(&mut self, key: &K, value: V) -> Result<V, TreeError<K>> {
        let slot = self.search_mut(key)?;
        Ok(std::mem::replace(slot, value))
    }

    /// Remove `key`, returning its value. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let leaf = self.find_leaf(key)?;
        let position = self
            .nodes
            .leaf(leaf)
            .elements
            .locate(key, &self.comparator)
            .ok()?;

        let (_, value) = self.nodes.leaf_mut(leaf).elements.remove_at(position);
        self.key_count -= 1;
        if position == 0 {
            self.refresh_min_key(leaf);
        }
        self.rebalance_after_remove(leaf);
        trace!(remaining = self.key_count, "removed key");
        Some(value)
    }

    /// Every key in order, collected by walking the leaf chain.
    #[must_use]
    pub fn explore(&self) -> Vec<K> {
        self.keys().cloned().collect()
    }

    /// Iterate `(key, value)` pairs in order along the leaf chain.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.nodes, self.first_leaf(), self.key_count)
    }

    /// Iterate keys in order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Smallest entry.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.leaf(self.first_leaf()?);
        leaf.elements.iter().next().map(|(k, v)| (k, v))
    }

    /// Largest entry.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.leaf(self.last_leaf()?);
        leaf.elements.iter().last().map(|(k, v)| (k, v))
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.key_count = 0;
    }
}

impl<'a, K: Clone, V, C: Comparator<K>> IntoIterator for &'a Btree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
