//! Split, merge, steal and min-key propagation.
//!
//! Written once over `Entry`, so leaves and middle nodes share the same
//! code. The only kind-specific steps are leaf-chain splicing and
//! re-parenting the children carried by middle entries, both of which
//! happen inside the operation that moves the entries.

use tracing::{debug, trace};

use super::btree::Btree;
use super::comparator::Comparator;
use super::node::{Entry, Node, NodeId};

/// Which logical sibling to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Previous,
    Next,
}

impl<K: Clone, V, C: Comparator<K>> Btree<K, V, C> {
    /// Put `entry` at `position` in `node`, adopting its child if it has one.
    fn place(&mut self, node: NodeId, position: usize, entry: Entry<K, V>) {
        let child = entry.child();
        self.nodes.get_mut(node).insert_at(position, entry);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(Some(node));
        }
    }

    fn append(&mut self, node: NodeId, entry: Entry<K, V>) {
        let len = self.nodes.get(node).len();
        self.place(node, len, entry);
    }

    fn take_front(&mut self, node: NodeId) -> Entry<K, V> {
        self.nodes
            .get_mut(node)
            .pop_front()
            .unwrap_or_else(|| panic!("node {node:?} is empty"))
    }

    fn take_back(&mut self, node: NodeId) -> Entry<K, V> {
        self.nodes
            .get_mut(node)
            .pop_back()
            .unwrap_or_else(|| panic!("node {node:?} is empty"))
    }

    fn min_key_of(&self, node: NodeId) -> K {
        self.nodes
            .get(node)
            .min_key()
            .cloned()
            .unwrap_or_else(|| panic!("node {node:?} is empty"))
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes
            .get(parent)
            .index_of_child(child)
            .unwrap_or_else(|| panic!("{child:?} is not a child of {parent:?}"))
    }

    /// The node at the same level immediately before or after `node`.
    ///
    /// Leaves answer from the leaf chain. Middle nodes look in their parent
    /// first and otherwise step into the parent's own neighbour, which may
    /// sit in a different subtree.
    pub(super) fn neighbor(&self, node: NodeId, side: Side) -> Option<NodeId> {
        match self.nodes.get(node) {
            Node::Leaf(leaf) => match side {
                Side::Previous => leaf.previous,
                Side::Next => leaf.next,
            },
            Node::Middle(middle) => {
                let parent = middle.parent?;
                let index = self.child_index(parent, node);
                let siblings = &self.nodes.middle(parent).elements;
                match side {
                    Side::Previous if index > 0 => return Some(*siblings.payload_at(index - 1)),
                    Side::Next if index + 1 < siblings.len() => {
                        return Some(*siblings.payload_at(index + 1));
                    }
                    _ => {}
                }
                let uncle = self.neighbor(parent, side)?;
                let cousins = &self.nodes.middle(uncle).elements;
                Some(match side {
                    Side::Previous => *cousins.payload_at(cousins.len() - 1),
                    Side::Next => *cousins.payload_at(0),
                })
            }
        }
    }

    /// Copy `node`'s first key into its parent, continuing upward while the
    /// updated entry is the parent's first.
    pub(super) fn refresh_min_key(&mut self, node: NodeId) {
        let mut current = node;
        while let Some(parent) = self.nodes.get(current).parent() {
            let Some(min) = self.nodes.get(current).min_key().cloned() else {
                return;
            };
            let index = self.child_index(parent, current);
            self.nodes.get_mut(parent).set_key_at(index, min);
            if index != 0 {
                return;
            }
            current = parent;
        }
    }

    /// Insert `entry` at `position` in `node`.
    ///
    /// A full node first tries to pass its minimum to a non-full previous
    /// sibling, then its maximum to a non-full next sibling, and only then
    /// splits.
    pub(super) fn insert_entry(&mut self, node: NodeId, position: usize, entry: Entry<K, V>) {
        if !self.nodes.get(node).is_full() {
            self.place(node, position, entry);
            if position == 0 {
                self.refresh_min_key(node);
            }
            return;
        }

        let has_room = |id: &NodeId| !self.nodes.get(*id).is_full();
        if let Some(previous) = self.neighbor(node, Side::Previous).filter(has_room) {
            self.exchange_min(node, previous, position, entry);
        } else if let Some(next) = self.neighbor(node, Side::Next).filter(has_room) {
            self.exchange_max(node, next, position, entry);
        } else {
            self.split_and_insert(node, position, entry);
        }
    }

    fn exchange_min(&mut self, node: NodeId, previous: NodeId, position: usize, entry: Entry<K, V>) {
        trace!(?node, ?previous, "exchange min");
        if position == 0 {
            self.append(previous, entry);
            return;
        }
        let min = self.take_front(node);
        self.append(previous, min);
        self.place(node, position - 1, entry);
        self.refresh_min_key(node);
    }

    fn exchange_max(&mut self, node: NodeId, next: NodeId, position: usize, entry: Entry<K, V>) {
        trace!(?node, ?next, "exchange max");
        if position == self.nodes.get(node).len() {
            self.place(next, 0, entry);
        } else {
            let max = self.take_back(node);
            self.place(next, 0, max);
            self.place(node, position, entry);
            if position == 0 {
                self.refresh_min_key(node);
            }
        }
        self.refresh_min_key(next);
    }

    /// Split a full `node` around `ceil((order + 1) / 2)` and insert `entry`
    /// into whichever half it belongs to.
    fn split_and_insert(&mut self, node: NodeId, position: usize, entry: Entry<K, V>) {
        let left_len = (self.order + 2) / 2;
        let split_at = if position < left_len {
            left_len - 1
        } else {
            left_len
        };

        let sibling = self.nodes.get_mut(node).split_off(split_at);
        let is_leaf = !sibling.is_middle();
        let right = self.nodes.alloc(sibling);
        let moved_children = self.nodes.get(right).children();
        for child in moved_children {
            self.nodes.get_mut(child).set_parent(Some(right));
        }
        if is_leaf {
            self.link_after(node, right);
        }

        if position < left_len {
            self.place(node, position, entry);
            if position == 0 {
                self.refresh_min_key(node);
            }
        } else {
            self.place(right, position - left_len, entry);
        }
        trace!(?node, ?right, is_leaf, "split node");

        self.child_split(node, right);
    }

    /// Splice `right` into the leaf chain directly after `left`.
    fn link_after(&mut self, left: NodeId, right: NodeId) {
        let next = self.nodes.leaf(left).next;
        let new_leaf = self.nodes.leaf_mut(right);
        new_leaf.previous = Some(left);
        new_leaf.next = next;
        self.nodes.leaf_mut(left).next = Some(right);
        if let Some(next) = next {
            self.nodes.leaf_mut(next).previous = Some(right);
        }
    }

    /// Register `right`, freshly split from `left`, with their parent,
    /// growing a new root when `left` was the root.
    fn child_split(&mut self, left: NodeId, right: NodeId) {
        let right_min = self.min_key_of(right);
        if let Some(parent) = self.nodes.get(left).parent() {
            let index = self.child_index(parent, left);
            self.insert_entry(parent, index + 1, Entry::Middle(right_min, right));
            return;
        }

        let mut root = Node::new_middle(self.order);
        root.push_back(Entry::Middle(self.min_key_of(left), left));
        root.push_back(Entry::Middle(right_min, right));
        let root = self.nodes.alloc(root);
        self.nodes.get_mut(left).set_parent(Some(root));
        self.nodes.get_mut(right).set_parent(Some(root));
        self.root = Some(root);
        debug!(height = self.height(), "grew root");
    }

    /// Restore the fill bound of `node` after it lost an entry.
    pub(super) fn rebalance_after_remove(&mut self, node: NodeId) {
        if self.root == Some(node) {
            self.shrink_root();
            return;
        }

        let len = self.nodes.get(node).len();
        if len == 0 {
            self.detach(node);
            return;
        }
        let low = self.min_fill();
        if len >= low {
            return;
        }

        let previous = self.neighbor(node, Side::Previous);
        let next = self.neighbor(node, Side::Next);
        let at_minimum = |id: &NodeId| self.nodes.get(*id).len() == low;

        if let Some(next) = next.filter(at_minimum) {
            self.merge_into(node, next);
            return;
        }
        if let Some(previous) = previous.filter(at_minimum) {
            self.merge_into(previous, node);
            return;
        }

        let surplus = |id: NodeId| self.nodes.get(id).len() - low;
        match (previous, next) {
            (Some(previous), Some(next)) if surplus(previous) > surplus(next) => {
                self.steal_from_previous(node, previous);
            }
            (_, Some(next)) => self.steal_from_next(node, next),
            (Some(previous), None) => self.steal_from_previous(node, previous),
            (None, None) => panic!("underfull node {node:?} has no siblings"),
        }
    }

    /// Move every entry of `absorbed` to the back of `keep`, then drop
    /// `absorbed` from the tree.
    fn merge_into(&mut self, keep: NodeId, absorbed: NodeId) {
        trace!(?keep, ?absorbed, "merge nodes");
        let entries = self.nodes.get_mut(absorbed).drain();
        let children: Vec<NodeId> = entries.iter().filter_map(Entry::child).collect();
        self.nodes.get_mut(keep).absorb(entries);
        for child in children {
            self.nodes.get_mut(child).set_parent(Some(keep));
        }
        self.detach(absorbed);
    }

    fn steal_from_next(&mut self, node: NodeId, next: NodeId) {
        trace!(?node, ?next, "steal from next");
        let entry = self.take_front(next);
        self.append(node, entry);
        self.refresh_min_key(next);
    }

    fn steal_from_previous(&mut self, node: NodeId, previous: NodeId) {
        trace!(?node, ?previous, "steal from previous");
        let entry = self.take_back(previous);
        self.place(node, 0, entry);
        self.refresh_min_key(node);
    }

    /// Unlink an empty non-root node and remove it from its parent.
    fn detach(&mut self, node: NodeId) {
        let parent = self
            .nodes
            .get(node)
            .parent()
            .unwrap_or_else(|| panic!("detach of parentless node {node:?}"));

        if let Node::Leaf(leaf) = self.nodes.get(node) {
            let (previous, next) = (leaf.previous, leaf.next);
            if let Some(previous) = previous {
                self.nodes.leaf_mut(previous).next = next;
            }
            if let Some(next) = next {
                self.nodes.leaf_mut(next).previous = previous;
            }
        }

        let index = self.child_index(parent, node);
        self.nodes.get_mut(parent).remove_at(index);
        self.nodes.release(node);
        if index == 0 {
            self.refresh_min_key(parent);
        }
        self.rebalance_after_remove(parent);
    }

    /// Drop an empty root, or replace a single-child middle root with its
    /// child, as many times as needed.
    fn shrink_root(&mut self) {
        while let Some(root) = self.root {
            let node = self.nodes.get(root);
            let sole_child = match node {
                Node::Leaf(_) if node.is_empty() => None,
                Node::Middle(middle) if middle.elements.len() <= 1 => {
                    middle.elements.payloads().next().copied()
                }
                _ => return,
            };

            self.nodes.release(root);
            self.root = sole_child;
            match sole_child {
                Some(child) => {
                    self.nodes.get_mut(child).set_parent(None);
                    debug!(height = self.height(), "collapsed root");
                }
                None => {
                    debug!("tree emptied");
                    return;
                }
            }
        }
    }
}
