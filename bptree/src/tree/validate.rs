//! Structural invariant checks.
//!
//! Used by tests, by the simulation harness and when a tree is loaded from
//! a store, where the structure comes from bytes rather than from our own
//! algorithms.

use super::btree::Btree;
use super::comparator::Comparator;
use super::error::InvariantViolation;
use super::node::{Node, NodeId};

impl<K: Clone + std::fmt::Debug, V, C: Comparator<K>> Btree<K, V, C> {
    /// Verify every structural invariant, reporting the first failure.
    ///
    /// Checked: key count and root agree, keys strictly sorted inside each
    /// node, fill bounds, cached min keys, parent links, separation between
    /// sibling subtrees, uniform leaf depth, and that the leaf chain visits
    /// exactly the leaves in order.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.root else {
            if self.key_count != 0 {
                return Err(InvariantViolation::new(
                    "empty-root",
                    format!("no root but key count is {}", self.key_count),
                ));
            }
            return Ok(());
        };
        if self.nodes.get(root).parent().is_some() {
            return Err(InvariantViolation::new("root-parent", "root has a parent"));
        }

        let mut walk = Walk::default();
        self.check_node(root, 0, &mut walk)?;

        if walk.entries != self.key_count {
            return Err(InvariantViolation::new(
                "key-count",
                format!("{} entries in leaves, key count {}", walk.entries, self.key_count),
            ));
        }
        if walk.visited != self.nodes.live_count() {
            return Err(InvariantViolation::new(
                "orphan-node",
                format!(
                    "{} reachable nodes, {} live in the arena",
                    walk.visited,
                    self.nodes.live_count()
                ),
            ));
        }
        self.check_leaf_chain(&walk.leaves)
    }

    /// Returns the smallest and largest key under `id`.
    fn check_node(&self, id: NodeId, depth: usize, walk: &mut Walk) -> Result<(K, K), InvariantViolation> {
        walk.visited += 1;
        let node = self.nodes.get(id);
        let is_root = self.root == Some(id);
        let len = node.len();

        if len > self.order {
            return Err(InvariantViolation::new(
                "overflow",
                format!("{id:?} holds {len} entries, order {}", self.order),
            ));
        }
        let floor = match (is_root, node) {
            (true, Node::Leaf(_)) => 1,
            (true, Node::Middle(_)) => 2,
            (false, _) => self.min_fill(),
        };
        if len < floor {
            return Err(InvariantViolation::new(
                "underflow",
                format!("{id:?} holds {len} entries, needs {floor}"),
            ));
        }

        match node {
            Node::Leaf(leaf) => {
                let keys: Vec<&K> = leaf.elements.keys().collect();
                self.check_sorted(id, &keys)?;
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(InvariantViolation::new(
                            "leaf-depth",
                            format!("{id:?} at depth {depth}, other leaves at {expected}"),
                        ));
                    }
                    Some(_) => {}
                }
                walk.entries += len;
                walk.leaves.push(id);
                Ok((keys[0].clone(), keys[len - 1].clone()))
            }
            Node::Middle(middle) => {
                let keys: Vec<&K> = middle.elements.keys().collect();
                self.check_sorted(id, &keys)?;
                let mut last_max: Option<K> = None;
                for (index, (cached, child)) in middle.elements.iter().enumerate() {
                    if self.nodes.get(*child).parent() != Some(id) {
                        return Err(InvariantViolation::new(
                            "parent-link",
                            format!("child {child:?} of {id:?} points elsewhere"),
                        ));
                    }
                    let (min, max) = self.check_node(*child, depth + 1, walk)?;
                    if !self.comparator.equal(cached, &min) {
                        return Err(InvariantViolation::new(
                            "min-key",
                            format!("{id:?} caches {cached:?} for child {index}, actual min {min:?}"),
                        ));
                    }
                    if let Some(previous_max) = &last_max {
                        if !self.comparator.less(previous_max, &min) {
                            return Err(InvariantViolation::new(
                                "separation",
                                format!(
                                    "child {index} of {id:?} starts at {min:?} after {previous_max:?}"
                                ),
                            ));
                        }
                    }
                    last_max = Some(max);
                }
                let min = keys[0].clone();
                let max = last_max.unwrap_or_else(|| min.clone());
                Ok((min, max))
            }
        }
    }

    fn check_sorted(&self, id: NodeId, keys: &[&K]) -> Result<(), InvariantViolation> {
        for pair in keys.windows(2) {
            if !self.comparator.less(pair[0], pair[1]) {
                return Err(InvariantViolation::new(
                    "sorted",
                    format!("{id:?} has {:?} before {:?}", pair[0], pair[1]),
                ));
            }
        }
        Ok(())
    }

    /// The chain from the first leaf must match the depth-first leaf order.
    fn check_leaf_chain(&self, leaves: &[NodeId]) -> Result<(), InvariantViolation> {
        let mut previous: Option<NodeId> = None;
        let mut current = leaves.first().copied();
        let mut steps = 0;

        while let Some(id) = current {
            if leaves.get(steps) != Some(&id) {
                return Err(InvariantViolation::new(
                    "leaf-chain",
                    format!("step {steps} reached {id:?}, expected {:?}", leaves.get(steps)),
                ));
            }
            let leaf = self.nodes.leaf(id);
            if leaf.previous != previous {
                return Err(InvariantViolation::new(
                    "leaf-chain",
                    format!("{id:?} links back to {:?}, expected {previous:?}", leaf.previous),
                ));
            }
            previous = Some(id);
            current = leaf.next;
            steps += 1;
        }

        if steps != leaves.len() {
            return Err(InvariantViolation::new(
                "leaf-chain",
                format!("chain visits {steps} leaves, tree has {}", leaves.len()),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    visited: usize,
    entries: usize,
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
}
