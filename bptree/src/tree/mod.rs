//! In-memory B+Tree.
//!
//! # Layout
//!
//! Nodes live in an arena owned by the tree and refer to each other by
//! `NodeId`:
//!
//! - Leaf nodes hold `(key, value)` entries and are doubly linked in key
//!   order, so a full scan never visits a middle node.
//! - Middle nodes hold `(key, child)` entries, where the key is the
//!   smallest key stored under that child.
//!
//! Routing picks the last entry whose key is not greater than the search
//! key. A full node hands an entry to a sibling with room before it
//! splits; an underfull node merges with a sibling sitting at the minimum
//! before it steals.
//!
//! # Usage
//!
//! ```
//! use bptree::tree::Btree;
//!
//! let mut tree: Btree<u32, &str> = Btree::new(4)?;
//! tree.add(2, "two")?;
//! tree.add(1, "one")?;
//! assert_eq!(tree.search(&1)?, &"one");
//! assert_eq!(tree.explore(), vec![1, 2]);
//! # Ok::<(), bptree::tree::TreeError<u32>>(())
//! ```

mod btree;
mod bulk;
mod comparator;
mod elements;
mod error;
mod iter;
mod node;
mod rebalance;
mod shared;
mod validate;

pub use btree::Btree;
pub use comparator::{Comparator, FnComparator, Natural, Reversed};
pub use elements::{Elements, Full};
pub use error::{InvariantViolation, MIN_ORDER, TreeError};
pub use iter::{Iter, Keys};
pub use node::{Entry, LeafNode, MiddleNode, Node, NodeArena, NodeId, NodeKind};
pub use shared::SharedTree;

/// Crate-internal access to the raw tree parts, for persistence.
pub(crate) mod raw {
    use super::btree::Btree;
    use super::comparator::Comparator;
    use super::node::{NodeArena, NodeId};

    /// Borrow the arena and root of a tree.
    pub fn parts<K: Clone, V, C: Comparator<K>>(
        tree: &Btree<K, V, C>,
    ) -> (&NodeArena<K, V>, Option<NodeId>) {
        (&tree.nodes, tree.root)
    }

    /// Assemble a tree from an arena the caller has filled and linked.
    pub fn assemble<K: Clone, V, C: Comparator<K>>(
        order: usize,
        comparator: C,
        nodes: NodeArena<K, V>,
        root: Option<NodeId>,
        key_count: usize,
    ) -> Btree<K, V, C> {
        Btree {
            order,
            comparator,
            nodes,
            root,
            key_count,
        }
    }
}
