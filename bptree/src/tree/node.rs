//! Leaf and middle nodes, stored in an arena and addressed by `NodeId`.
//!
//! Nodes never own each other directly. A middle node's entries carry the
//! ids of its children, and every node records the id of its parent, so
//! sibling and parent queries are plain arena lookups instead of
//! back-pointers.

use super::elements::Elements;

/// Stable handle to a node inside one tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    Leaf = 0,
    Middle = 1,
}

impl TryFrom<u8> for NodeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Leaf),
            1 => Ok(Self::Middle),
            _ => Err(value),
        }
    }
}

/// A leaf holding `(key, value)` entries.
///
/// `previous`/`next` link every leaf into one chain in key order.
#[derive(Debug)]
pub struct LeafNode<K, V> {
    pub elements: Elements<K, V>,
    pub parent: Option<NodeId>,
    pub previous: Option<NodeId>,
    pub next: Option<NodeId>,
}

/// An internal node holding `(min key of child, child)` entries.
#[derive(Debug)]
pub struct MiddleNode<K> {
    pub elements: Elements<K, NodeId>,
    pub parent: Option<NodeId>,
}

/// One entry lifted out of a node, tagged with the node kind it came from.
///
/// Moving entries between nodes of the same kind goes through this type so
/// split, merge and steal are written once for both kinds.
#[derive(Debug)]
pub enum Entry<K, V> {
    Leaf(K, V),
    Middle(K, NodeId),
}

impl<K, V> Entry<K, V> {
    #[must_use]
    pub const fn key(&self) -> &K {
        match self {
            Self::Leaf(k, _) | Self::Middle(k, _) => k,
        }
    }

    /// The child this entry points at, if it is a middle entry.
    #[must_use]
    pub const fn child(&self) -> Option<NodeId> {
        match self {
            Self::Leaf(..) => None,
            Self::Middle(_, child) => Some(*child),
        }
    }
}

/// A tree node.
#[derive(Debug)]
pub enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Middle(MiddleNode<K>),
}

impl<K, V> Node<K, V> {
    #[must_use]
    pub fn new_leaf(order: usize) -> Self {
        Self::Leaf(LeafNode {
            elements: Elements::new(order),
            parent: None,
            previous: None,
            next: None,
        })
    }

    #[must_use]
    pub fn new_middle(order: usize) -> Self {
        Self::Middle(MiddleNode {
            elements: Elements::new(order),
            parent: None,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Middle(_) => NodeKind::Middle,
        }
    }

    #[must_use]
    pub const fn is_middle(&self) -> bool {
        matches!(self, Self::Middle(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.elements.len(),
            Self::Middle(middle) => middle.elements.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.elements.is_full(),
            Self::Middle(middle) => middle.elements.is_full(),
        }
    }

    /// The node's first key, which its parent caches.
    #[must_use]
    pub fn min_key(&self) -> Option<&K> {
        match self {
            Self::Leaf(leaf) => leaf.elements.first_key(),
            Self::Middle(middle) => middle.elements.first_key(),
        }
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        match self {
            Self::Leaf(leaf) => leaf.parent,
            Self::Middle(middle) => middle.parent,
        }
    }

    pub const fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Self::Leaf(leaf) => leaf.parent = parent,
            Self::Middle(middle) => middle.parent = parent,
        }
    }

    /// Children of a middle node in key order; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::Middle(middle) => middle.elements.payloads().copied().collect(),
        }
    }

    /// Insert an entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the entry kind differs from the node kind or the node is full.
    pub fn insert_at(&mut self, index: usize, entry: Entry<K, V>) {
        match (self, entry) {
            (Self::Leaf(leaf), Entry::Leaf(k, v)) => leaf.elements.insert_at(index, k, v),
            (Self::Middle(middle), Entry::Middle(k, c)) => middle.elements.insert_at(index, k, c),
            _ => panic!("entry kind does not match node kind"),
        }
    }

    pub fn push_back(&mut self, entry: Entry<K, V>) {
        let len = self.len();
        self.insert_at(len, entry);
    }

    pub fn push_front(&mut self, entry: Entry<K, V>) {
        self.insert_at(0, entry);
    }

    pub fn remove_at(&mut self, index: usize) -> Entry<K, V> {
        match self {
            Self::Leaf(leaf) => {
                let (k, v) = leaf.elements.remove_at(index);
                Entry::Leaf(k, v)
            }
            Self::Middle(middle) => {
                let (k, c) = middle.elements.remove_at(index);
                Entry::Middle(k, c)
            }
        }
    }

    pub fn pop_front(&mut self) -> Option<Entry<K, V>> {
        if self.is_empty() {
            None
        } else {
            Some(self.remove_at(0))
        }
    }

    pub fn pop_back(&mut self) -> Option<Entry<K, V>> {
        let len = self.len();
        if len == 0 {
            None
        } else {
            Some(self.remove_at(len - 1))
        }
    }

    /// Move entries `[at, len)` into a new node of the same kind.
    ///
    /// The new node shares this node's parent and has no leaf links yet.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(LeafNode {
                elements: leaf.elements.split_off(at),
                parent: leaf.parent,
                previous: None,
                next: None,
            }),
            Self::Middle(middle) => Self::Middle(MiddleNode {
                elements: middle.elements.split_off(at),
                parent: middle.parent,
            }),
        }
    }

    /// Append `entries` behind this node's own in one transfer.
    ///
    /// # Panics
    ///
    /// Panics on a kind mismatch, or if the node would overflow.
    pub fn absorb(&mut self, entries: Vec<Entry<K, V>>) {
        match self {
            Self::Leaf(leaf) => leaf.elements.absorb(
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        Entry::Leaf(k, v) => (k, v),
                        Entry::Middle(..) => panic!("middle entry merged into a leaf"),
                    })
                    .collect(),
            ),
            Self::Middle(middle) => middle.elements.absorb(
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        Entry::Middle(k, c) => (k, c),
                        Entry::Leaf(..) => panic!("leaf entry merged into a middle node"),
                    })
                    .collect(),
            ),
        }
    }

    /// Take every entry out of this node.
    pub fn drain(&mut self) -> Vec<Entry<K, V>> {
        match self {
            Self::Leaf(leaf) => leaf
                .elements
                .pop_out_all()
                .into_iter()
                .map(|(k, v)| Entry::Leaf(k, v))
                .collect(),
            Self::Middle(middle) => middle
                .elements
                .pop_out_all()
                .into_iter()
                .map(|(k, c)| Entry::Middle(k, c))
                .collect(),
        }
    }

    /// Position of `child` among this node's entries.
    #[must_use]
    pub fn index_of_child(&self, child: NodeId) -> Option<usize> {
        match self {
            Self::Leaf(_) => None,
            Self::Middle(middle) => middle.elements.position_by(|c| *c == child),
        }
    }

    /// Overwrite the cached key at `index`.
    pub fn set_key_at(&mut self, index: usize, key: K) {
        match self {
            Self::Leaf(leaf) => {
                leaf.elements.set_key_at(index, key);
            }
            Self::Middle(middle) => {
                middle.elements.set_key_at(index, key);
            }
        }
    }
}

/// Slab of nodes for one tree, with id reuse.
#[derive(Debug)]
pub struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> Default for NodeArena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeArena<K, V> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store a node, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the arena exceeds `u32::MAX` nodes.
    pub fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let raw = u32::try_from(self.slots.len()).unwrap_or_else(|_| panic!("node arena is full"));
        self.slots.push(Some(node));
        NodeId(raw)
    }

    /// Remove a node, returning it.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not live.
    pub fn release(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.slots[id.index()]
            .take()
            .unwrap_or_else(|| panic!("release of dead node {id:?}"));
        self.free.push(id);
        node
    }

    /// Number of live nodes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node<K, V> {
        self.slots[id.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("access to dead node {id:?}"))
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.slots[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("access to dead node {id:?}"))
    }

    #[must_use]
    pub fn leaf(&self, id: NodeId) -> &LeafNode<K, V> {
        match self.get(id) {
            Node::Leaf(leaf) => leaf,
            Node::Middle(_) => panic!("node {id:?} is not a leaf"),
        }
    }

    pub fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K, V> {
        match self.get_mut(id) {
            Node::Leaf(leaf) => leaf,
            Node::Middle(_) => panic!("node {id:?} is not a leaf"),
        }
    }

    #[must_use]
    pub fn middle(&self, id: NodeId) -> &MiddleNode<K> {
        match self.get(id) {
            Node::Middle(middle) => middle,
            Node::Leaf(_) => panic!("node {id:?} is not a middle node"),
        }
    }

    pub fn middle_mut(&mut self, id: NodeId) -> &mut MiddleNode<K> {
        match self.get_mut(id) {
            Node::Middle(middle) => middle,
            Node::Leaf(_) => panic!("node {id:?} is not a middle node"),
        }
    }
}
