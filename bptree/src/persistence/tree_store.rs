//! Saving a tree into a `FileStore` and loading it back.

use std::sync::Arc;

use tracing::debug;

use super::convert::TypeConverter;
use super::disk_tree::{DiskNode, DiskTree};
use crate::store::{DiskPtr, FileStore, Label, Storage, StoreError};
use crate::tree::{
    Btree, Comparator, Entry, InvariantViolation, MIN_ORDER, Natural, Node, NodeArena, NodeId,
    TreeError, raw,
};

/// Deepest node nesting accepted while loading.
const MAX_LOAD_DEPTH: usize = 64;

/// Errors that can occur while saving or loading a tree.
#[derive(Debug)]
pub enum PersistError<K> {
    /// Store error.
    Store(StoreError),
    /// The stored order or entries are not a valid tree.
    Tree(TreeError<K>),
    /// The loaded structure breaks a tree invariant.
    Corrupt(String),
    /// The store has no root label.
    MissingRoot,
}

impl<K: std::fmt::Debug> std::fmt::Display for PersistError<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Tree(e) => write!(f, "tree error: {e}"),
            Self::Corrupt(msg) => write!(f, "corrupt tree: {msg}"),
            Self::MissingRoot => write!(f, "store has no root object"),
        }
    }
}

impl<K: std::fmt::Debug + 'static> std::error::Error for PersistError<K> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Tree(e) => Some(e),
            Self::Corrupt(_) | Self::MissingRoot => None,
        }
    }
}

impl<K> From<StoreError> for PersistError<K> {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl<K> From<TreeError<K>> for PersistError<K> {
    fn from(e: TreeError<K>) -> Self {
        Self::Tree(e)
    }
}

impl<K> From<InvariantViolation> for PersistError<K> {
    fn from(e: InvariantViolation) -> Self {
        Self::Corrupt(e.to_string())
    }
}

type StoredTree<K, V> = DiskTree<<K as TypeConverter>::Disk, <V as TypeConverter>::Disk>;
type StoredNode<K, V> = DiskNode<<K as TypeConverter>::Disk, <V as TypeConverter>::Disk>;

impl<K, V, C> Btree<K, V, C>
where
    K: TypeConverter + Clone,
    V: TypeConverter,
    C: Comparator<K>,
{
    /// Save under the store's root label, creating one if the store has
    /// none, and record it as the root.
    ///
    /// Nodes of a tree previously saved under the same label are released.
    pub fn save<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Label, StoreError> {
        let label = match store.root() {
            Some(label) => label,
            None => store.new_object(),
        };
        self.save_to(store, label)?;
        store.set_root(Some(label));
        Ok(label)
    }

    /// Save under `label`.
    pub fn save_to<S: Storage>(&self, store: &mut FileStore<S>, label: Label) -> Result<(), StoreError> {
        let disk = self.to_disk_tree(store)?;
        store.store(label, disk)?;
        debug!(label, keys = self.len(), height = self.height(), "saved tree");
        Ok(())
    }

    /// Write every node as its own object and return the tree header.
    pub fn to_disk_tree<S: Storage>(&self, store: &mut FileStore<S>) -> Result<StoredTree<K, V>, StoreError> {
        let (nodes, root) = raw::parts(self);
        let root = root.map(|id| save_node(nodes, id, store)).transpose()?;
        Ok(DiskTree {
            order: self.order() as u64,
            key_count: self.len() as u64,
            root,
        })
    }
}

fn save_node<K, V, S>(
    nodes: &NodeArena<K, V>,
    id: NodeId,
    store: &mut FileStore<S>,
) -> Result<DiskPtr<StoredNode<K, V>>, StoreError>
where
    K: TypeConverter,
    V: TypeConverter,
    S: Storage,
{
    let node = match nodes.get(id) {
        Node::Leaf(leaf) => {
            let mut entries = Vec::with_capacity(leaf.elements.len());
            for (key, value) in &leaf.elements {
                entries.push((key.to_disk(store)?, value.to_disk(store)?));
            }
            DiskNode::Leaf(entries)
        }
        Node::Middle(middle) => {
            let mut entries = Vec::with_capacity(middle.elements.len());
            for (key, child) in &middle.elements {
                entries.push((key.to_disk(store)?, save_node(nodes, *child, store)?));
            }
            DiskNode::Middle(entries)
        }
    };
    DiskPtr::new_in(store, node)
}

impl<K, V> Btree<K, V, Natural>
where
    K: TypeConverter + Clone + std::fmt::Debug,
    V: TypeConverter,
    Natural: Comparator<K>,
{
    /// Load the tree stored under `label`.
    pub fn load<S: Storage>(store: &mut FileStore<S>, label: Label) -> Result<Self, PersistError<K>> {
        Self::load_with(store, label, Natural)
    }

    /// Load the tree stored under the store's root label.
    pub fn load_root<S: Storage>(store: &mut FileStore<S>) -> Result<Self, PersistError<K>> {
        let label = store.root().ok_or(PersistError::MissingRoot)?;
        Self::load(store, label)
    }
}

impl<K, V, C> Btree<K, V, C>
where
    K: TypeConverter + Clone + std::fmt::Debug,
    V: TypeConverter,
    C: Comparator<K>,
{
    /// Load the tree stored under `label`, ordered by `comparator`.
    ///
    /// The comparator must be the one the tree was saved with. The rebuilt
    /// structure is checked against every tree invariant before it is
    /// returned.
    pub fn load_with<S: Storage>(
        store: &mut FileStore<S>,
        label: Label,
        comparator: C,
    ) -> Result<Self, PersistError<K>> {
        let disk: Arc<StoredTree<K, V>> = store.read(label)?;
        let order = usize::try_from(disk.order)
            .map_err(|_| PersistError::Corrupt(format!("order {} does not fit", disk.order)))?;
        let key_count = usize::try_from(disk.key_count)
            .map_err(|_| PersistError::Corrupt(format!("key count {} does not fit", disk.key_count)))?;
        if order < MIN_ORDER {
            return Err(TreeError::InvalidOrder(order).into());
        }

        let mut loader = Loader {
            order,
            nodes: NodeArena::new(),
            leaves: Vec::new(),
        };
        let root = match &disk.root {
            Some(ptr) => Some(loader.load_node(ptr, None, 0, store)?),
            None => None,
        };
        loader.link_leaves();

        let tree = raw::assemble(order, comparator, loader.nodes, root, key_count);
        tree.check_invariants()?;
        debug!(label, keys = key_count, height = tree.height(), "loaded tree");
        Ok(tree)
    }
}

/// Rebuilds an arena from stored nodes, collecting leaves left to right.
struct Loader<K, V> {
    order: usize,
    nodes: NodeArena<K, V>,
    leaves: Vec<NodeId>,
}

impl<K, V> Loader<K, V>
where
    K: TypeConverter,
    V: TypeConverter,
{
    fn load_node<S: Storage>(
        &mut self,
        ptr: &DiskPtr<StoredNode<K, V>>,
        parent: Option<NodeId>,
        depth: usize,
        store: &mut FileStore<S>,
    ) -> Result<NodeId, PersistError<K>> {
        if depth > MAX_LOAD_DEPTH {
            return Err(PersistError::Corrupt(format!(
                "nesting deeper than {MAX_LOAD_DEPTH} levels"
            )));
        }
        let disk = ptr.clone().load(store)?;
        if disk.len() > self.order {
            return Err(PersistError::Corrupt(format!(
                "node {} holds {} entries, order is {}",
                ptr.label(),
                disk.len(),
                self.order
            )));
        }

        match disk.as_ref() {
            DiskNode::Leaf(entries) => {
                let mut node = Node::new_leaf(self.order);
                node.set_parent(parent);
                for (key, value) in entries {
                    node.push_back(Entry::Leaf(K::from_disk(key, store)?, V::from_disk(value, store)?));
                }
                let id = self.nodes.alloc(node);
                self.leaves.push(id);
                Ok(id)
            }
            DiskNode::Middle(entries) => {
                let mut node = Node::new_middle(self.order);
                node.set_parent(parent);
                let id = self.nodes.alloc(node);
                for (key, child) in entries {
                    let key = K::from_disk(key, store)?;
                    let child = self.load_node(child, Some(id), depth + 1, store)?;
                    self.nodes.get_mut(id).push_back(Entry::Middle(key, child));
                }
                Ok(id)
            }
        }
    }

    fn link_leaves(&mut self) {
        for pair in self.leaves.windows(2) {
            self.nodes.leaf_mut(pair[0]).next = Some(pair[1]);
            self.nodes.leaf_mut(pair[1]).previous = Some(pair[0]);
        }
    }
}
