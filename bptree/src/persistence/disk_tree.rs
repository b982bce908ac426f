//! Stored form of a tree.
//!
//! Every node is its own object. A middle node stores its children as
//! `DiskPtr`s, so the store's relation tree sees the whole node graph and
//! can reclaim it when the tree object is rewritten. Leaves carry no
//! sibling links; the chain is rebuilt on load.

use crate::store::{ByteConverter, ByteReader, ConvertError, DiskPtr, ObjectBytes};
use crate::tree::NodeKind;

/// One stored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskNode<K, V> {
    Leaf(Vec<(K, V)>),
    Middle(Vec<(K, DiskPtr<Self>)>),
}

impl<K, V> DiskNode<K, V> {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Middle(_) => NodeKind::Middle,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(entries) => entries.len(),
            Self::Middle(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: ByteConverter, V: ByteConverter> ByteConverter for DiskNode<K, V> {
    fn write_down(&self, out: &mut ObjectBytes) {
        (self.kind() as u8).write_down(out);
        match self {
            Self::Leaf(entries) => entries.write_down(out),
            Self::Middle(entries) => entries.write_down(out),
        }
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let tag = u8::read_out(reader)?;
        let kind = NodeKind::try_from(tag).map_err(|tag| ConvertError::InvalidTag {
            type_name: "DiskNode",
            tag,
        })?;
        match kind {
            NodeKind::Leaf => Ok(Self::Leaf(Vec::read_out(reader)?)),
            NodeKind::Middle => Ok(Self::Middle(Vec::read_out(reader)?)),
        }
    }
}

/// Stored tree header: order, key count, and the root node if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTree<K, V> {
    pub order: u64,
    pub key_count: u64,
    pub root: Option<DiskPtr<DiskNode<K, V>>>,
}

impl<K: ByteConverter, V: ByteConverter> ByteConverter for DiskTree<K, V> {
    fn write_down(&self, out: &mut ObjectBytes) {
        self.order.write_down(out);
        self.key_count.write_down(out);
        self.root.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        Ok(Self {
            order: u64::read_out(reader)?,
            key_count: u64::read_out(reader)?,
            root: Option::read_out(reader)?,
        })
    }
}
