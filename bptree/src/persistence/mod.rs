//! Storing trees in a `FileStore`.
//!
//! Keys and values go through a [`TypeConverter`] to reach their stored
//! form. Each node becomes one object; middle nodes point at their children
//! through `DiskPtr`s.
//!
//! ```no_run
//! use bptree::store::FileStore;
//! use bptree::tree::Btree;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = std::path::Path::new("index.db");
//! let mut tree: Btree<u64, String> = Btree::new(4)?;
//! tree.add(1, String::from("one"))?;
//!
//! let mut store = FileStore::create(path)?;
//! tree.save(&mut store)?;
//! store.close()?;
//!
//! let mut store = FileStore::open(path)?;
//! let tree: Btree<u64, String> = Btree::load_root(&mut store)?;
//! assert!(tree.have(&1));
//! # Ok(())
//! # }
//! ```

mod convert;
mod disk_tree;
mod tree_store;

pub use convert::TypeConverter;
pub use disk_tree::{DiskNode, DiskTree};
pub use tree_store::PersistError;
