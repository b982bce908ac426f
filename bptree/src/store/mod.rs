//! Label-addressed object persistence.
//!
//! A store file holds a metadata region at offset 0 (allocation table,
//! object relation tree, root label) followed by a data region of
//! length-prefixed objects. See [`metadata`] and [`file`] for the exact
//! layouts.
//!
//! ```no_run
//! use bptree::store::FileStore;
//!
//! # fn main() -> Result<(), bptree::store::StoreError> {
//! let mut store = FileStore::create(std::path::Path::new("objects.db"))?;
//! let (label, _) = store.insert(String::from("hello"))?;
//! store.set_root(Some(label));
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod bytes;
pub mod cache;
pub mod disk_ptr;
pub mod file;
pub mod io;
pub mod metadata;
pub mod relation;

pub use allocator::{AllocatorError, FILE_LABEL, Label, Region, StorageAllocator};
pub use bytes::{ByteConverter, ByteReader, ConvertError, ObjectBytes, from_bytes, to_bytes};
pub use disk_ptr::DiskPtr;
pub use file::{FileStore, StoreError};
pub use io::{DiskStorage, Storage, StorageError};
pub use metadata::MetadataError;
