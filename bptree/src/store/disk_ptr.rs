//! Handle to an object stored under its own label.

use std::sync::Arc;

use super::allocator::Label;
use super::bytes::{ByteConverter, ByteReader, ConvertError, ObjectBytes};
use super::file::{FileStore, StoreError};
use super::io::Storage;

/// A label plus an optional in-memory copy of the object behind it.
///
/// Loading and storing go through a `FileStore` explicitly; nothing is
/// read or written implicitly. Encoding a `DiskPtr` writes only its label
/// and records the label as a reference of the enclosing object.
#[derive(Debug)]
pub struct DiskPtr<T> {
    label: Label,
    cached: Option<Arc<T>>,
}

impl<T> DiskPtr<T> {
    /// Point at `label` without loading it.
    #[must_use]
    pub const fn from_label(label: Label) -> Self {
        Self {
            label,
            cached: None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> Label {
        self.label
    }

    /// The in-memory copy, if loaded.
    #[must_use]
    pub fn cached(&self) -> Option<&T> {
        self.cached.as_deref()
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    /// Forget the in-memory copy.
    pub fn unload(&mut self) {
        self.cached = None;
    }
}

impl<T> DiskPtr<T>
where
    T: ByteConverter + Send + Sync + 'static,
{
    /// Store `value` under a fresh label.
    pub fn new_in<S: Storage>(store: &mut FileStore<S>, value: T) -> Result<Self, StoreError> {
        let (label, cached) = store.insert(value)?;
        Ok(Self {
            label,
            cached: Some(cached),
        })
    }

    /// Load the object, through the store's cache.
    #[allow(clippy::disallowed_methods)] // Arc::clone shares the loaded object
    pub fn load<S: Storage>(&mut self, store: &mut FileStore<S>) -> Result<Arc<T>, StoreError> {
        if let Some(cached) = &self.cached {
            return Ok(Arc::clone(cached));
        }
        let loaded = store.read::<T>(self.label)?;
        self.cached = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Write the in-memory copy back under the same label.
    ///
    /// Does nothing when nothing is loaded.
    pub fn store<S: Storage>(&self, store: &mut FileStore<S>) -> Result<(), StoreError> {
        match &self.cached {
            Some(value) => store.write(self.label, value.as_ref()),
            None => Ok(()),
        }
    }

    /// Replace the object with `value` and write it.
    pub fn replace<S: Storage>(&mut self, store: &mut FileStore<S>, value: T) -> Result<(), StoreError> {
        self.cached = Some(store.store(self.label, value)?);
        Ok(())
    }
}

impl<T> Clone for DiskPtr<T> {
    #[allow(clippy::disallowed_methods)] // Arc::clone shares the loaded object
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            cached: self.cached.as_ref().map(Arc::clone),
        }
    }
}

impl<T> PartialEq for DiskPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl<T> Eq for DiskPtr<T> {}

impl<T> ByteConverter for DiskPtr<T> {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn write_down(&self, out: &mut ObjectBytes) {
        self.label.write_down(out);
        out.add_reference(self.label);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        Ok(Self::from_label(Label::read_out(reader)?))
    }
}
