//! File object store.
//!
//! A `FileStore` ties the allocator, the byte converter and an object
//! cache to one `Storage`. Objects are addressed by label; each one is
//! written into its region as a length-prefixed frame:
//!
//! ```text
//! 0   payload length   8 bytes
//! 8   payload          `payload length` bytes
//! ```
//!
//! A frame that no longer fits its region is relocated to the frontier;
//! a smaller or equal one is rewritten in place.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::allocator::{AllocatorError, Label, Region, StorageAllocator};
use super::bytes::{ByteConverter, ConvertError, from_bytes, to_bytes};
use super::cache::{CachedObject, ObjectCache};
use super::io::{DiskStorage, Storage, StorageError};
use super::metadata::{HEADER_SIZE, Header, Metadata, MetadataError};
use super::relation::ObjectRelationTree;
use crate::config::IndexConfig;

/// Bytes in front of every stored payload.
pub const FRAME_HEADER_SIZE: u64 = 8;

/// Errors that can occur in the file object store.
#[derive(Debug)]
pub enum StoreError {
    /// Storage I/O error.
    Storage(StorageError),
    /// Label bookkeeping error.
    Allocator(AllocatorError),
    /// Metadata region error.
    Metadata(MetadataError),
    /// Object bytes failed to decode.
    Convert(ConvertError),
    /// `create` was pointed at an existing file.
    AlreadyExists(PathBuf),
    /// The label was handed out but never written.
    NotStored(Label),
    /// The cached object under this label has a different type.
    TypeMismatch(Label),
    /// The stored frame does not fit the label's region.
    CorruptObject { label: Label, message: String },
}

impl StoreError {
    /// Returns true if the error is a use of a deallocated label.
    #[must_use]
    pub const fn is_invalid_access(&self) -> bool {
        matches!(self, Self::Allocator(AllocatorError::InvalidAccess(_)))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Allocator(e) => write!(f, "allocator error: {e}"),
            Self::Metadata(e) => write!(f, "metadata error: {e}"),
            Self::Convert(e) => write!(f, "decode error: {e}"),
            Self::AlreadyExists(path) => write!(f, "file already exists: {}", path.display()),
            Self::NotStored(label) => write!(f, "label {label} was never stored"),
            Self::TypeMismatch(label) => write!(f, "object {label} has a different type"),
            Self::CorruptObject { label, message } => {
                write!(f, "corrupt object {label}: {message}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Allocator(e) => Some(e),
            Self::Metadata(e) => Some(e),
            Self::Convert(e) => Some(e),
            Self::AlreadyExists(_)
            | Self::NotStored(_)
            | Self::TypeMismatch(_)
            | Self::CorruptObject { .. } => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<AllocatorError> for StoreError {
    fn from(e: AllocatorError) -> Self {
        Self::Allocator(e)
    }
}

impl From<MetadataError> for StoreError {
    fn from(e: MetadataError) -> Self {
        Self::Metadata(e)
    }
}

impl From<ConvertError> for StoreError {
    fn from(e: ConvertError) -> Self {
        Self::Convert(e)
    }
}

/// Label-addressed object store over one `Storage`.
///
/// Metadata is written on `flush`, on `close`, and on drop. Labels taken
/// with `new_object` and never written are deallocated on close.
#[derive(Debug)]
pub struct FileStore<S: Storage = DiskStorage> {
    storage: S,
    path: Option<PathBuf>,
    metadata: Metadata,
    cache: ObjectCache,
    not_stored: BTreeSet<Label>,
    closed: bool,
}

impl FileStore<DiskStorage> {
    /// Create a new store file with the default configuration.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        Self::create_with(path, &IndexConfig::default())
    }

    /// Create a new store file. Fails if `path` exists.
    pub fn create_with(path: &Path, config: &IndexConfig) -> Result<Self, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        let storage = DiskStorage::create(path)?;
        let mut store = Self::init(storage, config)?;
        store.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            metadata_size = config.metadata_size,
            "created store"
        );
        Ok(store)
    }

    /// Open an existing store file with the default configuration.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with(path, &IndexConfig::default())
    }

    /// Open an existing store file.
    ///
    /// The metadata budget recorded in the file wins over `config`.
    pub fn open_with(path: &Path, config: &IndexConfig) -> Result<Self, StoreError> {
        let storage = DiskStorage::open(path)?;
        let mut store = Self::load(storage, config)?;
        store.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            labels = store.metadata.allocator.label_count(),
            frontier = store.metadata.allocator.frontier(),
            "opened store"
        );
        Ok(store)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl<S: Storage> FileStore<S> {
    /// Initialise an empty store on `storage`, writing fresh metadata.
    pub fn init(storage: S, config: &IndexConfig) -> Result<Self, StoreError> {
        let mut store = Self {
            storage,
            path: None,
            metadata: Metadata::new(config.metadata_size),
            cache: ObjectCache::new(config.cache_capacity),
            not_stored: BTreeSet::new(),
            closed: false,
        };
        store.flush()?;
        Ok(store)
    }

    /// Load a store previously written to `storage`.
    pub fn load(mut storage: S, config: &IndexConfig) -> Result<Self, StoreError> {
        let mut header = [0u8; HEADER_SIZE];
        storage.read_at(0, &mut header)?;
        let header = Header::parse(&header)?;

        let body_len = usize::try_from(header.body_len)
            .map_err(|_| ConvertError::LengthOverflow(header.body_len))?;
        let mut body = vec![0u8; body_len];
        storage.read_at(HEADER_SIZE as u64, &mut body)?;
        let metadata = Metadata::decode(&header, &body)?;

        Ok(Self {
            storage,
            path: None,
            metadata,
            cache: ObjectCache::new(config.cache_capacity),
            not_stored: BTreeSet::new(),
            closed: false,
        })
    }

    /// Reserve a label for an object that will be written later.
    pub fn new_object(&mut self) -> Label {
        let label = self.metadata.allocator.allocate_label();
        self.not_stored.insert(label);
        label
    }

    /// Serialize `value` under `label`.
    ///
    /// Writes in place when the frame fits the current region, otherwise
    /// relocates. Labels the previous content referenced and nothing
    /// references any more are deallocated.
    pub fn write<T: ByteConverter>(&mut self, label: Label, value: &T) -> Result<(), StoreError> {
        let (payload, references) = to_bytes(value).into_parts();
        let payload_len = payload.len() as u64;
        let frame_len = FRAME_HEADER_SIZE + payload_len;

        let allocator = &mut self.metadata.allocator;
        let offset = if allocator.is_ready(label) {
            let region = allocator.region(label)?;
            if frame_len <= region.size {
                region.offset
            } else {
                let offset = allocator.resize_space_to(label, frame_len)?;
                debug!(
                    label,
                    from = region.offset,
                    to = offset,
                    size = frame_len,
                    "relocated object"
                );
                offset
            }
        } else {
            allocator.give_space_to(label, frame_len)?
        };

        let mut frame = payload_len.to_le_bytes().to_vec();
        frame.extend_from_slice(&payload);
        self.cache.remove(label);
        self.storage.write_at(offset, &frame)?;
        trace!(label, offset, len = frame_len, "wrote object");

        self.not_stored.remove(&label);
        let released = self.metadata.relations.update(label, &references);
        self.release(released)
    }

    /// Write `value` under `label` and cache it.
    #[allow(clippy::disallowed_methods)] // Arc::clone shares the cached object
    pub fn store<T>(&mut self, label: Label, value: T) -> Result<Arc<T>, StoreError>
    where
        T: ByteConverter + Send + Sync + 'static,
    {
        self.write(label, &value)?;
        let value = Arc::new(value);
        self.cache.insert(label, Arc::clone(&value) as CachedObject);
        Ok(value)
    }

    /// Store `value` under a fresh label.
    pub fn insert<T>(&mut self, value: T) -> Result<(Label, Arc<T>), StoreError>
    where
        T: ByteConverter + Send + Sync + 'static,
    {
        let label = self.new_object();
        let value = self.store(label, value)?;
        Ok((label, value))
    }

    /// Read the object under `label`, from the cache if present.
    #[allow(clippy::disallowed_methods)] // Arc::clone shares the cached object
    pub fn read<T>(&mut self, label: Label) -> Result<Arc<T>, StoreError>
    where
        T: ByteConverter + Send + Sync + 'static,
    {
        if let Some(object) = self.cache.get(label) {
            return object
                .downcast::<T>()
                .map_err(|_| StoreError::TypeMismatch(label));
        }
        if self.not_stored.contains(&label) {
            return Err(StoreError::NotStored(label));
        }

        let region = self.metadata.allocator.region(label)?;
        let payload = self.read_frame(label, region)?;
        let value = Arc::new(from_bytes::<T>(&payload)?);
        trace!(label, offset = region.offset, "loaded object");
        self.cache.insert(label, Arc::clone(&value) as CachedObject);
        Ok(value)
    }

    /// Deallocate `label` and everything only it kept alive.
    pub fn delete(&mut self, label: Label) -> Result<(), StoreError> {
        self.metadata.allocator.deallocate(label)?;
        self.cache.remove(label);
        self.not_stored.remove(&label);
        if self.metadata.root == Some(label) {
            self.metadata.root = None;
        }
        let released = self.metadata.relations.remove(label);
        self.release(released)
    }

    /// Label recorded as the entry point of the file.
    #[must_use]
    pub const fn root(&self) -> Option<Label> {
        self.metadata.root
    }

    pub const fn set_root(&mut self, root: Option<Label>) {
        self.metadata.root = root;
    }

    /// Write the metadata region and sync.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let bytes = self.metadata.encode()?;
        self.storage.write_at(0, &bytes)?;
        self.storage.sync()?;
        Ok(())
    }

    /// Deallocate never-stored labels and flush.
    pub fn close(mut self) -> Result<(), StoreError> {
        let result = self.finish();
        self.closed = true;
        result
    }

    #[must_use]
    pub const fn allocator(&self) -> &StorageAllocator {
        &self.metadata.allocator
    }

    #[must_use]
    pub const fn relations(&self) -> &ObjectRelationTree {
        &self.metadata.relations
    }

    #[must_use]
    pub const fn metadata_size(&self) -> u64 {
        self.metadata.metadata_size
    }

    /// Region currently holding `label`.
    pub fn region(&self, label: Label) -> Result<Region, StoreError> {
        Ok(self.metadata.allocator.region(label)?)
    }

    #[must_use]
    pub fn is_cached(&self, label: Label) -> bool {
        self.cache.contains(label)
    }

    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached object; later reads go to storage.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn read_frame(&mut self, label: Label, region: Region) -> Result<Vec<u8>, StoreError> {
        if region.size < FRAME_HEADER_SIZE {
            return Err(StoreError::CorruptObject {
                label,
                message: format!("region of {} bytes has no frame header", region.size),
            });
        }
        let mut prefix = [0u8; 8];
        self.storage.read_at(region.offset, &mut prefix)?;
        let payload_len = u64::from_le_bytes(prefix);
        if payload_len > region.size - FRAME_HEADER_SIZE {
            return Err(StoreError::CorruptObject {
                label,
                message: format!(
                    "payload of {payload_len} bytes overruns region of {} bytes",
                    region.size
                ),
            });
        }

        let len = usize::try_from(payload_len).map_err(|_| ConvertError::LengthOverflow(payload_len))?;
        let mut payload = vec![0u8; len];
        self.storage
            .read_at(region.offset + FRAME_HEADER_SIZE, &mut payload)?;
        Ok(payload)
    }

    fn release(&mut self, labels: Vec<Label>) -> Result<(), StoreError> {
        for label in labels {
            self.metadata.allocator.deallocate(label)?;
            self.cache.remove(label);
            self.not_stored.remove(&label);
            if self.metadata.root == Some(label) {
                self.metadata.root = None;
            }
            trace!(label, "released unreferenced object");
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        let unused = std::mem::take(&mut self.not_stored);
        if !unused.is_empty() {
            debug!(count = unused.len(), "releasing labels never stored");
        }
        self.metadata.allocator.deallocate_all(unused)?;
        self.flush()
    }
}

impl<S: Storage> Drop for FileStore<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.finish() {
            warn!(error = %e, "failed to flush store on drop");
        }
    }
}
