//! Mapping in-memory values to their stored form.
//!
//! Byte conversion handles flat values. A `TypeConverter` sits one level
//! above it: it rewrites owning pointers into `DiskPtr`s stored as objects
//! of their own, so a value graph becomes a set of labelled objects.

use crate::store::{ByteConverter, DiskPtr, FileStore, Storage, StoreError};

/// Conversion between a value and its disk representation.
pub trait TypeConverter: Sized {
    /// Stored form of the value.
    type Disk: ByteConverter + Send + Sync + 'static;

    /// Convert for storage, writing any owned sub-objects.
    fn to_disk<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Self::Disk, StoreError>;

    /// Rebuild from the stored form, loading any sub-objects.
    fn from_disk<S: Storage>(disk: &Self::Disk, store: &mut FileStore<S>) -> Result<Self, StoreError>;
}

macro_rules! impl_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            #[allow(clippy::clone_on_copy)]
            impl TypeConverter for $ty {
                type Disk = Self;

                fn to_disk<S: Storage>(&self, _store: &mut FileStore<S>) -> Result<Self, StoreError> {
                    Ok(self.clone())
                }

                fn from_disk<S: Storage>(disk: &Self, _store: &mut FileStore<S>) -> Result<Self, StoreError> {
                    Ok(disk.clone())
                }
            }
        )*
    };
}

impl_identity!(
    u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64, usize, bool, String
);

impl<T: TypeConverter> TypeConverter for Vec<T> {
    type Disk = Vec<T::Disk>;

    fn to_disk<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Self::Disk, StoreError> {
        self.iter().map(|item| item.to_disk(store)).collect()
    }

    fn from_disk<S: Storage>(disk: &Self::Disk, store: &mut FileStore<S>) -> Result<Self, StoreError> {
        disk.iter().map(|item| T::from_disk(item, store)).collect()
    }
}

impl<T: TypeConverter> TypeConverter for Option<T> {
    type Disk = Option<T::Disk>;

    fn to_disk<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Self::Disk, StoreError> {
        self.as_ref().map(|value| value.to_disk(store)).transpose()
    }

    fn from_disk<S: Storage>(disk: &Self::Disk, store: &mut FileStore<S>) -> Result<Self, StoreError> {
        disk.as_ref().map(|value| T::from_disk(value, store)).transpose()
    }
}

impl<A: TypeConverter, B: TypeConverter> TypeConverter for (A, B) {
    type Disk = (A::Disk, B::Disk);

    fn to_disk<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Self::Disk, StoreError> {
        Ok((self.0.to_disk(store)?, self.1.to_disk(store)?))
    }

    fn from_disk<S: Storage>(disk: &Self::Disk, store: &mut FileStore<S>) -> Result<Self, StoreError> {
        Ok((A::from_disk(&disk.0, store)?, B::from_disk(&disk.1, store)?))
    }
}

/// A boxed value becomes an object of its own, referenced by label.
impl<T: TypeConverter> TypeConverter for Box<T> {
    type Disk = DiskPtr<T::Disk>;

    fn to_disk<S: Storage>(&self, store: &mut FileStore<S>) -> Result<Self::Disk, StoreError> {
        let disk = self.as_ref().to_disk(store)?;
        DiskPtr::new_in(store, disk)
    }

    fn from_disk<S: Storage>(disk: &Self::Disk, store: &mut FileStore<S>) -> Result<Self, StoreError> {
        let mut ptr = disk.clone();
        let loaded = ptr.load(store)?;
        Ok(Self::new(T::from_disk(loaded.as_ref(), store)?))
    }
}
