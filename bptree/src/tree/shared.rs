//! Scoped shared access to one tree.
//!
//! The tree itself has no locking. `SharedTree` serialises mutations with
//! a read-write lock: lookups may run together, a mutation runs alone, and
//! references handed to a closure cannot outlive its scope.

use std::sync::{Arc, PoisonError, RwLock};

use super::btree::Btree;
use super::comparator::{Comparator, Natural};

/// A tree behind `Arc<RwLock<..>>`.
pub struct SharedTree<K, V, C = Natural> {
    inner: Arc<RwLock<Btree<K, V, C>>>,
}

impl<K, V, C> Clone for SharedTree<K, V, C> {
    #[allow(clippy::disallowed_methods)] // Arc::clone is the point of this handle
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Clone, V, C: Comparator<K>> SharedTree<K, V, C> {
    #[must_use]
    pub fn new(tree: Btree<K, V, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// Run `f` with shared access.
    ///
    /// A lock poisoned by a panicking writer is still entered; run
    /// `check_invariants` if that matters to the caller.
    pub fn read<R>(&self, f: impl FnOnce(&Btree<K, V, C>) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut Btree<K, V, C>) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Take the tree back if this is the last handle.
    pub fn try_unwrap(self) -> Result<Btree<K, V, C>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}
