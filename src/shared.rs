//! Single-writer, multi-reader access to a set or map.
//!
//! Tries are not synchronized internally. [`Shared`] puts one behind a
//! `parking_lot::RwLock`: any number of readers may query at once, and a
//! mutation waits for exclusive access.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::map::TrieMap;
use crate::set::TrieSet;

/// A [`TrieSet`] or [`TrieMap`] behind a reader-writer lock.
#[derive(Debug, Default)]
pub struct Shared<T> {
    inner: RwLock<T>,
}

/// Lock-guarded [`TrieSet`].
pub type SharedSet = Shared<TrieSet>;

/// Lock-guarded [`TrieMap`].
pub type SharedMap<V> = Shared<TrieMap<V>>;

impl<T> Shared<T> {
    /// Wrap an existing set or map.
    pub fn new(inner: T) -> Self {
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Shared access for queries. Blocks while a writer holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Exclusive access for mutation. Blocks until all readers are done.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Direct access when the wrapper itself is uniquely borrowed.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Unwrap the set or map.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> From<T> for Shared<T> {
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

impl Shared<TrieSet> {
    /// Add `key` under the write lock.
    pub fn set(&self, key: u64) -> Result<bool> {
        self.inner.write().set(key)
    }

    /// Remove `key` under the write lock.
    pub fn unset(&self, key: u64) -> bool {
        self.inner.write().unset(key)
    }

    /// Whether `key` is present.
    pub fn test(&self, key: u64) -> bool {
        self.inner.read().test(key)
    }

    /// Number of keys present.
    pub fn count_all(&self) -> u64 {
        self.inner.read().count_all()
    }

    /// Number of keys in `low..=high`.
    pub fn count_range(&self, low: u64, high: u64) -> u64 {
        self.inner.read().count_range(low, high)
    }
}

impl<V: Clone> Shared<TrieMap<V>> {
    /// Insert or overwrite under the write lock, returning the previous value.
    pub fn insert(&self, key: u64, value: V) -> Result<Option<V>> {
        self.inner.write().insert(key, value)
    }

    /// Clone of the value stored under `key`.
    pub fn get(&self, key: u64) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// Remove `key` under the write lock, returning its value.
    pub fn remove(&self, key: u64) -> Option<V> {
        self.inner.write().remove(key)
    }

    /// Number of keys present.
    pub fn count_all(&self) -> u64 {
        self.inner.read().count_all()
    }

    /// Number of keys in `low..=high`.
    pub fn count_range(&self, low: u64, high: u64) -> u64 {
        self.inner.read().count_range(low, high)
    }
}
