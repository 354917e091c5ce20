//! Entries: identity-stable key/value bindings shared between the set and callers.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an entry. Every handle for the same binding points at the
/// same allocation; compare with [`Arc::ptr_eq`] for identity.
pub type EntryRef<K, V> = Arc<Entry<K, V>>;

/// An immutable key and its precomputed hash, plus an interior-mutable value.
///
/// Entries are created once per key by the set's factory and updated in place
/// afterwards. A soft or weak binding in the set only stays resolvable while
/// something keeps an `EntryRef` alive.
pub struct Entry<K, V> {
    key: K,
    hash: u64,
    value: RwLock<V>,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, hash: u64, value: V) -> Self {
        Self {
            key,
            hash,
            value: RwLock::new(value),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Hash computed by the owning set's hasher when the entry was created.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn read(&self) -> RwLockReadGuard<'_, V> {
        self.value.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, V> {
        self.value.write()
    }

    /// Store a new value, returning the previous one.
    pub fn replace(&self, value: V) -> V {
        std::mem::replace(&mut *self.value.write(), value)
    }

    pub fn get(&self) -> V
    where
        V: Clone,
    {
        self.value.read().clone()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Entry");
        d.field("key", &self.key).field("hash", &self.hash);
        match self.value.try_read() {
            Some(v) => d.field("value", &*v),
            None => d.field("value", &"<locked>"),
        };
        d.finish()
    }
}
