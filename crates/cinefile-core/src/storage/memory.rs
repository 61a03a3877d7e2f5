//! MemoryStore - HashMap-backed durable store for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{check_key, DurableStore};
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Vec<u8>>,
    quota: Option<usize>,
}

/// In-memory store backed by a HashMap.
///
/// Clone-friendly via Arc: clones share the same entries, so a clone kept by
/// a test sees everything the collections wrote. An optional byte quota
/// (keys plus values, across all entries) makes writes fail the way a full
/// host storage area does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store that refuses writes beyond `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        let store = Self::new();
        store.set_quota(Some(limit));
        store
    }

    /// Change or lift the byte quota. Existing entries are kept.
    pub fn set_quota(&self, limit: Option<usize>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.quota = limit;
        }
    }

    /// Total bytes currently held (keys plus values).
    pub fn used_bytes(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.entries.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .read()
            .map(|inner| inner.entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))
    }
}

impl DurableStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        Ok(self.read_inner()?.entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        let mut inner = self.write_inner()?;

        if let Some(limit) = inner.quota {
            let others: usize = inner
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + bytes.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        inner.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
