//! Persisted - a collection value mirrored to one durable key.
//!
//! The container loads its value once, hands out shared references for
//! reads, and commits the *entire* value back to the durable store after each
//! mutation that reports a change. There is no batching: the durable copy is
//! at most one mutation behind memory.
//!
//! Failures never reach the caller as errors. A missing or corrupt stored
//! value loads as the empty collection; a rejected write keeps the in-memory
//! change, logs a warning and leaves the container out of sync until a later
//! write succeeds or [`Persisted::flush`] is called.
//!
//! A value whose read failed (as opposed to one that was read and found
//! corrupt) also loads empty, but commits do not overwrite it: whatever the
//! backend holds may still be intact. Only an explicit [`Persisted::flush`]
//! replaces it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::event::StoreEvent;
use crate::storage::DurableStore;

/// A collection value bound to a durable storage key.
#[derive(Debug)]
pub struct Persisted<T> {
    key: String,
    value: T,
    backend: Arc<dyn DurableStore>,
    synced: bool,
    load_failed: bool,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Load the value stored at `key`, or start empty.
    pub fn load(key: impl Into<String>, backend: Arc<dyn DurableStore>) -> Self {
        let key = key.into();
        let mut load_failed = false;

        let value = match backend.read(&key) {
            Ok(None) => T::default(),
            // A stored `null` is treated like a missing key.
            Ok(Some(bytes)) => match serde_json::from_slice::<Option<T>>(&bytes) {
                Ok(value) => value.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(
                        "Stored value for '{}' is corrupt ({} bytes): {}, starting empty",
                        key,
                        bytes.len(),
                        e
                    );
                    T::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read '{}': {}, starting empty without overwriting it",
                    key,
                    e
                );
                load_failed = true;
                T::default()
            }
        };

        Self {
            key,
            value,
            backend,
            synced: !load_failed,
            load_failed,
            subscribers: Vec::new(),
        }
    }

    /// Storage key this value is mirrored to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current in-memory value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Whether the durable copy matches memory.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Receive an event after every commit attempt.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Mutate the value in place and commit it if `f` returns `true`.
    ///
    /// Returns what `f` returned. The mutation is never rolled back, even if
    /// the durable write fails.
    pub fn modify(&mut self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = f(&mut self.value);
        if changed {
            self.commit();
        }
        changed
    }

    /// Mutate the value without writing it. The durable copy is marked stale
    /// when `f` returns `true` and catches up on the next commit.
    pub fn repair(&mut self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = f(&mut self.value);
        if changed {
            self.synced = false;
        }
        changed
    }

    /// Whether the stored value could not be read at load.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Write the current value if the durable copy is stale.
    ///
    /// Does nothing when already in sync. Refuses with
    /// [`StorageError::LoadFailed`] when the stored value was never read;
    /// use [`Persisted::flush`] to overwrite it deliberately.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        if self.synced {
            return Ok(());
        }
        if self.load_failed {
            return Err(StorageError::LoadFailed {
                key: self.key.clone(),
            });
        }
        self.flush()
    }

    /// Write the current value now, returning the backend error if any.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        match self.write_through() {
            Ok(()) => {
                self.synced = true;
                self.load_failed = false;
                self.emit(StoreEvent::Committed {
                    key: self.key.clone(),
                });
                Ok(())
            }
            Err(e) => {
                self.synced = false;
                self.emit(StoreEvent::WriteFailed {
                    key: self.key.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn commit(&mut self) {
        if self.load_failed {
            let err = StorageError::LoadFailed {
                key: self.key.clone(),
            };
            tracing::warn!("{}, keeping in-memory change", err);
            self.synced = false;
            self.emit(StoreEvent::WriteFailed {
                key: self.key.clone(),
                reason: err.to_string(),
            });
            return;
        }

        match self.flush() {
            Ok(()) => tracing::debug!("Committed '{}'", self.key),
            Err(e) => tracing::warn!(
                "Failed to persist '{}': {}, keeping in-memory change",
                self.key,
                e
            ),
        }
    }

    fn write_through(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&self.value)?;
        self.backend.write(&self.key, &bytes)
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn backend() -> (MemoryStore, Arc<dyn DurableStore>) {
        let store = MemoryStore::new();
        let shared: Arc<dyn DurableStore> = Arc::new(store.clone());
        (store, shared)
    }

    #[test]
    fn load_missing_key_is_empty() {
        let (_, shared) = backend();
        let list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        assert!(list.get().is_empty());
        assert!(list.is_synced());
    }

    #[test]
    fn load_null_is_empty() {
        let (store, shared) = backend();
        store.write("numbers", b"null").unwrap();
        let list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        assert!(list.get().is_empty());
    }

    #[test]
    fn load_corrupt_or_wrong_shape_is_empty() {
        let samples: [&[u8]; 4] = [b"{not json", br#"{"a":1}"#, br#""text""#, &[0xff, 0xfe]];
        for raw in samples {
            let (store, shared) = backend();
            store.write("numbers", raw).unwrap();
            let list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
            assert!(list.get().is_empty());
        }
    }

    #[test]
    fn modify_writes_whole_value() {
        let (store, shared) = backend();
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);

        assert!(list.modify(|v| {
            v.push(1);
            v.push(2);
            true
        }));
        assert_eq!(store.read("numbers").unwrap().as_deref(), Some(&b"[1,2]"[..]));

        list.modify(|v| {
            v[0] = 7;
            true
        });
        assert_eq!(store.read("numbers").unwrap().as_deref(), Some(&b"[7,2]"[..]));
    }

    #[test]
    fn unchanged_modify_does_not_write() {
        let (store, shared) = backend();
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        assert!(!list.modify(|_| false));
        assert!(store.read("numbers").unwrap().is_none());
    }

    #[test]
    fn failed_write_keeps_memory_and_flush_recovers() {
        let store = MemoryStore::with_quota(4);
        let shared: Arc<dyn DurableStore> = Arc::new(store.clone());
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        let events = list.subscribe();

        list.modify(|v| {
            v.extend([10, 20, 30]);
            true
        });
        assert_eq!(list.get(), &vec![10, 20, 30]);
        assert!(!list.is_synced());
        assert!(store.read("numbers").unwrap().is_none());
        assert!(matches!(events.try_recv(), Ok(StoreEvent::WriteFailed { .. })));

        store.set_quota(None);
        list.flush().unwrap();
        assert!(list.is_synced());
        assert_eq!(
            store.read("numbers").unwrap().as_deref(),
            Some(&b"[10,20,30]"[..])
        );
        assert_eq!(
            events.try_recv(),
            Ok(StoreEvent::Committed {
                key: "numbers".into()
            })
        );
    }

    #[test]
    fn repair_marks_stale_without_writing() {
        let (store, shared) = backend();
        store.write("numbers", b"[1,1,2]").unwrap();
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);

        assert!(list.repair(|v| {
            v.dedup();
            true
        }));
        assert!(!list.is_synced());
        assert_eq!(store.read("numbers").unwrap().as_deref(), Some(&b"[1,1,2]"[..]));
    }

    #[test]
    fn sync_writes_repaired_value_once() {
        let (store, shared) = backend();
        store.write("numbers", b"[1,1,2]").unwrap();
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        list.repair(|v| {
            v.dedup();
            true
        });

        list.sync().unwrap();
        assert!(list.is_synced());
        assert_eq!(store.read("numbers").unwrap().as_deref(), Some(&b"[1,2]"[..]));

        // Nothing stale: no event, no write.
        let events = list.subscribe();
        list.sync().unwrap();
        assert!(events.try_recv().is_err());
    }

    /// Backend whose reads always fail.
    #[derive(Debug)]
    struct UnreadableStore(MemoryStore);

    impl DurableStore for UnreadableStore {
        fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("disk offline".into()))
        }

        fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.0.write(key, bytes)
        }
    }

    #[test]
    fn read_failure_does_not_overwrite_stored_value() {
        let inner = MemoryStore::new();
        inner.write("numbers", b"[4,5,6]").unwrap();
        let mut list: Persisted<Vec<u32>> =
            Persisted::load("numbers", Arc::new(UnreadableStore(inner.clone())));
        let events = list.subscribe();

        assert!(list.get().is_empty());
        assert!(list.load_failed());
        assert!(!list.is_synced());

        list.modify(|v| {
            v.push(1);
            true
        });
        assert_eq!(list.get(), &vec![1]);
        assert_eq!(inner.read("numbers").unwrap().as_deref(), Some(&b"[4,5,6]"[..]));
        assert!(matches!(events.try_recv(), Ok(StoreEvent::WriteFailed { .. })));
        assert!(matches!(list.sync(), Err(StorageError::LoadFailed { .. })));
        assert_eq!(inner.read("numbers").unwrap().as_deref(), Some(&b"[4,5,6]"[..]));

        // An explicit flush is a deliberate overwrite.
        list.flush().unwrap();
        assert!(!list.load_failed());
        assert!(list.is_synced());
        assert_eq!(inner.read("numbers").unwrap().as_deref(), Some(&b"[1]"[..]));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (_, shared) = backend();
        let mut list: Persisted<Vec<u32>> = Persisted::load("numbers", shared);
        let rx = list.subscribe();
        drop(rx);
        list.modify(|v| {
            v.push(1);
            true
        });
        assert!(list.subscribers.is_empty());
    }
}
