//! Durable key-value byte storage.
//!
//! Collections persist through the [`DurableStore`] trait: a flat namespace of
//! string keys, each holding one opaque byte value. Backends decide where the
//! bytes live; collections decide what is stored.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt::Debug;

use crate::error::StorageError;

/// The trait that all durable backends implement.
///
/// All methods take `&self` so one backend handle can be shared by several
/// collections; implementations use interior locking where they need it.
pub trait DurableStore: Send + Sync + Debug {
    /// Read the value stored at `key`. Returns `Ok(None)` if the key does not exist.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored at `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let usable = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if usable {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_collection_keys() {
        for key in ["favorites", "movie-history", "movie-ratings", "movie_reviews.v2"] {
            assert!(check_key(key).is_ok(), "{key} should be accepted");
        }
    }

    #[test]
    fn rejects_path_like_keys() {
        for key in ["", "../etc/passwd", "a/b", ".hidden", "with space"] {
            assert!(
                matches!(check_key(key), Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }
}
