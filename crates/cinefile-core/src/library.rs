//! MovieLibrary - builds the four collections over one backend.
//!
//! The application constructs one library at startup and passes it (or the
//! individual stores) to whatever needs them. Nothing here is global.

use std::path::Path;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::LibraryConfig;
use crate::error::{ConfigError, Result, StorageError};
use crate::favorites::FavoriteSet;
use crate::history::HistoryLog;
use crate::ratings::RatingMap;
use crate::reviews::ReviewIndex;
use crate::storage::{DurableStore, FileStore, MemoryStore};

/// All persisted collections of one user.
#[derive(Debug)]
pub struct MovieLibrary {
    pub favorites: FavoriteSet,
    pub history: HistoryLog,
    pub ratings: RatingMap,
    pub reviews: ReviewIndex,
}

impl MovieLibrary {
    /// Load every collection from `backend`.
    pub fn open(backend: Arc<dyn DurableStore>, config: &LibraryConfig) -> Result<Self> {
        Self::open_with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Load every collection, stamping new entries with `clock`.
    pub fn open_with_clock(
        backend: Arc<dyn DurableStore>,
        config: &LibraryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let keys = &config.keys;

        let library = Self {
            favorites: FavoriteSet::load_from(keys.favorites.as_str(), backend.clone()),
            history: HistoryLog::load_with(
                keys.history.as_str(),
                backend.clone(),
                config.history_limits(),
                clock.clone(),
            ),
            ratings: RatingMap::load_from(keys.ratings.as_str(), backend.clone()),
            reviews: ReviewIndex::load_with(keys.reviews.as_str(), backend, clock),
        };

        tracing::info!(
            "Opened library: {} favorites, {} history entries, {} ratings, {} reviewed movies",
            library.favorites.len(),
            library.history.len(),
            library.ratings.len(),
            library.reviews.len()
        );
        Ok(library)
    }

    /// Open a library persisted as JSON files in `dir`.
    pub fn open_dir(dir: impl AsRef<Path>, config: &LibraryConfig) -> Result<Self> {
        let store = FileStore::open(dir)?;
        Self::open(Arc::new(store), config)
    }

    /// Open the library in the configured (or platform default) data dir.
    pub fn open_default(config: &LibraryConfig) -> Result<Self> {
        let dir = config
            .resolved_data_dir()
            .ok_or_else(|| ConfigError::MissingField("data_dir".to_string()))?;
        Self::open_dir(dir, config)
    }

    /// A library that forgets everything when dropped.
    pub fn in_memory() -> Self {
        let backend: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        Self {
            favorites: FavoriteSet::load(backend.clone()),
            history: HistoryLog::load(backend.clone()),
            ratings: RatingMap::load(backend.clone()),
            reviews: ReviewIndex::load(backend),
        }
    }

    /// Whether every collection's durable copy matches memory.
    pub fn is_synced(&self) -> bool {
        self.favorites.is_synced()
            && self.history.is_synced()
            && self.ratings.is_synced()
            && self.reviews.is_synced()
    }

    /// Write every collection whose durable copy is stale. All four are
    /// attempted; the first error is returned.
    ///
    /// Collections whose stored value could not be read at load are not
    /// overwritten and report [`StorageError::LoadFailed`].
    pub fn sync(&mut self) -> std::result::Result<(), StorageError> {
        let results = [
            self.favorites.sync(),
            self.history.sync(),
            self.ratings.sync(),
            self.reviews.sync(),
        ];
        results.into_iter().collect()
    }

    /// Write every collection now. All four are attempted; the first error
    /// is returned.
    pub fn flush_all(&mut self) -> std::result::Result<(), StorageError> {
        let results = [
            self.favorites.flush(),
            self.history.flush(),
            self.ratings.flush(),
            self.reviews.flush(),
        ];
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie::MovieRef;

    #[test]
    fn collections_share_one_backend() {
        let store = MemoryStore::new();
        let mut library =
            MovieLibrary::open(Arc::new(store.clone()), &LibraryConfig::default()).unwrap();

        library.favorites.add(MovieRef::new(1, "a")).unwrap();
        library.history.record(MovieRef::new(1, "a")).unwrap();
        library.ratings.set_rating(1, 3.5).unwrap();
        library.reviews.add_review(1, "fine");

        assert_eq!(
            store.keys(),
            vec!["favorites", "movie-history", "movie-ratings", "movie-reviews"]
        );
        assert!(library.is_synced());
    }

    #[test]
    fn custom_keys_are_used() {
        let store = MemoryStore::new();
        let mut config = LibraryConfig::default();
        config.keys.favorites = "starred".to_string();
        let mut library = MovieLibrary::open(Arc::new(store.clone()), &config).unwrap();

        library.favorites.add(MovieRef::new(1, "a")).unwrap();
        assert_eq!(store.keys(), vec!["starred"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = LibraryConfig::default();
        config.keys.history = config.keys.favorites.clone();
        let err = MovieLibrary::open(Arc::new(MemoryStore::new()), &config).unwrap_err();
        assert!(err.to_string().contains("favorites"));
    }

    #[test]
    fn default_config_caps_history_at_one_hundred() {
        let mut library =
            MovieLibrary::open(Arc::new(MemoryStore::new()), &LibraryConfig::default()).unwrap();
        for id in 1..=101 {
            library.history.record(MovieRef::new(id, "m")).unwrap();
        }
        assert_eq!(library.history.len(), 100);
        assert!(!library.history.contains(1));
        assert_eq!(library.history.recent_default().len(), 10);
    }

    #[test]
    fn sync_is_a_no_op_when_nothing_is_stale() {
        let store = MemoryStore::new();
        let mut library =
            MovieLibrary::open(Arc::new(store.clone()), &LibraryConfig::default()).unwrap();
        library.sync().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn flush_all_reports_quota_failure() {
        let store = MemoryStore::new();
        let mut library =
            MovieLibrary::open(Arc::new(store.clone()), &LibraryConfig::default()).unwrap();
        library.ratings.set_rating(1, 1.0).unwrap();

        store.set_quota(Some(1));
        assert!(library.flush_all().is_err());
        assert!(!library.is_synced());

        store.set_quota(None);
        library.flush_all().unwrap();
        assert!(library.is_synced());
    }
}
