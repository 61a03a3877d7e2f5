//! Favorites - the set of movies the user starred.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::error::{InputError, StorageError};
use crate::event::StoreEvent;
use crate::movie::{retain_first_by_id, MovieId, MovieRef, MovieSource};
use crate::persisted::Persisted;
use crate::storage::DurableStore;

/// Default storage key.
pub const FAVORITES_KEY: &str = "favorites";

/// Movie snapshots in insertion order, at most one per movie id.
#[derive(Debug)]
pub struct FavoriteSet {
    movies: Persisted<Vec<MovieRef>>,
}

impl FavoriteSet {
    /// Load favorites stored under [`FAVORITES_KEY`].
    pub fn load(backend: Arc<dyn DurableStore>) -> Self {
        Self::load_from(FAVORITES_KEY, backend)
    }

    /// Load favorites stored under a custom key.
    pub fn load_from(key: impl Into<String>, backend: Arc<dyn DurableStore>) -> Self {
        let mut movies = Persisted::load(key, backend);
        movies.repair(|list: &mut Vec<MovieRef>| {
            let dropped = retain_first_by_id(list, |m| m.id);
            if dropped > 0 {
                tracing::warn!("Dropped {} duplicate favorites on load", dropped);
            }
            dropped > 0
        });
        Self { movies }
    }

    /// Add a movie. Returns `Ok(false)` if it was already a favorite.
    pub fn add(&mut self, movie: impl MovieSource) -> Result<bool, InputError> {
        let movie = movie.snapshot()?;
        Ok(self.movies.modify(|list| {
            if list.iter().any(|m| m.id == movie.id) {
                return false;
            }
            list.push(movie);
            true
        }))
    }

    /// Remove a movie. Returns `false` if it was not a favorite.
    pub fn remove(&mut self, movie_id: MovieId) -> bool {
        self.movies.modify(|list| {
            let before = list.len();
            list.retain(|m| m.id != movie_id);
            list.len() != before
        })
    }

    /// Add the movie if absent, remove it if present. Returns whether it is
    /// a favorite afterwards.
    pub fn toggle(&mut self, movie: impl MovieSource) -> Result<bool, InputError> {
        let movie = movie.snapshot()?;
        if self.remove(movie.id) {
            Ok(false)
        } else {
            self.add(movie)
        }
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.movies.get().iter().any(|m| m.id == movie_id)
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&MovieRef> {
        self.movies.get().iter().find(|m| m.id == movie_id)
    }

    /// All favorites in insertion order.
    pub fn all(&self) -> &[MovieRef] {
        self.movies.get()
    }

    pub fn len(&self) -> usize {
        self.movies.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.get().is_empty()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.movies.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.movies.is_synced()
    }

    /// Retry writing favorites after a failed commit.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.movies.flush()
    }

    /// Write favorites if a load repair or failed commit left them stale.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.movies.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn favorites() -> (MemoryStore, FavoriteSet) {
        let store = MemoryStore::new();
        let set = FavoriteSet::load(Arc::new(store.clone()));
        (store, set)
    }

    #[test]
    fn add_twice_keeps_one_entry() {
        let (_, mut set) = favorites();
        assert!(set.add(MovieRef::new(550, "Fight Club")).unwrap());
        assert!(!set.add(MovieRef::new(550, "Fight Club")).unwrap());
        assert_eq!(set.len(), 1);
        assert!(set.contains(550));
    }

    #[test]
    fn add_keeps_first_snapshot() {
        let (_, mut set) = favorites();
        set.add(MovieRef::new(550, "Fight Club")).unwrap();
        set.add(MovieRef::new(550, "Renamed")).unwrap();
        assert_eq!(set.get(550).unwrap().title, "Fight Club");
    }

    #[test]
    fn insertion_order_is_kept() {
        let (_, mut set) = favorites();
        for (id, title) in [(3, "c"), (1, "a"), (2, "b")] {
            set.add(MovieRef::new(id, title)).unwrap();
        }
        let ids: Vec<_> = set.all().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn remove_and_contains() {
        let (_, mut set) = favorites();
        set.add(MovieRef::new(1, "a")).unwrap();
        assert!(set.remove(1));
        assert!(!set.remove(1));
        assert!(!set.contains(1));
        assert!(set.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let (_, mut set) = favorites();
        assert!(set.toggle(MovieRef::new(1, "a")).unwrap());
        assert!(!set.toggle(MovieRef::new(1, "a")).unwrap());
        assert!(set.is_empty());
    }

    #[test]
    fn invalid_record_is_a_no_op() {
        let (store, mut set) = favorites();
        assert_eq!(set.add(json!({"title": "Nameless"})), Err(InputError::MissingId));
        assert!(set.is_empty());
        assert!(store.read(FAVORITES_KEY).unwrap().is_none());
    }

    #[test]
    fn writes_through_on_each_change() {
        let (store, mut set) = favorites();
        set.add(json!({"id": 13, "title": "Forrest Gump", "popularity": 88.1}))
            .unwrap();

        let stored: serde_json::Value =
            serde_json::from_slice(&store.read(FAVORITES_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(
            stored,
            json!([{
                "id": 13,
                "title": "Forrest Gump",
                "poster_path": null,
                "vote_average": 0.0,
                "release_date": ""
            }])
        );
    }

    #[test]
    fn duplicates_in_stored_data_are_dropped() {
        let store = MemoryStore::new();
        store
            .write(FAVORITES_KEY, br#"[{"id":1,"title":"a"},{"id":1,"title":"b"}]"#)
            .unwrap();
        let set = FavoriteSet::load(Arc::new(store));
        assert_eq!(set.len(), 1);
        assert_eq!(set.all()[0].title, "a");
        assert!(!set.is_synced());
    }
}
