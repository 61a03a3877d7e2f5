//! Ratings - one numeric score per movie.

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::error::{InputError, StorageError};
use crate::event::StoreEvent;
use crate::movie::MovieId;
use crate::persisted::Persisted;
use crate::storage::DurableStore;

/// Default storage key.
pub const RATINGS_KEY: &str = "movie-ratings";

/// Movie id to rating. The store does not enforce a scale; the UI does.
#[derive(Debug)]
pub struct RatingMap {
    ratings: Persisted<BTreeMap<MovieId, f64>>,
}

impl RatingMap {
    /// Load ratings stored under [`RATINGS_KEY`].
    pub fn load(backend: Arc<dyn DurableStore>) -> Self {
        Self::load_from(RATINGS_KEY, backend)
    }

    /// Load ratings stored under a custom key.
    pub fn load_from(key: impl Into<String>, backend: Arc<dyn DurableStore>) -> Self {
        Self {
            ratings: Persisted::load(key, backend),
        }
    }

    /// Create or overwrite the rating for a movie.
    ///
    /// NaN and infinities are rejected: JSON cannot hold them.
    pub fn set_rating(&mut self, movie_id: MovieId, rating: f64) -> Result<(), InputError> {
        if !rating.is_finite() {
            return Err(InputError::NonFiniteRating(rating));
        }
        self.ratings
            .modify(|map| map.insert(movie_id, rating) != Some(rating));
        Ok(())
    }

    /// Rating for a movie, or `0.0` when it has none.
    ///
    /// Cannot tell "unrated" from "rated 0"; use [`RatingMap::rating`] for that.
    pub fn get_rating(&self, movie_id: MovieId) -> f64 {
        self.rating(movie_id).unwrap_or(0.0)
    }

    pub fn rating(&self, movie_id: MovieId) -> Option<f64> {
        self.ratings.get().get(&movie_id).copied()
    }

    /// Delete a movie's rating. Returns `false` if it had none.
    pub fn remove_rating(&mut self, movie_id: MovieId) -> bool {
        self.ratings.modify(|map| map.remove(&movie_id).is_some())
    }

    /// All ratings, ordered by movie id.
    pub fn all(&self) -> &BTreeMap<MovieId, f64> {
        self.ratings.get()
    }

    pub fn len(&self) -> usize {
        self.ratings.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.get().is_empty()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.ratings.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.ratings.is_synced()
    }

    /// Retry writing ratings after a failed commit.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.ratings.flush()
    }

    /// Write ratings if a load repair or failed commit left them stale.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.ratings.sync()
    }
}
