//! Reviews - free-text notes per movie, newest first.
//!
//! A movie with no reviews has no key in the index at all; removing the last
//! review deletes the key.

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::StorageError;
use crate::event::StoreEvent;
use crate::movie::MovieId;
use crate::persisted::Persisted;
use crate::storage::DurableStore;

/// Default storage key.
pub const REVIEWS_KEY: &str = "movie-reviews";

/// Identifier of a review, unique within its movie's list.
///
/// New ids are `{movie_id}-{uuid}`. Ids loaded from older data in the
/// `{movie_id}-{timestamp}` form are kept as they are.
pub type ReviewId = String;

/// One review as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub text: String,
    pub date: DateTime<Utc>,
    pub id: ReviewId,
}

/// Movie id to reviews, each list newest first and never empty.
#[derive(Debug)]
pub struct ReviewIndex {
    reviews: Persisted<BTreeMap<MovieId, Vec<ReviewEntry>>>,
    clock: Arc<dyn Clock>,
}

impl ReviewIndex {
    /// Load reviews stored under [`REVIEWS_KEY`].
    pub fn load(backend: Arc<dyn DurableStore>) -> Self {
        Self::load_with(REVIEWS_KEY, backend, Arc::new(SystemClock))
    }

    /// Load reviews with an explicit key and time source.
    pub fn load_with(
        key: impl Into<String>,
        backend: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut reviews = Persisted::load(key, backend);
        reviews.repair(|map: &mut BTreeMap<MovieId, Vec<ReviewEntry>>| {
            let before = map.len();
            map.retain(|_, list| !list.is_empty());
            let dropped = before - map.len();
            if dropped > 0 {
                tracing::warn!("Dropped {} empty review lists on load", dropped);
            }
            dropped > 0
        });
        Self { reviews, clock }
    }

    /// Add a review to the front of a movie's list and return it.
    pub fn add_review(&mut self, movie_id: MovieId, text: impl Into<String>) -> ReviewEntry {
        let entry = ReviewEntry {
            text: text.into(),
            date: self.clock.now(),
            id: format!("{}-{}", movie_id, Uuid::new_v4()),
        };
        let stored = entry.clone();

        self.reviews.modify(move |map| {
            map.entry(movie_id).or_default().insert(0, stored);
            true
        });
        entry
    }

    /// Reviews for a movie, newest first. Empty if it has none.
    pub fn get_reviews(&self, movie_id: MovieId) -> &[ReviewEntry] {
        self.reviews
            .get()
            .get(&movie_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove one review. Returns `false` if no such review exists.
    pub fn remove_review(&mut self, movie_id: MovieId, review_id: &str) -> bool {
        self.reviews.modify(|map| {
            let Some(list) = map.get_mut(&movie_id) else {
                return false;
            };
            let before = list.len();
            list.retain(|r| r.id != review_id);
            let removed = list.len() != before;
            if list.is_empty() {
                map.remove(&movie_id);
            }
            removed
        })
    }

    /// Movie ids that have at least one review.
    pub fn movie_ids(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.reviews.get().keys().copied()
    }

    pub fn all(&self) -> &BTreeMap<MovieId, Vec<ReviewEntry>> {
        self.reviews.get()
    }

    /// Number of movies with reviews.
    pub fn len(&self) -> usize {
        self.reviews.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.get().is_empty()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.reviews.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.reviews.is_synced()
    }

    /// Retry writing reviews after a failed commit.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.reviews.flush()
    }

    /// Write reviews if a load repair or failed commit left them stale.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.reviews.sync()
    }
}
