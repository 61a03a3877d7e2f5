//! Watch history - recently viewed movies, newest first.
//!
//! The log holds at most one entry per movie. Recording a movie that is
//! already present moves it to the front with a fresh `watched_at`; once the
//! log grows past its capacity the oldest entries fall off the end.
//!
//! `watched_at` never decreases from back to front. If the clock reports a
//! time earlier than the current front entry (wall clock stepped backwards),
//! the new entry reuses the front entry's timestamp instead.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{InputError, StorageError};
use crate::event::StoreEvent;
use crate::movie::{retain_first_by_id, MovieId, MovieRef, MovieSource};
use crate::persisted::Persisted;
use crate::storage::DurableStore;

/// Default storage key.
pub const HISTORY_KEY: &str = "movie-history";

/// Default maximum number of entries kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default number of entries returned by [`HistoryLog::recent_default`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// A movie snapshot plus the time it was viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub movie: MovieRef,
    pub watched_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn id(&self) -> MovieId {
        self.movie.id
    }
}

/// Size limits for a [`HistoryLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Maximum entries kept; older ones are discarded.
    pub capacity: usize,
    /// Default page size for [`HistoryLog::recent_default`].
    pub recent: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            recent: DEFAULT_RECENT_LIMIT,
        }
    }
}

/// Capped, deduplicated, most-recent-first watch log.
#[derive(Debug)]
pub struct HistoryLog {
    entries: Persisted<Vec<HistoryEntry>>,
    limits: HistoryLimits,
    clock: Arc<dyn Clock>,
}

impl HistoryLog {
    /// Load history stored under [`HISTORY_KEY`] with default limits.
    pub fn load(backend: Arc<dyn DurableStore>) -> Self {
        Self::load_with(
            HISTORY_KEY,
            backend,
            HistoryLimits::default(),
            Arc::new(SystemClock),
        )
    }

    /// Load history with an explicit key, limits and time source.
    ///
    /// A capacity of zero is treated as one.
    pub fn load_with(
        key: impl Into<String>,
        backend: Arc<dyn DurableStore>,
        limits: HistoryLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limits = HistoryLimits {
            capacity: limits.capacity.max(1),
            ..limits
        };
        let mut entries = Persisted::load(key, backend);
        entries.repair(|list: &mut Vec<HistoryEntry>| normalize(list, limits.capacity));
        Self {
            entries,
            limits,
            clock,
        }
    }

    /// Record a view of `movie`, moving it to the front of the log.
    pub fn record(&mut self, movie: impl MovieSource) -> Result<HistoryEntry, InputError> {
        let movie = movie.snapshot()?;
        let now = self.clock.now();

        // Front of the log once this movie's old entry is gone.
        let front = self
            .entries
            .get()
            .iter()
            .find(|e| e.movie.id != movie.id)
            .map(|e| e.watched_at);
        let watched_at = match front {
            Some(front) if front > now => front,
            _ => now,
        };

        let entry = HistoryEntry { movie, watched_at };
        let id = entry.movie.id;
        let capacity = self.limits.capacity;
        let stored = entry.clone();

        self.entries.modify(move |list| {
            list.retain(|e| e.movie.id != id);
            list.insert(0, stored);
            list.truncate(capacity);
            true
        });
        Ok(entry)
    }

    /// Remove a movie from the log. Returns `false` if it was not there.
    pub fn forget(&mut self, movie_id: MovieId) -> bool {
        self.entries.modify(|list| {
            let before = list.len();
            list.retain(|e| e.movie.id != movie_id);
            list.len() != before
        })
    }

    /// Remove every entry. Returns `false` if the log was already empty.
    pub fn clear(&mut self) -> bool {
        self.entries.modify(|list| {
            let had_entries = !list.is_empty();
            list.clear();
            had_entries
        })
    }

    /// The newest `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> &[HistoryEntry] {
        let list = self.entries.get();
        &list[..limit.min(list.len())]
    }

    /// The newest entries, using the configured page size.
    pub fn recent_default(&self) -> &[HistoryEntry] {
        self.recent(self.limits.recent)
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.get(movie_id).is_some()
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&HistoryEntry> {
        self.entries.get().iter().find(|e| e.movie.id == movie_id)
    }

    /// The whole log, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        self.entries.get()
    }

    pub fn len(&self) -> usize {
        self.entries.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.get().is_empty()
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.entries.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.entries.is_synced()
    }

    /// Retry writing the log after a failed commit.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.entries.flush()
    }

    /// Write the log if a load repair or failed commit left it stale.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.entries.sync()
    }
}

/// Restore the log invariants on data read from storage.
fn normalize(list: &mut Vec<HistoryEntry>, capacity: usize) -> bool {
    let mut changed = false;

    let dropped = retain_first_by_id(list, |e| e.movie.id);
    if dropped > 0 {
        tracing::warn!("Dropped {} duplicate history entries on load", dropped);
        changed = true;
    }

    if list.windows(2).any(|w| w[0].watched_at < w[1].watched_at) {
        tracing::warn!("History was out of order on load, re-sorting");
        list.sort_by(|a, b| b.watched_at.cmp(&a.watched_at));
        changed = true;
    }

    if list.len() > capacity {
        tracing::warn!(
            "History held {} entries, truncating to {}",
            list.len(),
            capacity
        );
        list.truncate(capacity);
        changed = true;
    }

    changed
}
