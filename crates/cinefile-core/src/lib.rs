//! cinefile-core: persisted movie collections for a personal movie library.
//!
//! Four user-curated collections live in memory and are written through to a
//! durable key-value store after every mutation:
//!
//! - [`FavoriteSet`] - movies the user starred, unique by id
//! - [`HistoryLog`] - recently viewed movies, most-recent-first, capped
//! - [`RatingMap`] - one numeric rating per movie
//! - [`ReviewIndex`] - free-text reviews per movie, most-recent-first
//!
//! Each store wraps a [`Persisted`] container that loads its value once at
//! construction and commits the whole value back on every change. The
//! [`MovieLibrary`] composition root builds all four over one shared
//! [`DurableStore`] backend.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod favorites;
pub mod history;
pub mod library;
pub mod movie;
pub mod persisted;
pub mod ratings;
pub mod reviews;
pub mod storage;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use favorites::*;
pub use history::*;
pub use library::*;
pub use movie::*;
pub use persisted::*;
pub use ratings::*;
pub use reviews::*;
pub use storage::*;
