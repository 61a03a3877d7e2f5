//! Shared test fixtures

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use cinefile_core::{DurableStore, ManualClock, MovieRef};
use serde_json::{json, Value};

/// Fixed start time for clock-driven tests.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A manual clock starting at [`epoch`].
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// A catalog record as the movie API returns it, extra fields included.
pub fn catalog_movie(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_title": title,
        "poster_path": format!("/{id}.jpg"),
        "backdrop_path": null,
        "vote_average": 7.5,
        "vote_count": 1200,
        "release_date": "2001-12-19",
        "overview": "A long synopsis that no collection keeps.",
        "genre_ids": [12, 14]
    })
}

/// The snapshot a collection should keep for [`catalog_movie`].
pub fn expected_ref(id: i64, title: &str) -> MovieRef {
    MovieRef {
        id,
        title: title.to_string(),
        poster_path: Some(format!("/{id}.jpg")),
        vote_average: 7.5,
        release_date: "2001-12-19".to_string(),
    }
}

/// Parse what a backend holds at `key`.
pub fn stored_json(store: &dyn DurableStore, key: &str) -> Option<Value> {
    store
        .read(key)
        .unwrap()
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
}
