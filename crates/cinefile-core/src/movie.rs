//! Movie snapshots and the catalog records they are taken from.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::InputError;

/// Catalog identifier of a movie.
pub type MovieId = i64;

/// Immutable copy of the catalog fields a collection keeps for a movie.
///
/// Taken once at insertion time and never refreshed. Fields other than `id`
/// tolerate being absent or null in stored data, since older writers dropped
/// undefined fields when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRef {
    pub id: MovieId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
}

impl MovieRef {
    /// Create a snapshot with only an id and title set.
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            vote_average: 0.0,
            release_date: String::new(),
        }
    }
}

/// A movie as handed over by the catalog client.
///
/// Every field is optional so partial records can be inspected; unknown
/// fields (overview, genres, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: Option<MovieId>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
}

impl MovieRecord {
    /// Read a record out of arbitrary catalog JSON.
    pub fn from_value(value: &Value) -> Result<Self, InputError> {
        let obj = value.as_object().ok_or(InputError::NotAnObject)?;

        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| InputError::InvalidId(v.to_string()))?),
        };

        Ok(Self {
            id,
            title: optional_str(obj.get("title"), "title")?,
            poster_path: optional_str(obj.get("poster_path"), "poster_path")?,
            vote_average: match obj.get("vote_average") {
                None | Some(Value::Null) => None,
                Some(v) => Some(v.as_f64().ok_or(InputError::InvalidField {
                    field: "vote_average",
                })?),
            },
            release_date: optional_str(obj.get("release_date"), "release_date")?,
        })
    }
}

fn optional_str(value: Option<&Value>, field: &'static str) -> Result<Option<String>, InputError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(InputError::InvalidField { field }),
    }
}

/// Anything a collection can take a [`MovieRef`] snapshot of.
pub trait MovieSource {
    /// Project the tracked fields. Fails without side effects if the input
    /// cannot identify a movie.
    fn snapshot(&self) -> Result<MovieRef, InputError>;
}

impl MovieSource for MovieRef {
    fn snapshot(&self) -> Result<MovieRef, InputError> {
        check_vote_average(self.vote_average)?;
        Ok(self.clone())
    }
}

impl MovieSource for MovieRecord {
    fn snapshot(&self) -> Result<MovieRef, InputError> {
        let id = self.id.ok_or(InputError::MissingId)?;
        let vote_average = self.vote_average.unwrap_or_default();
        check_vote_average(vote_average)?;

        Ok(MovieRef {
            id,
            title: self.title.clone().unwrap_or_default(),
            poster_path: self.poster_path.clone(),
            vote_average,
            release_date: self.release_date.clone().unwrap_or_default(),
        })
    }
}

impl MovieSource for Value {
    fn snapshot(&self) -> Result<MovieRef, InputError> {
        MovieRecord::from_value(self)?.snapshot()
    }
}

impl<T: MovieSource + ?Sized> MovieSource for &T {
    fn snapshot(&self) -> Result<MovieRef, InputError> {
        (**self).snapshot()
    }
}

// NaN would be written as `null` and poison the whole collection on reload.
fn check_vote_average(value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::InvalidField {
            field: "vote_average",
        })
    }
}

/// Drop every entry whose id was already seen earlier in the list.
/// Returns how many entries were removed.
pub(crate) fn retain_first_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> MovieId) -> usize {
    let before = items.len();
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(id(item)));
    before - items.len()
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
