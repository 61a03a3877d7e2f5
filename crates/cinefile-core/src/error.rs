//! Error types for cinefile-core

use thiserror::Error;

/// Result type alias for cinefile operations
pub type Result<T> = std::result::Result<T, CinefileError>;

/// Main error type for cinefile operations
#[derive(Error, Debug)]
pub enum CinefileError {
    /// Durable backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed caller input
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`DurableStore`](crate::DurableStore) backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failed
    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The medium refused a write because it would exceed its capacity
    #[error("Quota exceeded writing '{key}': {needed} bytes needed, {limit} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Key is empty or not usable by the backend
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    /// The stored value could not be read at load, so it is not overwritten
    /// implicitly
    #[error("Stored value for '{key}' could not be read at load; not overwriting it")]
    LoadFailed { key: String },

    /// Backend cannot be used at all (disabled, lock poisoned)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A collection value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejected caller input. Operations that return this leave state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// Movie record has no `id` field, or it is null
    #[error("movie record has no id")]
    MissingId,

    /// Movie `id` is present but not an integer
    #[error("movie id is not an integer: {0}")]
    InvalidId(String),

    /// Movie record is not a JSON object
    #[error("movie record is not an object")]
    NotAnObject,

    /// A known field has the wrong type
    #[error("movie field '{field}' has the wrong type")]
    InvalidField { field: &'static str },

    /// Ratings must survive a JSON round trip
    #[error("rating must be a finite number, got {0}")]
    NonFiniteRating(f64),
}

/// Configuration load or validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML or JSON did not parse
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Two collections would share one storage key
    #[error("Storage key '{0}' is used by more than one collection")]
    DuplicateKey(String),

    /// Required field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(String),
}
