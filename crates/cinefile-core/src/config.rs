//! Configuration for cinefile-core
//!
//! Storage key names, history limits and the data directory, loadable from
//! TOML or JSON. Every field has a default, so an empty file is valid.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::favorites::FAVORITES_KEY;
use crate::history::{HistoryLimits, DEFAULT_HISTORY_CAPACITY, DEFAULT_RECENT_LIMIT, HISTORY_KEY};
use crate::ratings::RATINGS_KEY;
use crate::reviews::REVIEWS_KEY;
use crate::storage::check_key;

/// Directory name used under the platform config and data dirs.
pub const APP_DIR: &str = "cinefile";

/// Library-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Maximum watch history entries kept
    pub history_limit: usize,
    /// Default number of entries in a "recently viewed" page
    pub recent_limit: usize,
    /// Where the file backend keeps its data; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// Storage key per collection
    pub keys: StorageKeys,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_CAPACITY,
            recent_limit: DEFAULT_RECENT_LIMIT,
            data_dir: None,
            keys: StorageKeys::default(),
        }
    }
}

/// Storage key names for the four collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub favorites: String,
    pub history: String,
    pub ratings: String,
    pub reviews: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            favorites: FAVORITES_KEY.to_string(),
            history: HISTORY_KEY.to_string(),
            ratings: RATINGS_KEY.to_string(),
            reviews: REVIEWS_KEY.to_string(),
        }
    }
}

impl LibraryConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a config file. `.json` files are read as JSON,
    /// anything else as TOML.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content)?,
            _ => Self::from_toml(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `{config_dir}/cinefile/config.toml` if it exists, defaults otherwise.
    pub fn load_standard() -> Result<Self, ConfigError> {
        match Self::standard_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {:?}", path);
                Self::load_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Platform location of the config file.
    pub fn standard_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Data directory for the file backend.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
    }

    pub fn history_limits(&self) -> HistoryLimits {
        HistoryLimits {
            capacity: self.history_limit,
            recent: self.recent_limit,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "history_limit must be at least 1".to_string(),
            ));
        }

        let keys = [
            ("keys.favorites", &self.keys.favorites),
            ("keys.history", &self.keys.history),
            ("keys.ratings", &self.keys.ratings),
            ("keys.reviews", &self.keys.reviews),
        ];

        let mut seen = HashSet::new();
        for (field, key) in keys {
            if key.is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
            if check_key(key).is_err() {
                return Err(ConfigError::OutOfRange(format!(
                    "{field} '{key}' may only contain letters, digits, '-', '_' and '.'"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::DuplicateKey(key.clone()));
            }
        }

        Ok(())
    }
}
