//! Core error types for curtain-core.
//!
//! Nothing in the page lifecycle is allowed to fail outward: storage and
//! playback errors are matched on and degraded where they occur. These types
//! exist so the degradation points can name what went wrong (and log it).
//! Hosts opening the database and config, or parsing page input, report real
//! failures as [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for curtain-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unparseable page location
    #[error("Invalid page location: {0}")]
    Location(#[from] url::ParseError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Host input that cannot be simulated (an offset past the calendar)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failures of a key-value storage scope.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend refused access (private mode, locked database, missing directory)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the backend is full
    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// Value has no canonical string form
    #[error("Cannot serialize value for '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Outcomes of playback requests that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The platform refused playback (autoplay policy)
    #[error("Playback blocked by autoplay policy")]
    Blocked,

    /// A pause or source change superseded the request before it settled
    #[error("Playback request interrupted")]
    Interrupted,

    /// Position assignment attempted before duration metadata is known
    #[error("Media metadata not loaded yet")]
    MetadataNotReady,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    StorageError::Unavailable(err.to_string())
                }
                rusqlite::ErrorCode::DiskFull => StorageError::QuotaExceeded {
                    key: String::new(),
                },
                _ => StorageError::Database(err.to_string()),
            },
            _ => StorageError::Database(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_database_maps_to_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Unavailable(_)));
    }

    #[test]
    fn storage_and_config_errors_wrap_into_core_error() {
        let err: CoreError = StorageError::Unavailable("locked".into()).into();
        assert_eq!(err.to_string(), "Storage error: Storage unavailable: locked");
        let err: CoreError = ConfigError::UnknownKey("audio.nope".into()).into();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn bad_location_wraps_into_core_error() {
        let err: CoreError = url::Url::parse("http://[::1").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid page location"));
    }
}
