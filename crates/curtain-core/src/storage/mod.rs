mod bridge;
mod config;
pub mod database;
pub mod keys;
mod memory;

pub use bridge::StorageBridge;
pub use config::{AudioConfig, Config, CountdownConfig, RevealConfig};
pub use database::{Database, SqliteStore};
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// The two persistence scopes a page can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Survives across sessions and restarts.
    Durable,
    /// Cleared when the tab/session ends.
    Session,
}

/// A raw string key-value backend for one scope.
///
/// Implementations report failures honestly; [`StorageBridge`] is the layer
/// that swallows them.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Returns `~/.config/curtain[-dev]/` based on CURTAIN_ENV.
///
/// Set CURTAIN_ENV=dev to use the development data directory, or
/// CURTAIN_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("CURTAIN_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CURTAIN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("curtain-dev")
            } else {
                base_dir.join("curtain")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
