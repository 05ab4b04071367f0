//! Failure-tolerant typed access over the durable and session scopes.
//!
//! Every call here succeeds from the caller's point of view. Backend errors
//! are logged and turned into "absent" on read or a no-op on write, so a page
//! running with storage disabled simply falls back to defaults.

use tracing::warn;

use super::{KeyValueStore, StorageScope};
use crate::error::StorageError;

pub struct StorageBridge {
    durable: Box<dyn KeyValueStore>,
    session: Box<dyn KeyValueStore>,
}

impl StorageBridge {
    pub fn new(durable: Box<dyn KeyValueStore>, session: Box<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    fn store(&self, scope: StorageScope) -> &dyn KeyValueStore {
        match scope {
            StorageScope::Durable => self.durable.as_ref(),
            StorageScope::Session => self.session.as_ref(),
        }
    }

    pub fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
        match self.store(scope).read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(?scope, key, error = %e, "storage read failed, treating as absent");
                None
            }
        }
    }

    pub fn set(&self, scope: StorageScope, key: &str, value: &str) {
        if let Err(e) = self.store(scope).write(key, value) {
            warn!(?scope, key, error = %e, "storage write dropped");
        }
    }

    pub fn remove(&self, scope: StorageScope, key: &str) {
        if let Err(e) = self.store(scope).remove(key) {
            warn!(?scope, key, error = %e, "storage remove dropped");
        }
    }

    // ── Typed helpers ────────────────────────────────────────────────

    /// Reads a decimal value. Unparseable and non-finite text reads as absent.
    pub fn get_f64(&self, scope: StorageScope, key: &str) -> Option<f64> {
        self.get(scope, key)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Reads `"true"`/`"false"`; anything else is absent.
    pub fn get_bool(&self, scope: StorageScope, key: &str) -> Option<bool> {
        match self.get(scope, key)?.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Writes the shortest decimal form (`0.5`, `1`). Non-finite values have
    /// no canonical text and are dropped.
    pub fn set_f64(&self, scope: StorageScope, key: &str, value: f64) {
        if !value.is_finite() {
            let e = StorageError::Serialization {
                key: key.to_string(),
                message: format!("{value} is not finite"),
            };
            warn!(?scope, key, error = %e, "storage write dropped");
            return;
        }
        self.set(scope, key, &value.to_string());
    }

    pub fn set_bool(&self, scope: StorageScope, key: &str, value: bool) {
        self.set(scope, key, if value { "true" } else { "false" });
    }
}
