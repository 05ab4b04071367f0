//! In-process key-value store.
//!
//! Backs the session scope of the headless simulator and every unit test.
//! Clones share the same map, so a test can keep a handle to a store it has
//! handed to a [`StorageBridge`](super::StorageBridge) and inspect it later, or
//! hand the same store to a second page to simulate a reload.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    None,
    /// Every call fails (privacy mode).
    Unavailable,
    /// Reads work, writes fail (quota exhausted).
    Full,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    failure: FailureMode,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            failure: FailureMode::None,
        }
    }

    /// A store whose every access fails.
    pub fn unavailable() -> Self {
        Self {
            failure: FailureMode::Unavailable,
            ..Self::new()
        }
    }

    /// A store that still reads but rejects writes.
    pub fn full(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            failure: FailureMode::Full,
        }
    }

    /// Seeds an entry directly, bypassing any failure mode.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.failure == FailureMode::Unavailable {
            return Err(StorageError::Unavailable("memory store disabled".into()));
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self.failure {
            FailureMode::Unavailable => {
                Err(StorageError::Unavailable("memory store disabled".into()))
            }
            FailureMode::Full => Err(StorageError::QuotaExceeded {
                key: key.to_string(),
            }),
            FailureMode::None => {
                self.entries
                    .borrow_mut()
                    .insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.failure == FailureMode::Unavailable {
            return Err(StorageError::Unavailable("memory store disabled".into()));
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
