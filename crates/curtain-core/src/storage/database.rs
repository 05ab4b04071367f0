//! SQLite-backed key-value storage.
//!
//! One database file holds both scopes:
//! - `durable_kv`: preferences and the reveal flag
//! - `session_kv`: playback snapshot, wiped by [`Database::end_session`]

use std::path::Path;
use std::rc::Rc;

use rusqlite::{params, Connection};

use super::{data_dir, KeyValueStore, StorageBridge, StorageScope};
use crate::error::StorageError;

const DB_FILE: &str = "curtain.db";

/// SQLite database holding both storage scopes.
pub struct Database {
    conn: Rc<Connection>,
}

impl Database {
    /// Open the database at `~/.config/curtain/curtain.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join(DB_FILE))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Rc::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Rc::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS durable_kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session_kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// A store handle for one scope. Handles share this connection.
    pub fn store(&self, scope: StorageScope) -> SqliteStore {
        SqliteStore {
            conn: Rc::clone(&self.conn),
            table: table_for(scope),
        }
    }

    /// Bridge over both scopes of this database.
    pub fn bridge(&self) -> StorageBridge {
        StorageBridge::new(
            Box::new(self.store(StorageScope::Durable)),
            Box::new(self.store(StorageScope::Session)),
        )
    }

    /// Clear the session scope, as closing the tab would.
    pub fn end_session(&self) -> Result<usize, StorageError> {
        Ok(self.conn.execute("DELETE FROM session_kv", [])?)
    }
}

fn table_for(scope: StorageScope) -> &'static str {
    match scope {
        StorageScope::Durable => "durable_kv",
        StorageScope::Session => "session_kv",
    }
}

/// One scope of a [`Database`].
pub struct SqliteStore {
    conn: Rc<Connection>,
    table: &'static str,
}

impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            self.table
        );
        self.conn.execute(&sql, params![key, value]).map_err(|e| {
            match StorageError::from(e) {
                StorageError::QuotaExceeded { .. } => StorageError::QuotaExceeded {
                    key: key.to_string(),
                },
                other => other,
            }
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table);
        self.conn.execute(&sql, params![key])?;
        Ok(())
    }
}
