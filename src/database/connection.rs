//! The SQLite handle behind every Tabsleep store.
//!
//! Storage scopes, alarms and images share one connection. Opening the
//! database brings the schema up to date before anything else touches it.

use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Shared SQLite connection with an up-to-date schema.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the state database at `path`.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a throwaway database that lives as long as the returned value.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` in a transaction. Nothing `f` wrote survives unless it
    /// returns `Ok`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
