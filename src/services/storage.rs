//! Key-value store with a synced and a local scope.
//!
//! Values are JSON documents kept in the `storage` table. Reads of absent
//! keys simply omit them from the result map, mirroring how extension
//! storage areas behave.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::database::Database;
use crate::types::errors::StorageError;
use crate::types::event::StorageScope;

/// Trait defining the key-value store interface.
pub trait KeyValueStoreTrait {
    fn get(&self, scope: StorageScope, keys: &[&str]) -> Result<Map<String, Value>, StorageError>;
    fn get_all(&self, scope: StorageScope) -> Result<Map<String, Value>, StorageError>;
    fn set(&self, scope: StorageScope, items: Map<String, Value>) -> Result<(), StorageError>;
    fn remove(&self, scope: StorageScope, keys: &[&str]) -> Result<(), StorageError>;
}

/// SQLite-backed key-value store.
#[derive(Clone)]
pub struct KeyValueStore {
    db: Arc<Database>,
}

impl KeyValueStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Reads one key, `None` if absent.
    pub fn get_one(&self, scope: StorageScope, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM storage WHERE scope = ?1 AND key = ?2",
                params![scope.as_str(), key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    /// Reads one key and deserializes it into `T`.
    pub fn get_typed<T: DeserializeOwned>(
        &self,
        scope: StorageScope,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.get_one(scope, key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::SerializationError(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Serializes `value` and writes it under `key`.
    pub fn set_typed<T: Serialize>(
        &self,
        scope: StorageScope,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_value(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let mut items = Map::new();
        items.insert(key.to_string(), json);
        self.set(scope, items)
    }
}

impl KeyValueStoreTrait for KeyValueStore {
    fn get(&self, scope: StorageScope, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let mut result = Map::new();
        for key in keys {
            if let Some(value) = self.get_one(scope, key)? {
                result.insert(key.to_string(), value);
            }
        }
        Ok(result)
    }

    fn get_all(&self, scope: StorageScope) -> Result<Map<String, Value>, StorageError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare("SELECT key, value FROM storage WHERE scope = ?1 ORDER BY key")
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![scope.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let mut result = Map::new();
        for row in rows {
            let (key, text) = row.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            let value = serde_json::from_str(&text)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            result.insert(key, value);
        }
        Ok(result)
    }

    /// Writes all items in one transaction: either every key lands or none.
    fn set(&self, scope: StorageScope, items: Map<String, Value>) -> Result<(), StorageError> {
        let mut rows = Vec::with_capacity(items.len());
        for (key, value) in items {
            let text = serde_json::to_string(&value)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            rows.push((key, text));
        }
        if rows.is_empty() {
            return Ok(());
        }

        self.db
            .transaction(|conn| {
                for (key, text) in &rows {
                    conn.execute(
                        "INSERT INTO storage (scope, key, value) VALUES (?1, ?2, ?3)
                         ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value",
                        params![scope.as_str(), key, text],
                    )?;
                }
                Ok(())
            })
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn remove(&self, scope: StorageScope, keys: &[&str]) -> Result<(), StorageError> {
        self.db
            .transaction(|conn| {
                for key in keys {
                    conn.execute(
                        "DELETE FROM storage WHERE scope = ?1 AND key = ?2",
                        params![scope.as_str(), key],
                    )?;
                }
                Ok(())
            })
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }
}
