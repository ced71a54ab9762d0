//! Durable alarm service.
//!
//! Alarms are named deadlines stored in SQLite, so a trigger armed before a
//! restart still fires afterwards. Creating an alarm with an existing name
//! replaces it. Delays shorter than the service's granularity are clamped.

use std::sync::Arc;

use rusqlite::params;

use crate::database::Database;
use crate::types::errors::AlarmError;
use crate::types::trigger::Alarm;

/// Trait defining the durable alarm interface.
pub trait AlarmService {
    /// Creates (or replaces) an alarm firing `delay_ms` after `now_ms`.
    /// Returns the effective deadline.
    fn create(&self, name: &str, now_ms: i64, delay_ms: i64) -> Result<i64, AlarmError>;
    /// Removes an alarm. Returns whether one existed.
    fn clear(&self, name: &str) -> Result<bool, AlarmError>;
    fn get(&self, name: &str) -> Result<Option<Alarm>, AlarmError>;
    fn get_all(&self) -> Result<Vec<Alarm>, AlarmError>;
    /// Removes and returns every alarm due at `now_ms`, earliest first.
    fn take_due(&self, now_ms: i64) -> Result<Vec<Alarm>, AlarmError>;
    /// Smallest representable delay.
    fn min_delay_ms(&self) -> i64;
}

/// SQLite-backed alarms.
pub struct SqliteAlarms {
    db: Arc<Database>,
    min_delay_ms: i64,
}

impl SqliteAlarms {
    pub fn new(db: Arc<Database>, min_delay_ms: i64) -> Self {
        Self {
            db,
            min_delay_ms: min_delay_ms.max(0),
        }
    }
}

impl AlarmService for SqliteAlarms {
    fn create(&self, name: &str, now_ms: i64, delay_ms: i64) -> Result<i64, AlarmError> {
        if name.is_empty() {
            return Err(AlarmError::InvalidName(name.to_string()));
        }
        let fire_at = now_ms + delay_ms.max(self.min_delay_ms);
        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO alarms (name, fire_at) VALUES (?1, ?2)",
                params![name, fire_at],
            )
            .map_err(|e| AlarmError::DatabaseError(e.to_string()))?;
        Ok(fire_at)
    }

    fn clear(&self, name: &str) -> Result<bool, AlarmError> {
        let removed = self
            .db
            .connection()
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])
            .map_err(|e| AlarmError::DatabaseError(e.to_string()))?;
        Ok(removed > 0)
    }

    fn get(&self, name: &str) -> Result<Option<Alarm>, AlarmError> {
        Ok(self.get_all()?.into_iter().find(|a| a.name == name))
    }

    fn get_all(&self) -> Result<Vec<Alarm>, AlarmError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare("SELECT name, fire_at FROM alarms ORDER BY fire_at, name")
            .map_err(|e| AlarmError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Alarm {
                    name: row.get(0)?,
                    scheduled_time: row.get(1)?,
                })
            })
            .map_err(|e| AlarmError::DatabaseError(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| AlarmError::DatabaseError(e.to_string()))?);
        }
        Ok(result)
    }

    fn take_due(&self, now_ms: i64) -> Result<Vec<Alarm>, AlarmError> {
        let due: Vec<Alarm> = self
            .get_all()?
            .into_iter()
            .filter(|a| a.scheduled_time <= now_ms)
            .collect();
        self.db
            .transaction(|conn| {
                for alarm in &due {
                    conn.execute("DELETE FROM alarms WHERE name = ?1", params![alarm.name])?;
                }
                Ok(())
            })
            .map_err(|e| AlarmError::DatabaseError(e.to_string()))?;
        Ok(due)
    }

    fn min_delay_ms(&self) -> i64 {
        self.min_delay_ms
    }
}
