//! Tabsleep database layer.
//!
//! One SQLite file holds the two storage scopes, the durable alarms and
//! the captured images. [`Database`] opens it and applies pending schema
//! migrations; the services above it own their tables.
//!
//! ```no_run
//! use tabsleep::database::Database;
//!
//! let db = Database::open("tabsleep.db").expect("failed to open database");
//! db.transaction(|conn| {
//!     conn.execute("DELETE FROM alarms", [])?;
//!     Ok(())
//! })
//! .expect("failed to clear alarms");
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
