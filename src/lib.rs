//! Tabsleep — tab lifecycle core of a browser tab suspender.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod context;
pub mod database;
pub mod host;
pub mod managers;
pub mod platform;
pub mod router;
pub mod services;
pub mod types;
