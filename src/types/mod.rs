// Tabsleep shared type definitions
// Each submodule defines types used across the core.

pub mod errors;
pub mod event;
pub mod message;
pub mod settings;
pub mod suspended;
pub mod tab;
pub mod trigger;
