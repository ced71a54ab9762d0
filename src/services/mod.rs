// Tabsleep services
// Services provide the building blocks the managers compose: storage scopes, settings, runtime config, images, placeholder URLs, protection checks and durable alarms.

pub mod alarm_service;
pub mod config;
pub mod image_store;
pub mod placeholder;
pub mod protection;
pub mod settings_store;
pub mod storage;
pub mod tab_state;
