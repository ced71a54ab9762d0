use std::fmt;

use super::tab::{TabId, WindowId};

// === HostError ===

/// Errors reported by the browser host when an outbound action fails.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The tab closed (or never existed) by the time the call ran.
    TabNotFound(TabId),
    /// The window closed (or never existed) by the time the call ran.
    WindowNotFound(WindowId),
    /// The page cannot be scripted or captured (browser-internal pages etc).
    Restricted(String),
    /// The extension lacks the permission for this call.
    PermissionDenied(String),
    /// The host refused the operation for another reason.
    Unavailable(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::TabNotFound(id) => write!(f, "Tab not found: {}", id),
            HostError::WindowNotFound(id) => write!(f, "Window not found: {}", id),
            HostError::Restricted(msg) => write!(f, "Restricted page: {}", msg),
            HostError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            HostError::Unavailable(msg) => write!(f, "Host operation unavailable: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

// === StorageError ===

/// Errors related to the persisted key-value store.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Database operation failed.
    DatabaseError(String),
    /// Failed to serialize or deserialize a stored value.
    SerializationError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// The underlying store failed.
    Storage(StorageError),
    /// The provided settings key is not a synced settings key.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Storage(e) => write!(f, "Settings storage error: {}", e),
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for SettingsError {
    fn from(e: StorageError) -> Self {
        SettingsError::Storage(e)
    }
}

// === AlarmError ===

/// Errors related to the durable alarm service.
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmError {
    /// Database operation failed.
    DatabaseError(String),
    /// The alarm name is empty.
    InvalidName(String),
}

impl fmt::Display for AlarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmError::DatabaseError(msg) => write!(f, "Alarm database error: {}", msg),
            AlarmError::InvalidName(name) => write!(f, "Invalid alarm name: '{}'", name),
        }
    }
}

impl std::error::Error for AlarmError {}

// === ImageError ===

/// Errors related to thumbnail and capture storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    /// The value is not a base64 `data:` URL.
    InvalidDataUrl(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::InvalidDataUrl(msg) => write!(f, "Invalid image data URL: {}", msg),
            ImageError::DatabaseError(msg) => write!(f, "Image database error: {}", msg),
        }
    }
}

impl std::error::Error for ImageError {}

// === MessageError ===

/// Errors decoding an inbound runtime message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageError {
    /// The message has no string `action` field.
    MissingAction,
    /// The action is not one the core handles.
    UnknownAction(String),
    /// The action is known but its payload is missing fields or has wrong types.
    Malformed(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::MissingAction => write!(f, "Message has no action"),
            MessageError::UnknownAction(action) => write!(f, "Unknown message action: {}", action),
            MessageError::Malformed(msg) => write!(f, "Malformed message: {}", msg),
        }
    }
}

impl std::error::Error for MessageError {}

// === ConfigError ===

/// Errors related to the runtime configuration file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the config file.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// === SuspendError ===

/// Internal failures of the suspend/resume engine. The public operations
/// report these as a `false` outcome after logging them.
#[derive(Debug, Clone, PartialEq)]
pub enum SuspendError {
    Host(HostError),
    Storage(StorageError),
    Alarm(AlarmError),
}

impl fmt::Display for SuspendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendError::Host(e) => write!(f, "Suspend host error: {}", e),
            SuspendError::Storage(e) => write!(f, "Suspend storage error: {}", e),
            SuspendError::Alarm(e) => write!(f, "Suspend alarm error: {}", e),
        }
    }
}

impl std::error::Error for SuspendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SuspendError::Host(e) => Some(e),
            SuspendError::Storage(e) => Some(e),
            SuspendError::Alarm(e) => Some(e),
        }
    }
}

impl From<HostError> for SuspendError {
    fn from(e: HostError) -> Self {
        SuspendError::Host(e)
    }
}

impl From<StorageError> for SuspendError {
    fn from(e: StorageError) -> Self {
        SuspendError::Storage(e)
    }
}

impl From<AlarmError> for SuspendError {
    fn from(e: AlarmError) -> Self {
        SuspendError::Alarm(e)
    }
}
