// Tabsleep platform paths
// Resolves where the runtime config file and the state database live.
//
// Linux:   $XDG_CONFIG_HOME/tabsleep, $XDG_DATA_HOME/tabsleep
// macOS:   ~/Library/Application Support/Tabsleep
// Windows: %APPDATA%/Tabsleep

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TABSLEEP_DATA_DIR";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the platform-specific configuration directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join("tabsleep"),
            Err(_) => home_dir().join(".config").join("tabsleep"),
        }
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join("Tabsleep")
    }
    #[cfg(target_os = "windows")]
    {
        match env::var("APPDATA") {
            Ok(appdata) => PathBuf::from(appdata).join("Tabsleep"),
            Err(_) => home_dir().join("AppData").join("Roaming").join("Tabsleep"),
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        home_dir().join(".tabsleep")
    }
}

/// Returns the data directory holding the state database.
///
/// `TABSLEEP_DATA_DIR` wins over the platform default.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join("tabsleep"),
            Err(_) => home_dir().join(".local").join("share").join("tabsleep"),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        get_config_dir()
    }
}
