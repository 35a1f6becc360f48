//! Platform-specific data directory paths.
//!
//! Grounded on `voice-core::config::paths::get_data_dir`:
//!   Windows: %APPDATA%/voiced/data
//!   macOS:   ~/Library/Application Support/voiced/data
//!   Linux:   $XDG_CONFIG_HOME/voiced/data (default ~/.config)

use std::path::PathBuf;

pub fn get_data_dir() -> PathBuf {
    get_config_base().join("voiced").join("data")
}

fn get_config_base() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata);
        }
        dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("AppData")
                .join("Roaming")
        })
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Application Support")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    }
}
