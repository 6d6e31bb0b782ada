//! Config file discovery.
//!
//! Probing order: `./config.jsonc`, `./config.json`, then the same two
//! names under the per-user app-data directory:
//!
//! - macOS: `~/Library/Application Support/pedalera/`
//! - Windows: `%APPDATA%\pedalera\`
//! - elsewhere: `~/.config/pedalera/`

use std::path::PathBuf;

/// Application name used for the app-data directory.
pub const APP_NAME: &str = "pedalera";

const CONFIG_FILE_NAMES: [&str; 2] = ["config.jsonc", "config.json"];

/// Locate an existing config file, or `None` when nothing is found.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILE_NAMES {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Some(path);
        }
    }

    let app_dir = app_data_dir()?;
    for name in CONFIG_FILE_NAMES {
        let path = app_dir.join(name);
        if path.is_file() {
            return Some(path);
        }
    }

    None
}

/// The per-user app-data directory for this application.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME))
}

/// Where a fresh config is written when none was loaded.
pub fn default_save_path() -> PathBuf {
    app_data_dir()
        .map(|dir| dir.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}
