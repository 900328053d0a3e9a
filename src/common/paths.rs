//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/topocheck/`
//! - macOS: `~/Library/Application Support/topocheck/`
//! - Windows: `%APPDATA%\topocheck\`

use std::path::{Path, PathBuf};

/// Application name used for the config directory
const APP_NAME: &str = "topocheck";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve `path` relative to the directory containing `base_file`
///
/// Absolute paths are returned unchanged.
pub fn resolve_relative(base_file: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    base_file
        .parent()
        .unwrap_or(Path::new("."))
        .join(path)
}
