//! Centralized path management for the subproxy CLI
//!
//! The proxy keeps no data on disk; the only file it reads is the optional
//! configuration file.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "subproxy";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// Returns the path to the configuration directory
///
/// `$XDG_CONFIG_HOME/subproxy` when set (Linux/macOS), otherwise the
/// platform configuration directory:
/// - `~/.config/subproxy` on Linux
/// - `~/Library/Application Support/subproxy` on macOS
/// - `%APPDATA%\subproxy` on Windows
///
/// Falls back to `.subproxy` in the current directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".subproxy"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
