//! XDG Base Directory support
//!
//! - `$XDG_CACHE_HOME/scriptpack/` (default: `~/.cache/scriptpack/`) - restore projects and results
//! - `$XDG_CONFIG_HOME/scriptpack/` (default: `~/.config/scriptpack/`) - user configuration

use std::path::PathBuf;

const APP_DIR: &str = "scriptpack";

/// Root of all restore projects
///
/// Respects `XDG_CACHE_HOME`, falling back to the platform cache directory.
pub fn cache_dir() -> PathBuf {
    if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg_cache).join(APP_DIR)
    } else if let Some(cache) = dirs::cache_dir() {
        cache.join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".cache").join(APP_DIR)
    } else {
        PathBuf::from(".scriptpack-cache")
    }
}

/// Directory holding the user-level `config.toml`
///
/// Respects `XDG_CONFIG_HOME`, falling back to `~/.config` on every platform.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg_config).join(APP_DIR))
    } else {
        dirs::home_dir().map(|home| home.join(".config").join(APP_DIR))
    }
}

/// User-level configuration file
pub fn user_config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
