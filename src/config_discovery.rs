use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::ScriptpackConfig;
use crate::xdg;

/// Project-level configuration file name
pub const CONFIG_FILE: &str = "scriptpack.toml";

/// Discovers configuration by traversing up the directory tree, then the user config
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    let project_config = start_dir
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|path| path.is_file());

    project_config.or_else(|| xdg::user_config_file().filter(|path| path.is_file()))
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path. Otherwise, auto-discovers
/// from the current directory. Falls back to defaults when nothing is found.
pub fn load_config_with_discovery(explicit_path: Option<&Path>) -> Result<ScriptpackConfig> {
    if let Some(config_path) = explicit_path {
        return ScriptpackConfig::from_file(config_path);
    }

    let current_dir =
        std::env::current_dir().context("Failed to get current directory for config discovery")?;

    match discover_config(&current_dir) {
        Some(discovered_path) => {
            tracing::debug!(config = %discovered_path.display(), "using discovered config");
            ScriptpackConfig::from_file(&discovered_path)
        }
        None => Ok(ScriptpackConfig::default()),
    }
}
