use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::xdg;

/// Complete scriptpack configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptpackConfig {
    /// Target platform identifier used when none is given on the command line
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default)]
    pub restore: RestoreConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for ScriptpackConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            restore: RestoreConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// External restore tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Executable name or path
    #[serde(default = "default_restore_command")]
    pub command: String,

    /// Arguments placed before the manifest path
    #[serde(default)]
    pub args: Vec<String>,

    /// Registry sources passed to every restore
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            command: default_restore_command(),
            args: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Restore project cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root of per-script project directories (default: XDG cache dir)
    #[serde(default)]
    pub dir: Option<String>,

    /// Skip restores whose manifest is unchanged
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            enabled: true,
        }
    }
}

fn default_target() -> String {
    "net8.0".to_string()
}

fn default_restore_command() -> String {
    "scriptpack-restore".to_string()
}

fn default_true() -> bool {
    true
}

impl ScriptpackConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ScriptpackConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Root directory for restore projects
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(xdg::cache_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            anyhow::bail!("target must not be empty");
        }

        if self.restore.command.trim().is_empty() {
            anyhow::bail!("restore.command must not be empty");
        }

        if let Some(dir) = &self.cache.dir {
            if dir.trim().is_empty() {
                anyhow::bail!("cache.dir must not be empty when set");
            }
        }

        for source in &self.restore.sources {
            if source.trim().is_empty() {
                anyhow::bail!("restore.sources must not contain empty entries");
            }
        }

        Ok(())
    }
}
