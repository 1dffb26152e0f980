pub mod cache;
pub mod deps;
pub mod resolve;
pub mod restore;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scriptpack::config::ScriptpackConfig;
use scriptpack::config_discovery::load_config_with_discovery;
use scriptpack::resolution::RestorePipeline;
use scriptpack::restore::{CachedRestorer, CommandRestorer, ManifestStore, Restorer};

use crate::cli::CommonConfigArgs;

/// Configuration merged from file, environment and flags
pub struct Session {
    pub config: ScriptpackConfig,
    pub target: String,
    pub store: ManifestStore,
    pub cache_enabled: bool,
    pub sources: Vec<String>,
}

impl Session {
    pub fn load(common: &CommonConfigArgs) -> Result<Self> {
        let mut config = load_config_with_discovery(common.config.as_deref())?;

        if let Some(command) = &common.restore_command {
            config.restore.command = command.clone();
        }

        let target = common
            .target
            .clone()
            .unwrap_or_else(|| config.target.clone());
        let cache_root = common
            .cache_dir
            .clone()
            .unwrap_or_else(|| config.cache_dir());
        let sources = if common.sources.is_empty() {
            config.restore.sources.clone()
        } else {
            common.sources.clone()
        };

        Ok(Self {
            cache_enabled: config.cache.enabled && !common.no_cache,
            target,
            store: ManifestStore::new(cache_root),
            sources,
            config,
        })
    }

    /// Restorer for this session, wrapped in the restore cache unless disabled
    pub fn restorer(&self) -> Arc<dyn Restorer> {
        let command: Arc<dyn Restorer> = Arc::new(CommandRestorer::new(
            self.config.restore.command.clone(),
            self.config.restore.args.clone(),
        ));

        if self.cache_enabled {
            Arc::new(CachedRestorer::new(command))
        } else {
            command
        }
    }

    pub fn pipeline(&self) -> RestorePipeline {
        RestorePipeline::new(self.store.clone(), self.restorer()).with_sources(self.sources.clone())
    }
}

/// Canonical script path and its directory
pub fn script_location(script: &Path) -> Result<(PathBuf, PathBuf)> {
    if !script.is_file() {
        anyhow::bail!("Script not found: {}", script.display());
    }

    let script = script
        .canonicalize()
        .with_context(|| format!("Failed to resolve script path: {}", script.display()))?;
    let dir = script
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("Script has no parent directory: {}", script.display()))?;

    Ok((script, dir))
}
