/// Scan → manifest → restore → resolution result
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::lockfile::ResolutionResult;
use crate::error::ResolveError;
use crate::restore::{
    ManifestBuilder, ManifestFileInfo, ManifestStore, ProjectManifest, Restorer, SCRIPT_VARIANT,
};
use crate::script::{DirectiveScanner, ScanResult};

/// Output of a restore for a set of scripts
#[derive(Debug, Clone)]
pub struct RestoredProject {
    pub scan: ScanResult,
    pub manifest: ProjectManifest,
    pub manifest_file: ManifestFileInfo,
    pub result: ResolutionResult,
}

/// Shared restore steps used by the compilation and runtime resolvers
#[derive(Clone)]
pub struct RestorePipeline {
    store: ManifestStore,
    restorer: Arc<dyn Restorer>,
    scanner: DirectiveScanner,
    sources: Vec<String>,
}

impl RestorePipeline {
    pub fn new(store: ManifestStore, restorer: Arc<dyn Restorer>) -> Self {
        Self {
            store,
            restorer,
            scanner: DirectiveScanner::new(),
            sources: Vec::new(),
        }
    }

    pub fn with_scanner(mut self, scanner: DirectiveScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Registry sources passed to every restore, overriding ambient configuration
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn scanner(&self) -> &DirectiveScanner {
        &self.scanner
    }

    /// Scan `script_files`, persist their manifest and restore it
    pub fn restore_scripts(
        &self,
        script_dir: &Path,
        script_files: &[PathBuf],
        target: &str,
    ) -> Result<RestoredProject, ResolveError> {
        let scan = self.scanner.scan(script_files)?.into_result()?;

        let manifest = ManifestBuilder::new(script_dir, target)
            .scan(&scan)
            .declarations_in(script_dir)?
            .build();
        debug!(
            script_dir = %script_dir.display(),
            packages = manifest.packages.len(),
            frameworks = manifest.frameworks.len(),
            "manifest built"
        );

        let (manifest_file, result) = self.restore_manifest(&manifest, SCRIPT_VARIANT)?;

        Ok(RestoredProject {
            scan,
            manifest,
            manifest_file,
            result,
        })
    }

    /// Persist and restore an explicit manifest under `variant`
    pub fn restore_manifest(
        &self,
        manifest: &ProjectManifest,
        variant: &str,
    ) -> Result<(ManifestFileInfo, ResolutionResult), ResolveError> {
        let manifest_file = self.store.write(manifest, variant)?;
        self.restorer.restore(&manifest_file, &self.sources)?;
        let result = ResolutionResult::load(&manifest_file.resolution_path())?;
        Ok((manifest_file, result))
    }
}
