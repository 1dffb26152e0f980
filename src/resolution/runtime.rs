/// Runtime dependencies from a resolution result
///
/// Managed assemblies are always included; native assets only when their platform
/// qualifier matches the executing platform.
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::lockfile::{AssetKind, ResolutionResult};
use super::pipeline::RestorePipeline;
use super::platform::RuntimePlatform;
use crate::error::ResolveError;

/// A managed assembly and the package it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeAssembly {
    pub path: PathBuf,
    pub package: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDependency {
    pub name: String,
    pub version: String,
    pub assemblies: Vec<RuntimeAssembly>,
    pub native_assets: Vec<PathBuf>,
    /// Script files shipped by the package, for `#load` resolution at run time
    pub script_paths: Vec<PathBuf>,
}

/// Project a resolution result onto `platform`, keeping resolution order
pub fn runtime_dependencies(
    result: &ResolutionResult,
    platform: &RuntimePlatform,
) -> Vec<RuntimeDependency> {
    result
        .packages
        .iter()
        .map(|package| {
            let assemblies = package
                .assets_of(AssetKind::Runtime)
                .chain(package.assets_of(AssetKind::Resource))
                .map(|asset| RuntimeAssembly {
                    path: result.asset_path(package, asset),
                    package: package.name.clone(),
                })
                .collect();

            let native_assets = package
                .assets_of(AssetKind::Native)
                .filter(|asset| {
                    asset
                        .platform
                        .as_deref()
                        .map_or(true, |qualifier| platform.matches(qualifier))
                })
                .map(|asset| result.asset_path(package, asset))
                .collect();

            let script_paths = package
                .assets_of(AssetKind::Script)
                .map(|asset| result.asset_path(package, asset))
                .collect();

            RuntimeDependency {
                name: package.name.clone(),
                version: package.version.clone(),
                assemblies,
                native_assets,
                script_paths,
            }
        })
        .collect()
}

/// Resolves the runtime dependencies of scripts for the executing host
pub struct RuntimeDependencyResolver {
    pipeline: RestorePipeline,
    platform: RuntimePlatform,
}

impl RuntimeDependencyResolver {
    pub fn new(pipeline: RestorePipeline) -> Self {
        Self {
            pipeline,
            platform: RuntimePlatform::current(),
        }
    }

    pub fn with_platform(mut self, platform: RuntimePlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn get_dependencies(
        &self,
        script_dir: &Path,
        script_files: &[PathBuf],
        target: &str,
    ) -> Result<Vec<RuntimeDependency>, ResolveError> {
        let project = self
            .pipeline
            .restore_scripts(script_dir, script_files, target)?;
        Ok(runtime_dependencies(&project.result, &self.platform))
    }
}
