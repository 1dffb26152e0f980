/// Compile-time dependencies from a resolution result
///
/// Per package, reference assemblies (`ref/`) win over implementation assemblies (`lib/`).
/// Meta-packages standing in for a framework expand into that framework's reference
/// assemblies. Paths are de-duplicated across the whole list.
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::lockfile::{AssetKind, ResolutionResult, ResolvedPackage};
use super::pipeline::RestorePipeline;
use super::platform::RuntimePlatform;
use crate::error::ResolveError;
use crate::restore::ProjectManifest;

const REFERENCE_FOLDER: &str = "ref";
const LIBRARY_FOLDER: &str = "lib";

/// A package (or framework) and the paths it contributes to compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationDependency {
    pub name: String,
    pub version: String,
    /// Assemblies passed to the compiler; may be empty for native or runtime-only packages
    pub assembly_paths: Vec<PathBuf>,
    pub native_paths: Vec<PathBuf>,
    pub analyzer_paths: Vec<PathBuf>,
    /// Script files shipped by the package
    pub script_paths: Vec<PathBuf>,
    /// Names of direct dependencies
    pub dependencies: Vec<String>,
}

/// Build the flattened, de-duplicated compile-time dependency list
///
/// With `direct_only`, only packages and frameworks named in the manifest are kept.
pub fn compilation_dependencies(
    result: &ResolutionResult,
    direct_only: Option<&ProjectManifest>,
    platform: &RuntimePlatform,
) -> Result<Vec<CompilationDependency>, ResolveError> {
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();
    let mut expanded_frameworks = HashSet::new();

    let is_direct = |package: &ResolvedPackage| match direct_only {
        None => true,
        Some(manifest) => {
            manifest.packages.iter().any(|p| package.is_named(&p.name))
                || package.framework.as_deref().is_some_and(|framework| {
                    manifest
                        .frameworks
                        .iter()
                        .any(|f| f.eq_ignore_ascii_case(framework))
                })
        }
    };

    for package in result.packages.iter().filter(|p| is_direct(*p)) {
        let assemblies = match &package.framework {
            Some(framework_name) => {
                let framework = result.find_framework(framework_name).ok_or_else(|| {
                    ResolveError::ResolutionResult {
                        path: result.source.clone(),
                        message: format!(
                            "package {} stands in for unknown framework {}",
                            package.name, framework_name
                        ),
                    }
                })?;
                expanded_frameworks.insert(framework.name.to_lowercase());
                framework.reference_assemblies()?
            }
            None => compile_assets(result, package),
        };

        let natives = package
            .assets_of(AssetKind::Native)
            .filter(|a| a.platform.as_deref().map_or(true, |q| platform.matches(q)))
            .map(|a| result.asset_path(package, a))
            .collect();
        let analyzers = package
            .assets_of(AssetKind::Analyzer)
            .map(|a| result.asset_path(package, a))
            .collect();
        let scripts = package
            .assets_of(AssetKind::Script)
            .map(|a| result.asset_path(package, a))
            .collect();

        dependencies.push(CompilationDependency {
            name: package.name.clone(),
            version: package.version.clone(),
            assembly_paths: unique(assemblies, &mut seen),
            native_paths: unique(natives, &mut seen),
            analyzer_paths: unique(analyzers, &mut seen),
            script_paths: unique(scripts, &mut seen),
            dependencies: package.dependencies.clone(),
        });
    }

    // Frameworks referenced directly (sdk: directives) without a meta-package
    for framework in &result.frameworks {
        if expanded_frameworks.contains(&framework.name.to_lowercase()) {
            continue;
        }
        if let Some(manifest) = direct_only {
            if !manifest
                .frameworks
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&framework.name))
            {
                continue;
            }
        }

        dependencies.push(CompilationDependency {
            name: framework.name.clone(),
            version: framework.version.clone(),
            assembly_paths: unique(framework.reference_assemblies()?, &mut seen),
            native_paths: Vec::new(),
            analyzer_paths: Vec::new(),
            script_paths: Vec::new(),
            dependencies: Vec::new(),
        });
    }

    Ok(dependencies)
}

/// Compile assets for one package: `ref/` if present, else `lib/`
fn compile_assets(result: &ResolutionResult, package: &ResolvedPackage) -> Vec<PathBuf> {
    let compile: Vec<_> = package.assets_of(AssetKind::Compile).collect();

    let reference: Vec<_> = compile
        .iter()
        .filter(|a| a.folder() == REFERENCE_FOLDER)
        .collect();
    if !reference.is_empty() {
        return reference
            .into_iter()
            .map(|a| result.asset_path(package, a))
            .collect();
    }

    if !compile.is_empty() {
        return compile
            .into_iter()
            .map(|a| result.asset_path(package, a))
            .collect();
    }

    // No compile group at all: implementation assemblies stand in
    package
        .assets_of(AssetKind::Runtime)
        .filter(|a| a.folder() == LIBRARY_FOLDER && a.platform.is_none())
        .map(|a| result.asset_path(package, a))
        .collect()
}

fn unique(paths: Vec<PathBuf>, seen: &mut HashSet<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Resolves the compile-time dependencies of scripts
pub struct CompilationDependencyResolver {
    pipeline: RestorePipeline,
    platform: RuntimePlatform,
}

impl CompilationDependencyResolver {
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

    pub fn pipeline(&self) -> &RestorePipeline {
        &self.pipeline
    }

    pub fn platform(&self) -> &RuntimePlatform {
        &self.platform
    }

    /// Scan, restore and project `script_files` into compile-time dependencies
    pub fn get_dependencies(
        &self,
        script_dir: &Path,
        script_files: &[PathBuf],
        include_transitive: bool,
        target: &str,
    ) -> Result<Vec<CompilationDependency>, ResolveError> {
        let project = self
            .pipeline
            .restore_scripts(script_dir, script_files, target)?;

        let direct_only = (!include_transitive).then_some(&project.manifest);
        let dependencies = compilation_dependencies(&project.result, direct_only, &self.platform)?;

        debug!(
            script_dir = %script_dir.display(),
            dependencies = dependencies.len(),
            "compilation dependencies resolved"
        );
        Ok(dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageReference;
    use crate::resolution::lockfile::{Asset, FrameworkReference};
    use crate::restore::ManifestBuilder;
    use std::fs;
    use tempfile::TempDir;

    fn asset(kind: AssetKind, path: &str) -> Asset {
        Asset {
            kind,
            path: path.to_string(),
            platform: None,
            locale: None,
        }
    }

    fn package(name: &str, assets: Vec<Asset>) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            path: format!("{}/1.0.0", name.to_lowercase()),
            dependencies: vec![],
            framework: None,
            assets,
        }
    }

    fn result_with(packages: Vec<ResolvedPackage>) -> ResolutionResult {
        let mut result = ResolutionResult::empty("net8.0");
        result.package_folders = vec![PathBuf::from("/packages")];
        result.packages = packages;
        result
    }

    fn linux() -> RuntimePlatform {
        RuntimePlatform::new("linux", "x64")
    }

    #[test]
    fn test_reference_assemblies_win_over_implementation() {
        let result = result_with(vec![package(
            "A",
            vec![
                asset(AssetKind::Compile, "ref/net8.0/A.dll"),
                asset(AssetKind::Compile, "lib/net8.0/A.dll"),
                asset(AssetKind::Runtime, "lib/net8.0/A.dll"),
            ],
        )]);

        let deps = compilation_dependencies(&result, None, &linux()).unwrap();
        assert_eq!(
            deps[0].assembly_paths,
            vec![PathBuf::from("/packages/a/1.0.0/ref/net8.0/A.dll")]
        );
    }

    #[test]
    fn test_library_fallback() {
        let result = result_with(vec![
            package("B", vec![asset(AssetKind::Compile, "lib/net8.0/B.dll")]),
            package("C", vec![asset(AssetKind::Runtime, "lib/net8.0/C.dll")]),
        ]);

        let deps = compilation_dependencies(&result, None, &linux()).unwrap();
        assert_eq!(
            deps[0].assembly_paths,
            vec![PathBuf::from("/packages/b/1.0.0/lib/net8.0/B.dll")]
        );
        assert_eq!(
            deps[1].assembly_paths,
            vec![PathBuf::from("/packages/c/1.0.0/lib/net8.0/C.dll")]
        );
    }

    #[test]
    fn test_native_only_package_is_kept_with_no_assemblies() {
        let mut native = asset(AssetKind::Native, "runtimes/linux-x64/native/libsqlite.so");
        native.platform = Some("linux-x64".to_string());
        let mut other = asset(AssetKind::Native, "runtimes/win-x64/native/sqlite.dll");
        other.platform = Some("win-x64".to_string());

        let result = result_with(vec![package("SQLite.Native", vec![native, other])]);

        let deps = compilation_dependencies(&result, None, &linux()).unwrap();
        assert_eq!(deps.len(), 1);
        assert!(deps[0].assembly_paths.is_empty());
        assert_eq!(deps[0].native_paths.len(), 1);
    }

    #[test]
    fn test_shared_paths_appear_once() {
        let mut result = result_with(vec![
            package("A", vec![asset(AssetKind::Compile, "ref/net8.0/Shared.dll")]),
            package("B", vec![asset(AssetKind::Compile, "ref/net8.0/Shared.dll")]),
        ]);
        // Both packages point at the same physical directory
        result.packages[1].path = "a/1.0.0".to_string();

        let deps = compilation_dependencies(&result, None, &linux()).unwrap();
        let all: Vec<_> = deps.iter().flat_map(|d| d.assembly_paths.iter()).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(deps.len(), 2);
        assert!(deps[1].assembly_paths.is_empty());
    }

    #[test]
    fn test_meta_package_expands_framework() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("ref/net8.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Web.Hosting.dll"), "").unwrap();
        fs::write(dir.join("Web.Routing.dll"), "").unwrap();

        let mut meta = package("Web.App", vec![]);
        meta.framework = Some("Web.App".to_string());
        let mut result = result_with(vec![meta]);
        result.frameworks.push(FrameworkReference {
            name: "Web.App".to_string(),
            version: "8.0.0".to_string(),
            reference_directory: dir.clone(),
        });

        let deps = compilation_dependencies(&result, None, &linux()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(
            deps[0].assembly_paths,
            vec![dir.join("Web.Hosting.dll"), dir.join("Web.Routing.dll")]
        );
    }

    #[test]
    fn test_unknown_framework_is_fatal() {
        let mut meta = package("Web.App", vec![]);
        meta.framework = Some("Web.App".to_string());
        let result = result_with(vec![meta]);

        assert!(compilation_dependencies(&result, None, &linux()).is_err());
    }

    #[test]
    fn test_direct_only_filters_transitive_packages() {
        let mut a = package("A", vec![asset(AssetKind::Compile, "ref/net8.0/A.dll")]);
        a.dependencies = vec!["B".to_string()];
        let b = package("B", vec![asset(AssetKind::Compile, "ref/net8.0/B.dll")]);
        let result = result_with(vec![a, b]);

        let manifest = ManifestBuilder::new("/scripts", "net8.0")
            .package(PackageReference::new("a", "1.0.0"))
            .build();

        let deps = compilation_dependencies(&result, Some(&manifest), &linux()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "A");
        assert_eq!(deps[0].dependencies, vec!["B".to_string()]);
    }
}
