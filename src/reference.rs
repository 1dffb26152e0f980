/// Compiler-facing resolver for `#r` directive text
///
/// Package and SDK shorthand go through the restore pipeline; anything else is handed to a
/// plain [`FileReferenceResolver`]. Results are memoized per directive and script directory,
/// so repeated calls while compiling one script never restore twice.
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::logging::operations;
use crate::package::PackageReference;
use crate::resolution::{
    compilation_dependencies, CompilationDependency, CompilationDependencyResolver,
};
use crate::restore::manifest::reference_variant;
use crate::restore::ManifestBuilder;
use crate::script::directives::{classify_reference, ReferenceKind};

/// A reference handed to the compiler
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AssemblyReference {
    /// Assembly file on disk
    File(PathBuf),
    /// Assembly name left for the compiler's own lookup
    Name(String),
}

/// Resolves plain file references and assembly names
pub trait FileReferenceResolver: Send + Sync {
    fn resolve(
        &self,
        reference: &str,
        base_file: &Path,
    ) -> Result<Vec<AssemblyReference>, ResolveError>;
}

/// Resolves paths relative to the referencing script; bare names pass through
#[derive(Debug, Clone, Default)]
pub struct PathReferenceResolver;

impl FileReferenceResolver for PathReferenceResolver {
    fn resolve(
        &self,
        reference: &str,
        base_file: &Path,
    ) -> Result<Vec<AssemblyReference>, ResolveError> {
        let looks_like_path = reference.contains('/')
            || reference.contains('\\')
            || Path::new(reference).extension().is_some_and(|ext| {
                ext.eq_ignore_ascii_case("dll") || ext.eq_ignore_ascii_case("exe")
            });

        if !looks_like_path {
            return Ok(vec![AssemblyReference::Name(reference.to_string())]);
        }

        let base_dir = base_file.parent().unwrap_or_else(|| Path::new("."));
        let path = base_dir.join(reference);
        if path.is_file() {
            Ok(vec![AssemblyReference::File(path)])
        } else {
            Err(ResolveError::Reference {
                reference: reference.to_string(),
                base: base_file.to_path_buf(),
                message: format!("file not found: {}", path.display()),
            })
        }
    }
}

/// Dispatches `#r` text to package, SDK or file resolution
pub struct ReferenceDirectiveResolver {
    compilation: CompilationDependencyResolver,
    files: Box<dyn FileReferenceResolver>,
    target: String,
    /// Script-level dependencies per script directory
    scripts: Mutex<HashMap<PathBuf, Arc<Vec<CompilationDependency>>>>,
    /// Resolved references keyed by directive text and script directory
    resolved: Mutex<HashMap<(String, PathBuf), Vec<AssemblyReference>>>,
}

impl ReferenceDirectiveResolver {
    pub fn new(compilation: CompilationDependencyResolver, target: impl Into<String>) -> Self {
        Self {
            compilation,
            files: Box::new(PathReferenceResolver),
            target: target.into(),
            scripts: Mutex::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_file_resolver(mut self, files: Box<dyn FileReferenceResolver>) -> Self {
        self.files = files;
        self
    }

    /// Resolve raw directive text found in `base_file`
    pub fn resolve(
        &self,
        reference: &str,
        base_file: &Path,
    ) -> Result<Vec<AssemblyReference>, ResolveError> {
        let kind = classify_reference(reference).map_err(|message| ResolveError::Reference {
            reference: reference.to_string(),
            base: base_file.to_path_buf(),
            message,
        })?;

        let script_dir = base_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let key = (reference.trim().to_lowercase(), script_dir.clone());

        if let Some(cached) = self.lock_resolved().get(&key) {
            return Ok(cached.clone());
        }

        let references = match kind {
            ReferenceKind::Package(package) => {
                self.resolve_package(&package, base_file, &script_dir)?
            }
            ReferenceKind::Framework(name) => self.resolve_framework(&name, &script_dir)?,
            // Plain references are not memoized
            ReferenceKind::File(path) => return self.files.resolve(&path, base_file),
        };

        self.lock_resolved().insert(key, references.clone());
        Ok(references)
    }

    fn lock_resolved(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(String, PathBuf), Vec<AssemblyReference>>> {
        // A poisoned map only ever holds complete entries
        self.resolved.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Dependencies of the script itself, restored at most once per directory
    fn script_dependencies(
        &self,
        base_file: &Path,
        script_dir: &Path,
    ) -> Result<Arc<Vec<CompilationDependency>>, ResolveError> {
        if let Some(deps) = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(script_dir)
        {
            return Ok(deps.clone());
        }

        let deps = Arc::new(self.compilation.get_dependencies(
            script_dir,
            &[base_file.to_path_buf()],
            true,
            &self.target,
        )?);

        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(script_dir.to_path_buf(), deps.clone());
        Ok(deps)
    }

    /// Dependency list of an earlier script restore that already contains `name`
    fn restored_with(&self, name: &str) -> Option<Arc<Vec<CompilationDependency>>> {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|deps| deps.iter().any(|d| d.name.eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn resolve_package(
        &self,
        package: &PackageReference,
        base_file: &Path,
        script_dir: &Path,
    ) -> Result<Vec<AssemblyReference>, ResolveError> {
        // Loaded scripts in other directories share the restore of the script that loads them
        if let Some(deps) = self.restored_with(&package.name) {
            debug!(package = %package, "package already restored in this compilation");
            return Ok(closure_assemblies(&deps, &package.name));
        }

        let deps = if base_file.is_file() {
            self.script_dependencies(base_file, script_dir)?
        } else {
            Arc::new(Vec::new())
        };

        if deps.iter().any(|d| d.name.eq_ignore_ascii_case(&package.name)) {
            debug!(package = %package, "package already restored for script");
            return Ok(closure_assemblies(&deps, &package.name));
        }

        // Not part of the script's restore (e.g. interactive input): restore it alone
        info!(
            operation = operations::RESTORE,
            package = %package,
            "restoring package on demand"
        );
        let manifest = ManifestBuilder::new(script_dir, &self.target)
            .package(package.clone())
            .build();
        let (_, result) = self
            .compilation
            .pipeline()
            .restore_manifest(&manifest, &reference_variant(&package.to_string()))?;
        let deps = compilation_dependencies(&result, None, self.compilation.platform())?;

        Ok(closure_assemblies(&deps, &package.name))
    }

    fn resolve_framework(
        &self,
        name: &str,
        script_dir: &Path,
    ) -> Result<Vec<AssemblyReference>, ResolveError> {
        let manifest = ManifestBuilder::new(script_dir, &self.target)
            .framework(name)
            .build();
        let variant = reference_variant(&format!("sdk:{}", name));
        let (manifest_file, result) = self
            .compilation
            .pipeline()
            .restore_manifest(&manifest, &variant)?;

        let deps = compilation_dependencies(&result, None, self.compilation.platform())?;
        let framework = deps
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ResolveError::ResolutionResult {
                path: manifest_file.resolution_path(),
                message: format!("framework {} was not resolved", name),
            })?;

        Ok(framework
            .assembly_paths
            .iter()
            .cloned()
            .map(AssemblyReference::File)
            .collect())
    }
}

/// Assemblies of `root` and everything it depends on, in dependency-list order
fn closure_assemblies(deps: &[CompilationDependency], root: &str) -> Vec<AssemblyReference> {
    let mut included = HashSet::new();
    let mut pending = vec![root.to_lowercase()];

    while let Some(name) = pending.pop() {
        if !included.insert(name.clone()) {
            continue;
        }
        if let Some(dep) = deps.iter().find(|d| d.name.to_lowercase() == name) {
            pending.extend(dep.dependencies.iter().map(|d| d.to_lowercase()));
        }
    }

    deps.iter()
        .filter(|d| included.contains(&d.name.to_lowercase()))
        .flat_map(|d| d.assembly_paths.iter().cloned())
        .map(AssemblyReference::File)
        .collect()
}
