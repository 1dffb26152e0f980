/// Project manifests: construction, deterministic serialization and on-disk layout
///
/// The serialized manifest is the cache fingerprint used by the cached restorer, so it
/// contains every field that participates in resolution and nothing else.
use anyhow::anyhow;
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ResolveError;
use crate::fsutil::write_atomic;
use crate::package::PackageReference;
use crate::script::ScanResult;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const RESOLUTION_FILE: &str = "resolution.lock.json";
pub const CACHE_RECORD_FILE: &str = "manifest.json.cache";
pub const REGISTRY_CONFIG_FILE: &str = "registry.config";
pub const PACKAGE_DECLARATION_FILE: &str = "packages.kdl";

/// Variant name of the manifest built for a script's own directives
pub const SCRIPT_VARIANT: &str = "script";

/// In-memory description of a script's declared dependencies
#[derive(Debug, Clone, Default)]
pub struct ProjectManifest {
    /// Target platform identifier (framework moniker)
    pub target: String,
    /// Sorted case-insensitively by name, one entry per name
    pub packages: Vec<PackageReference>,
    /// Framework (platform SDK) references
    pub frameworks: Vec<String>,
    /// Plain assembly references; not serialized
    pub assemblies: Vec<String>,
    /// Directory owning the script; not serialized
    pub directory: PathBuf,
}

#[derive(Serialize)]
struct ManifestDocumentRef<'a> {
    target: &'a str,
    packages: &'a [PackageReference],
    frameworks: &'a [String],
}

#[derive(Deserialize)]
struct ManifestDocument {
    target: String,
    #[serde(default)]
    packages: Vec<PackageReference>,
    #[serde(default)]
    frameworks: Vec<String>,
}

impl ProjectManifest {
    /// True when every package pins an exact version
    pub fn is_pinned(&self) -> bool {
        self.packages.iter().all(PackageReference::is_pinned)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.frameworks.is_empty()
    }

    /// Deterministic serialization; identical input always yields identical bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packages = self.packages.clone();
        packages.sort();
        let mut frameworks = self.frameworks.clone();
        frameworks.sort_by_key(|f| f.to_lowercase());

        let document = ManifestDocumentRef {
            target: &self.target,
            packages: &packages,
            frameworks: &frameworks,
        };

        // Serializing plain strings into a Vec cannot fail
        let mut bytes = serde_json::to_vec_pretty(&document).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Parse a serialized manifest
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, ResolveError> {
        let document: ManifestDocument =
            serde_json::from_slice(bytes).map_err(|e| ResolveError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Self {
            target: document.target,
            packages: document.packages,
            frameworks: document.frameworks,
            assemblies: Vec::new(),
            directory: PathBuf::new(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let bytes = fs::read(path).map_err(|e| ResolveError::io(path, e))?;
        Self::from_bytes(path, &bytes)
    }
}

/// Location of a persisted manifest and its optional registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestFileInfo {
    pub path: PathBuf,
    pub registry_config: Option<PathBuf>,
}

impl ManifestFileInfo {
    pub fn new(path: impl Into<PathBuf>, registry_config: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            registry_config,
        }
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Where the restore step writes its resolution result
    pub fn resolution_path(&self) -> PathBuf {
        self.directory().join(RESOLUTION_FILE)
    }

    /// Where the cached restorer keeps its copy of the last restored manifest
    pub fn cache_record_path(&self) -> PathBuf {
        self.directory().join(CACHE_RECORD_FILE)
    }
}

/// Merges directives and package declarations into a [`ProjectManifest`]
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    manifest: ProjectManifest,
}

impl ManifestBuilder {
    /// The target is supplied by the caller, never inferred
    pub fn new(directory: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            manifest: ProjectManifest {
                target: target.into(),
                directory: directory.into(),
                ..Default::default()
            },
        }
    }

    /// Add a package; a later reference with the same name overrides the earlier version
    pub fn package(mut self, package: PackageReference) -> Self {
        self.add_package(package);
        self
    }

    pub fn framework(mut self, name: impl Into<String>) -> Self {
        self.add_framework(name.into());
        self
    }

    pub fn scan(mut self, scan: &ScanResult) -> Self {
        for package in &scan.packages {
            self.add_package(package.clone());
        }
        for framework in &scan.frameworks {
            self.add_framework(framework.clone());
        }
        for reference in &scan.references {
            if !self.manifest.assemblies.contains(&reference.reference) {
                self.manifest.assemblies.push(reference.reference.clone());
            }
        }
        self
    }

    /// Merge `packages.kdl` from `directory`, if present
    pub fn declarations_in(self, directory: &Path) -> Result<Self, ResolveError> {
        let path = directory.join(PACKAGE_DECLARATION_FILE);
        if !path.is_file() {
            return Ok(self);
        }
        let packages = parse_package_declarations(&path)?;
        Ok(packages
            .into_iter()
            .fold(self, |builder, package| builder.package(package)))
    }

    pub fn build(mut self) -> ProjectManifest {
        self.manifest.packages.sort();
        self.manifest.frameworks.sort_by_key(|f| f.to_lowercase());
        self.manifest
    }

    fn add_package(&mut self, package: PackageReference) {
        match self.manifest.packages.iter_mut().find(|p| **p == package) {
            Some(existing) => *existing = package,
            None => self.manifest.packages.push(package),
        }
    }

    fn add_framework(&mut self, name: String) {
        if !self
            .manifest
            .frameworks
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&name))
        {
            self.manifest.frameworks.push(name);
        }
    }
}

/// Parse a KDL package declaration file
///
/// ```kdl
/// package "Newtonsoft.Json" version="13.0.3"
/// package "Serilog"
/// ```
pub fn parse_package_declarations(path: &Path) -> Result<Vec<PackageReference>, ResolveError> {
    let manifest_error = |message: String| ResolveError::Manifest {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| ResolveError::io(path, e))?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| manifest_error(format!("Invalid KDL syntax: {}", e)))?;

    doc.nodes()
        .iter()
        .map(|node| parse_package_node(node).map_err(|e| manifest_error(e.to_string())))
        .collect()
}

fn parse_package_node(node: &KdlNode) -> anyhow::Result<PackageReference> {
    match node.name().value() {
        "package" => {
            let name = node
                .entries()
                .iter()
                .filter(|e| e.name().is_none())
                .find_map(|e| e.value().as_string())
                .ok_or_else(|| anyhow!("package requires a name argument"))?;

            let version = node
                .get("version")
                .and_then(|e| e.as_string())
                .unwrap_or("");

            PackageReference::parse_shorthand(name)
                .map(|p| PackageReference::new(p.name, version.trim()))
                .ok_or_else(|| anyhow!("Invalid package name: '{}'", name))
        }
        other => Err(anyhow!("Unknown declaration: {}", other)),
    }
}

/// Lays out per-script project directories under a cache root
///
/// `<root>/projects/<hash of script dir>/<target>/<variant>/manifest.json`
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all project directories for one script directory
    pub fn script_root(&self, script_dir: &Path) -> PathBuf {
        let canonical = script_dir
            .canonicalize()
            .unwrap_or_else(|_| script_dir.to_path_buf());
        self.root
            .join("projects")
            .join(short_hash(canonical.to_string_lossy().as_bytes()))
    }

    pub fn project_dir(&self, script_dir: &Path, target: &str, variant: &str) -> PathBuf {
        self.script_root(script_dir)
            .join(sanitize(target))
            .join(sanitize(variant))
    }

    /// Persist `manifest` for `variant`, rewriting the file only when its bytes change
    pub fn write(
        &self,
        manifest: &ProjectManifest,
        variant: &str,
    ) -> Result<ManifestFileInfo, ResolveError> {
        let dir = self.project_dir(&manifest.directory, &manifest.target, variant);
        let path = dir.join(MANIFEST_FILE);
        let bytes = manifest.to_bytes();

        let unchanged = fs::read(&path).map(|old| old == bytes).unwrap_or(false);
        if !unchanged {
            write_atomic(&path, &bytes).map_err(|e| ResolveError::io(&path, e))?;
            debug!(manifest = %path.display(), "manifest written");
        }

        Ok(ManifestFileInfo::new(
            path,
            find_registry_config(&manifest.directory),
        ))
    }
}

/// Variant name for an on-demand restore keyed by `key`
pub fn reference_variant(key: &str) -> String {
    format!("ref-{}", short_hash(key.to_lowercase().as_bytes()))
}

/// Walk up from `start_dir` looking for a registry configuration override
pub fn find_registry_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(REGISTRY_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

fn short_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())[..16].to_string()
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::DirectiveScanner;
    use tempfile::TempDir;

    #[test]
    fn test_later_declaration_overrides() {
        let manifest = ManifestBuilder::new("/scripts", "net8.0")
            .package(PackageReference::new("PackageB", "3.2.1"))
            .package(PackageReference::new("PackageA", "1.2.3"))
            .package(PackageReference::new("packageb", "3.2.2"))
            .build();

        assert_eq!(manifest.packages.len(), 2);
        assert_eq!(manifest.packages[0].name, "PackageA");
        assert_eq!(manifest.packages[1].version, "3.2.2");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let first = ManifestBuilder::new("/a", "net8.0")
            .package(PackageReference::new("Zeta", "1.0.0"))
            .package(PackageReference::new("alpha", "2.0.0"))
            .framework("Microsoft.AspNetCore.App")
            .build();
        let second = ManifestBuilder::new("/b", "net8.0")
            .package(PackageReference::new("alpha", "2.0.0"))
            .package(PackageReference::new("Zeta", "1.0.0"))
            .framework("Microsoft.AspNetCore.App")
            .build();

        assert_eq!(first.to_bytes(), second.to_bytes());

        let text = String::from_utf8(first.to_bytes()).unwrap();
        assert!(text.find("alpha").unwrap() < text.find("Zeta").unwrap());
        assert!(!text.contains("/a"));
    }

    #[test]
    fn test_target_participates_in_fingerprint() {
        let net8 = ManifestBuilder::new("/a", "net8.0")
            .package(PackageReference::new("A", "1.0.0"))
            .build();
        let net9 = ManifestBuilder::new("/a", "net9.0")
            .package(PackageReference::new("A", "1.0.0"))
            .build();

        assert_ne!(net8.to_bytes(), net9.to_bytes());
    }

    #[test]
    fn test_round_trip_preserves_resolution_fields() {
        let manifest = ManifestBuilder::new("/a", "net8.0")
            .package(PackageReference::new("A", "[1.0.0]"))
            .package(PackageReference::new("B", "2.*"))
            .build();

        let parsed = ProjectManifest::from_bytes(Path::new("m.json"), &manifest.to_bytes()).unwrap();
        assert_eq!(parsed.target, "net8.0");
        assert_eq!(parsed.packages.len(), 2);
        assert!(!parsed.is_pinned());
    }

    #[test]
    fn test_declarations_override_directives() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("main.csx"),
            "#r \"package: Serilog, 2.0.0\"\n#r \"package: Dapper, 2.1.0\"\n",
        )
        .unwrap();
        fs::write(
            temp.path().join(PACKAGE_DECLARATION_FILE),
            "package \"serilog\" version=\"3.1.1\"\npackage \"Humanizer\"\n",
        )
        .unwrap();

        let scan = DirectiveScanner::new()
            .scan(&[temp.path().join("main.csx")])
            .unwrap();
        let manifest = ManifestBuilder::new(temp.path(), "net8.0")
            .scan(&scan)
            .declarations_in(temp.path())
            .unwrap()
            .build();

        let packages: Vec<_> = manifest
            .packages
            .iter()
            .map(|p| (p.name.as_str(), p.version.as_str()))
            .collect();
        assert_eq!(
            packages,
            vec![("Dapper", "2.1.0"), ("Humanizer", ""), ("serilog", "3.1.1")]
        );
    }

    #[test]
    fn test_unknown_declaration_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(PACKAGE_DECLARATION_FILE);
        fs::write(&path, "tool \"dotnet-ef\"\n").unwrap();

        let err = parse_package_declarations(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown declaration"));
    }

    #[test]
    fn test_store_layout_and_registry_config() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        fs::create_dir_all(scripts.join("nested")).unwrap();
        fs::write(scripts.join(REGISTRY_CONFIG_FILE), "sources").unwrap();

        let store = ManifestStore::new(temp.path().join("cache"));
        let manifest = ManifestBuilder::new(scripts.join("nested"), "net8.0")
            .package(PackageReference::new("A", "1.0.0"))
            .build();

        let info = store.write(&manifest, SCRIPT_VARIANT).unwrap();
        assert!(info.path.starts_with(temp.path().join("cache/projects")));
        assert!(info.path.ends_with("net8.0/script/manifest.json"));
        assert_eq!(
            info.registry_config.as_deref(),
            Some(scripts.join(REGISTRY_CONFIG_FILE).as_path())
        );
        assert_eq!(fs::read(&info.path).unwrap(), manifest.to_bytes());
        assert_eq!(info.resolution_path(), info.directory().join(RESOLUTION_FILE));
    }
}
