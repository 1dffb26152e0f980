/// Resolution result (lock file) written by the restore step
///
/// The format belongs to the external restore tool. Reading is tolerant: unknown fields and
/// asset kinds are skipped so newer tools keep working.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// Highest lock file version this reader understands
pub const SUPPORTED_VERSION: u32 = 1;

/// Placeholder marking an intentionally empty asset folder
const EMPTY_FOLDER_MARKER: &str = "_._";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub package_folders: Vec<PathBuf>,
    /// Resolved packages in resolution order
    #[serde(default)]
    pub packages: Vec<ResolvedPackage>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkReference>,
    /// File this result was loaded from
    #[serde(skip)]
    pub source: PathBuf,
}

fn default_version() -> u32 {
    SUPPORTED_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    /// Package directory relative to a package folder
    #[serde(default)]
    pub path: String,
    /// Names of packages this package depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Set when this is a meta-package standing in for a whole framework
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub kind: AssetKind,
    /// Path relative to the package directory, `/`-separated
    pub path: String,
    /// Platform qualifier (e.g. `linux-x64`) for platform-specific assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Compile,
    Runtime,
    Native,
    Resource,
    Analyzer,
    Script,
    #[serde(other)]
    Unknown,
}

/// A framework (platform SDK) and the directory holding its reference assemblies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkReference {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub reference_directory: PathBuf,
}

impl FrameworkReference {
    /// Every reference assembly of the framework, sorted by path
    pub fn reference_assemblies(&self) -> Result<Vec<PathBuf>, ResolveError> {
        if !self.reference_directory.is_dir() {
            return Err(ResolveError::ResolutionResult {
                path: self.reference_directory.clone(),
                message: format!("reference directory of framework {} is missing", self.name),
            });
        }

        let pattern = self.reference_directory.join("*.dll");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
            ResolveError::ResolutionResult {
                path: self.reference_directory.clone(),
                message: e.to_string(),
            }
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        Ok(paths)
    }
}

impl ResolvedPackage {
    /// Assets of one kind, skipping empty-folder markers
    pub fn assets_of(&self, kind: AssetKind) -> impl Iterator<Item = &Asset> + '_ {
        self.assets.iter().filter(move |asset| {
            asset.kind == kind && !asset.path.ends_with(EMPTY_FOLDER_MARKER)
        })
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl Asset {
    /// First path segment (`ref`, `lib`, `runtimes`, ...)
    pub fn folder(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }
}

impl ResolutionResult {
    pub fn empty(target: &str) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            target: target.to_string(),
            package_folders: Vec::new(),
            packages: Vec::new(),
            frameworks: Vec::new(),
            source: PathBuf::new(),
        }
    }

    /// Read and validate a resolution result
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let invalid = |message: String| ResolveError::ResolutionResult {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read(path).map_err(|e| invalid(format!("cannot read: {}", e)))?;
        let mut result: ResolutionResult =
            serde_json::from_slice(&content).map_err(|e| invalid(format!("malformed: {}", e)))?;
        result.source = path.to_path_buf();

        if result.version == 0 || result.version > SUPPORTED_VERSION {
            return Err(invalid(format!(
                "unsupported version {} (expected {})",
                result.version, SUPPORTED_VERSION
            )));
        }
        if !result.packages.is_empty() && result.package_folders.is_empty() {
            return Err(invalid("packages listed without any package folder".to_string()));
        }

        Ok(result)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec_pretty(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    pub fn find_package(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.iter().find(|p| p.is_named(name))
    }

    pub fn find_framework(&self, name: &str) -> Option<&FrameworkReference> {
        self.frameworks
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Directory of a package: the first package folder that contains it
    pub fn package_dir(&self, package: &ResolvedPackage) -> PathBuf {
        let relative = join_relative(Path::new(""), &package.path);
        self.package_folders
            .iter()
            .map(|folder| folder.join(&relative))
            .find(|dir| dir.is_dir())
            .or_else(|| {
                self.package_folders
                    .first()
                    .map(|folder| folder.join(&relative))
            })
            .unwrap_or(relative)
    }

    /// Absolute path of an asset of `package`
    pub fn asset_path(&self, package: &ResolvedPackage, asset: &Asset) -> PathBuf {
        join_relative(&self.package_dir(package), &asset.path)
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_asset_kinds_and_fields_are_tolerated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resolution.lock.json");
        fs::write(
            &path,
            r#"{
  "version": 1,
  "target": "net8.0",
  "packageFolders": ["/packages"],
  "generator": "restore-tool 9.1",
  "packages": [
    {
      "name": "A",
      "version": "1.2.3",
      "path": "a/1.2.3",
      "sha512": "abc",
      "assets": [
        { "kind": "compile", "path": "ref/net8.0/A.dll" },
        { "kind": "contentFiles", "path": "content/readme.txt" },
        { "kind": "runtime", "path": "lib/net8.0/_._" }
      ]
    }
  ]
}"#,
        )
        .unwrap();

        let result = ResolutionResult::load(&path).unwrap();
        let package = &result.packages[0];
        assert_eq!(package.assets[1].kind, AssetKind::Unknown);
        assert_eq!(package.assets_of(AssetKind::Compile).count(), 1);
        assert_eq!(package.assets_of(AssetKind::Runtime).count(), 0);
        assert_eq!(
            result.asset_path(package, &package.assets[0]),
            PathBuf::from("/packages/a/1.2.3/ref/net8.0/A.dll")
        );
    }

    #[test]
    fn test_malformed_result_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resolution.lock.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ResolutionResult::load(&path).unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionResult { .. }));
        assert!(!err.is_restore_error());

        let missing = ResolutionResult::load(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ResolveError::ResolutionResult { .. }));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resolution.lock.json");
        fs::write(&path, r#"{ "version": 2, "packages": [] }"#).unwrap();

        let err = ResolutionResult::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported version 2"));
    }

    #[test]
    fn test_package_dir_probes_folders() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir_all(second.join("b/2.0.0")).unwrap();

        let mut result = ResolutionResult::empty("net8.0");
        result.package_folders = vec![first.clone(), second.clone()];
        let package = ResolvedPackage {
            name: "B".to_string(),
            version: "2.0.0".to_string(),
            path: "b/2.0.0".to_string(),
            dependencies: vec![],
            framework: None,
            assets: vec![],
        };

        assert_eq!(result.package_dir(&package), second.join("b").join("2.0.0"));

        let missing = ResolvedPackage {
            path: "c/1.0.0".to_string(),
            ..package
        };
        assert_eq!(result.package_dir(&missing), first.join("c").join("1.0.0"));
    }

    #[test]
    fn test_framework_reference_assemblies() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("packs/Web.Ref/8.0.0/ref/net8.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Web.Hosting.dll"), "").unwrap();
        fs::write(dir.join("Web.Http.dll"), "").unwrap();
        fs::write(dir.join("Web.Http.xml"), "").unwrap();

        let framework = FrameworkReference {
            name: "Web.App".to_string(),
            version: "8.0.0".to_string(),
            reference_directory: dir.clone(),
        };

        let assemblies = framework.reference_assemblies().unwrap();
        assert_eq!(
            assemblies,
            vec![dir.join("Web.Hosting.dll"), dir.join("Web.Http.dll")]
        );

        let missing = FrameworkReference {
            reference_directory: temp.path().join("nope"),
            ..framework
        };
        assert!(missing.reference_assemblies().is_err());
    }
}
