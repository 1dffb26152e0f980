/// Recursive directive scanning across `#load`ed scripts
///
/// Each file is visited at most once (keyed by canonical path), so cyclic loads terminate.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::directives::{parse_directives, Directive, ReferenceKind};
use crate::error::{DirectiveDiagnostic, ResolveError};
use crate::package::PackageReference;

type Exclusion = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A plain file or assembly-name reference and the script that declared it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub reference: String,
    pub base_file: PathBuf,
}

/// Everything found while scanning a set of scripts
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Package directives in discovery order (duplicates included)
    pub packages: Vec<PackageReference>,
    /// Framework (SDK) references, de-duplicated case-insensitively
    pub frameworks: Vec<String>,
    /// Canonical paths of every `#load` target that was found
    pub loads: Vec<PathBuf>,
    pub references: Vec<FileReference>,
    /// Canonical paths of every scanned file, in visit order
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<DirectiveDiagnostic>,
}

impl ScanResult {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Fail with all collected diagnostics if any directive was rejected
    pub fn into_result(self) -> Result<Self, ResolveError> {
        if self.diagnostics.is_empty() {
            Ok(self)
        } else {
            Err(ResolveError::Directives(self.diagnostics))
        }
    }
}

/// Scans scripts and the scripts they load
#[derive(Clone, Default)]
pub struct DirectiveScanner {
    exclusion: Option<Exclusion>,
}

impl DirectiveScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip files whose file name matches `predicate`, before any directive is read
    pub fn with_exclusion<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.exclusion = Some(Arc::new(predicate));
        self
    }

    /// Exclude an explicit list of file names (compared case-insensitively)
    pub fn excluding<I, S>(self, file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = file_names
            .into_iter()
            .map(|name| name.into().to_lowercase())
            .collect();
        if names.is_empty() {
            return self;
        }
        self.with_exclusion(move |file_name| names.contains(&file_name.to_lowercase()))
    }

    /// Scan the given script files and everything they load
    pub fn scan(&self, script_files: &[PathBuf]) -> Result<ScanResult, ResolveError> {
        let mut visited = HashSet::new();
        let mut result = ScanResult::default();

        for script in script_files {
            let canonical = script
                .canonicalize()
                .map_err(|e| ResolveError::io(script, e))?;
            self.scan_recursive(&canonical, &mut visited, &mut result)?;
        }

        Ok(result)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match (&self.exclusion, path.file_name().and_then(|n| n.to_str())) {
            (Some(exclude), Some(name)) => exclude(name),
            _ => false,
        }
    }

    fn scan_recursive(
        &self,
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        result: &mut ScanResult,
    ) -> Result<(), ResolveError> {
        if !visited.insert(path.to_path_buf()) {
            return Ok(());
        }

        if self.is_excluded(path) {
            debug!(file = %path.display(), "excluded from directive scan");
            return Ok(());
        }

        let content = fs::read_to_string(path).map_err(|e| ResolveError::io(path, e))?;
        let (directives, diagnostics) = parse_directives(path, &content);
        result.files.push(path.to_path_buf());
        result.diagnostics.extend(diagnostics);

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        for parsed in directives {
            match parsed.directive {
                Directive::Reference(ReferenceKind::Package(package)) => {
                    result.packages.push(package);
                }
                Directive::Reference(ReferenceKind::Framework(name)) => {
                    if !result
                        .frameworks
                        .iter()
                        .any(|f| f.eq_ignore_ascii_case(&name))
                    {
                        result.frameworks.push(name);
                    }
                }
                Directive::Reference(ReferenceKind::File(reference)) => {
                    result.references.push(FileReference {
                        reference,
                        base_file: path.to_path_buf(),
                    });
                }
                Directive::Load(target) => {
                    let target_path = base_dir.join(&target);
                    match target_path.canonicalize() {
                        Ok(canonical) if canonical.is_file() => {
                            if !result.loads.contains(&canonical) {
                                result.loads.push(canonical.clone());
                            }
                            self.scan_recursive(&canonical, visited, result)?;
                        }
                        _ => result.diagnostics.push(DirectiveDiagnostic {
                            file: path.to_path_buf(),
                            line: parsed.line,
                            directive: parsed.text,
                            message: format!("Load target not found: {}", target_path.display()),
                        }),
                    }
                }
            }
        }

        Ok(())
    }
}
