/// Restore step: turns a persisted manifest into a resolution result
///
/// The actual package resolution is delegated to an external tool. Restore always performs
/// a full resolution; skipping work is the job of [`super::CachedRestorer`].
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info};

use super::manifest::{ManifestFileInfo, ProjectManifest};
use crate::error::ResolveError;
use crate::fsutil::write_atomic;
use crate::logging::{operations, status};
use crate::resolution::ResolutionResult;

/// Produces `manifest.resolution_path()` from the manifest at `manifest.path`
pub trait Restorer: Send + Sync {
    /// Restore the manifest, using `sources` instead of ambient registry configuration
    /// when non-empty
    fn restore(&self, manifest: &ManifestFileInfo, sources: &[String]) -> Result<(), ResolveError>;
}

/// Runs an external restore tool
///
/// Invocation:
/// `<command> <args...> <manifest> --output <resolution> [--configfile <path>] [--source <url>]...`
#[derive(Debug, Clone)]
pub struct CommandRestorer {
    command: String,
    args: Vec<String>,
}

impl CommandRestorer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    fn resolve_command(&self) -> PathBuf {
        // Fall back to the configured name if it is not on PATH
        which::which(&self.command).unwrap_or_else(|e| {
            debug!(command = %self.command, error = %e, "restore tool not found in PATH");
            PathBuf::from(&self.command)
        })
    }

    fn build_command(&self, manifest: &ManifestFileInfo, sources: &[String]) -> Command {
        let mut cmd = Command::new(self.resolve_command());
        cmd.args(&self.args)
            .arg(&manifest.path)
            .arg("--output")
            .arg(manifest.resolution_path());

        if let Some(config) = &manifest.registry_config {
            cmd.arg("--configfile").arg(config);
        }
        for source in sources {
            cmd.arg("--source").arg(source);
        }

        cmd.current_dir(manifest.directory())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Restorer for CommandRestorer {
    fn restore(&self, manifest: &ManifestFileInfo, sources: &[String]) -> Result<(), ResolveError> {
        let project = ProjectManifest::load(&manifest.path)?;
        let resolution_path = manifest.resolution_path();

        if project.is_empty() {
            // Nothing to resolve, but consumers still expect a result file
            let empty = ResolutionResult::empty(&project.target);
            write_atomic(&resolution_path, &empty.to_bytes())
                .map_err(|e| ResolveError::io(&resolution_path, e))?;
            info!(
                operation = operations::RESTORE,
                status = status::EMPTY,
                manifest = %manifest.path.display(),
                "no packages to restore"
            );
            return Ok(());
        }

        let start = Instant::now();
        let mut cmd = self.build_command(manifest, sources);
        debug!(command = ?cmd, "running restore tool");

        let output = cmd.output().map_err(|e| ResolveError::RestoreTool {
            command: self.command.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ResolveError::RestoreFailed {
                manifest: manifest.path.clone(),
                diagnostics: diagnostics.trim().to_string(),
            });
        }

        if !resolution_path.is_file() {
            return Err(ResolveError::ResolutionResult {
                path: resolution_path,
                message: "restore reported success but wrote no resolution result".to_string(),
            });
        }

        info!(
            operation = operations::RESTORE,
            status = status::SUCCESS,
            manifest = %manifest.path.display(),
            packages = project.packages.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "restore completed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageReference;
    use crate::restore::manifest::{ManifestBuilder, ManifestStore, SCRIPT_VARIANT};
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(temp: &TempDir, packages: &[(&str, &str)]) -> ManifestFileInfo {
        let builder = packages.iter().fold(
            ManifestBuilder::new(temp.path(), "net8.0"),
            |builder, (name, version)| builder.package(PackageReference::new(*name, *version)),
        );
        ManifestStore::new(temp.path().join("cache"))
            .write(&builder.build(), SCRIPT_VARIANT)
            .unwrap()
    }

    #[test]
    fn test_empty_manifest_writes_empty_result() {
        let temp = TempDir::new().unwrap();
        let info = write_manifest(&temp, &[]);

        CommandRestorer::new("definitely-not-a-restore-tool", vec![])
            .restore(&info, &[])
            .unwrap();

        let result = ResolutionResult::load(&info.resolution_path()).unwrap();
        assert!(result.packages.is_empty());
        assert_eq!(result.target, "net8.0");
    }

    #[test]
    fn test_missing_tool_is_a_restore_error() {
        let temp = TempDir::new().unwrap();
        let info = write_manifest(&temp, &[("A", "1.0.0")]);

        let err = CommandRestorer::new("definitely-not-a-restore-tool", vec![])
            .restore(&info, &[])
            .unwrap_err();
        assert!(err.is_restore_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_failure_surfaces_diagnostics() {
        let temp = TempDir::new().unwrap();
        let info = write_manifest(&temp, &[("Nope", "1.0.0")]);

        let err = CommandRestorer::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo 'error: Unable to find package Nope' >&2; exit 1".to_string(),
                "restore".to_string(),
            ],
        )
        .restore(&info, &[])
        .unwrap_err();

        match err {
            ResolveError::RestoreFailed { diagnostics, .. } => {
                assert!(diagnostics.contains("Unable to find package Nope"))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_receives_manifest_output_and_sources() {
        let temp = TempDir::new().unwrap();
        let info = write_manifest(&temp, &[("A", "1.0.0")]);
        let args_file = temp.path().join("args.txt");

        // $0 is "restore"; positional args follow
        let script = format!(
            r#"echo "$@" > '{}'; out=""; while [ $# -gt 0 ]; do if [ "$1" = "--output" ]; then out="$2"; fi; shift; done; echo '{{"version":1,"target":"net8.0","packages":[]}}' > "$out""#,
            args_file.display()
        );
        CommandRestorer::new("sh", vec!["-c".to_string(), script, "restore".to_string()])
            .restore(&info, &["https://packages.example.com/v3".to_string()])
            .unwrap();

        let args = fs::read_to_string(&args_file).unwrap();
        assert!(args.contains(&info.path.display().to_string()));
        assert!(args.contains("--output"));
        assert!(args.contains("--source https://packages.example.com/v3"));
        assert!(info.resolution_path().is_file());
    }
}
