use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A problem found while scanning a script's directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDiagnostic {
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub directive: String,
    pub message: String,
}

impl fmt::Display for DirectiveDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} ({})",
            self.file.display(),
            self.line,
            self.message,
            self.directive
        )
    }
}

/// Errors produced while turning script directives into resolved dependencies
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{} directive error(s):\n{}", .0.len(), format_diagnostics(.0))]
    Directives(Vec<DirectiveDiagnostic>),

    #[error("Restore failed for {}:\n{diagnostics}", .manifest.display())]
    RestoreFailed {
        manifest: PathBuf,
        diagnostics: String,
    },

    #[error("Failed to launch restore tool '{command}': {message}")]
    RestoreTool { command: String, message: String },

    #[error("Unusable resolution result {}: {message}", .path.display())]
    ResolutionResult { path: PathBuf, message: String },

    #[error("Invalid manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("Cannot resolve reference '{reference}' from {}: {message}", .base.display())]
    Reference {
        reference: String,
        base: PathBuf,
        message: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolveError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the external restore step (as opposed to internal invariants)
    pub fn is_restore_error(&self) -> bool {
        matches!(
            self,
            ResolveError::RestoreFailed { .. } | ResolveError::RestoreTool { .. }
        )
    }
}

fn format_diagnostics(diagnostics: &[DirectiveDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}
