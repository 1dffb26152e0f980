// Library interface for scriptpack
// Hosts embed the resolvers directly; the binary is a thin CLI over the same modules

pub mod config;
pub mod config_discovery;
pub mod error;
pub mod fsutil;
pub mod logging;
pub mod package;
pub mod reference;
pub mod resolution;
pub mod restore;
pub mod script;
pub mod xdg;

// Re-export commonly used types
pub use error::{DirectiveDiagnostic, ResolveError};
pub use package::PackageReference;
pub use reference::{AssemblyReference, FileReferenceResolver, ReferenceDirectiveResolver};
pub use resolution::{
    CompilationDependency, CompilationDependencyResolver, RestorePipeline, RuntimeDependency,
    RuntimeDependencyResolver, RuntimePlatform,
};
pub use restore::{CachedRestorer, CommandRestorer, ManifestBuilder, ManifestStore, Restorer};
pub use script::{DirectiveScanner, ScanResult};
