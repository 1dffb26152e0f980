//! Resolution results and the dependency lists derived from them
//!
//! The restore step produces a lock-style [`ResolutionResult`]. From it we derive
//! compile-time dependencies (reference assemblies, analyzers) and runtime dependencies
//! (implementation assemblies, platform-matching native assets).

pub mod compilation;
pub mod lockfile;
pub mod pipeline;
pub mod platform;
pub mod runtime;

pub use compilation::{
    compilation_dependencies, CompilationDependency, CompilationDependencyResolver,
};
pub use lockfile::{Asset, AssetKind, FrameworkReference, ResolutionResult, ResolvedPackage};
pub use pipeline::{RestorePipeline, RestoredProject};
pub use platform::RuntimePlatform;
pub use runtime::{
    runtime_dependencies, RuntimeAssembly, RuntimeDependency, RuntimeDependencyResolver,
};
