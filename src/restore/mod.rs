//! Manifest construction and restore
//!
//! A [`ProjectManifest`] is persisted by the [`ManifestStore`] and handed to a [`Restorer`],
//! which writes the resolution result next to it. [`CachedRestorer`] wraps any restorer and
//! skips work for unchanged, fully pinned manifests.

pub mod cached;
pub mod manifest;
pub mod restorer;

pub use cached::CachedRestorer;
pub use manifest::{
    ManifestBuilder, ManifestFileInfo, ManifestStore, ProjectManifest, SCRIPT_VARIANT,
};
pub use restorer::{CommandRestorer, Restorer};
