/// Restore caching for fully pinned manifests
///
/// A pinned manifest always resolves to the same packages, so byte-equality of the
/// serialized manifest is a valid proxy for equality of the resolution result. Manifests
/// with any floating version are restored on every call and never cached.
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{info, warn};

use super::manifest::{ManifestFileInfo, ProjectManifest};
use super::restorer::Restorer;
use crate::error::ResolveError;
use crate::fsutil::write_atomic;
use crate::logging::{operations, status};

/// Decorator that skips the inner restorer when nothing changed
pub struct CachedRestorer {
    inner: Arc<dyn Restorer>,
}

impl CachedRestorer {
    pub fn new(inner: Arc<dyn Restorer>) -> Self {
        Self { inner }
    }

    /// Compare against the cache record; any read problem counts as a miss
    fn is_cached(&self, manifest: &ManifestFileInfo, bytes: &[u8]) -> bool {
        let record_path = manifest.cache_record_path();
        let cached = match fs::read(&record_path) {
            Ok(cached) => cached,
            Err(e) if e.kind() == ErrorKind::NotFound => return false,
            Err(e) => {
                warn!(
                    operation = operations::CACHE_READ,
                    status = status::ERROR,
                    record = %record_path.display(),
                    error = %e,
                    "failed to read restore cache record"
                );
                return false;
            }
        };

        cached == bytes && manifest.resolution_path().is_file()
    }

    /// Drop the record before the resolution result is rewritten; a record must never
    /// outlive the result it describes
    fn clear_record(&self, manifest: &ManifestFileInfo) {
        let record_path = manifest.cache_record_path();
        match fs::remove_file(&record_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                operation = operations::CACHE_WRITE,
                status = status::ERROR,
                record = %record_path.display(),
                error = %e,
                "failed to remove restore cache record"
            ),
        }
    }

    fn write_record(&self, manifest: &ManifestFileInfo, bytes: &[u8]) {
        let record_path = manifest.cache_record_path();
        if let Err(e) = write_atomic(&record_path, bytes) {
            warn!(
                operation = operations::CACHE_WRITE,
                status = status::ERROR,
                record = %record_path.display(),
                error = %e,
                "failed to write restore cache record, next run will restore again"
            );
        }
    }
}

impl Restorer for CachedRestorer {
    fn restore(&self, manifest: &ManifestFileInfo, sources: &[String]) -> Result<(), ResolveError> {
        let bytes = fs::read(&manifest.path).map_err(|e| ResolveError::io(&manifest.path, e))?;
        let project = ProjectManifest::from_bytes(&manifest.path, &bytes)?;

        if let Some(floating) = project.packages.iter().find(|p| !p.is_pinned()) {
            info!(
                operation = operations::RESTORE,
                status = status::BYPASS,
                manifest = %manifest.path.display(),
                package = %floating,
                "floating version, restore cache bypassed"
            );
            self.clear_record(manifest);
            return self.inner.restore(manifest, sources);
        }

        if self.is_cached(manifest, &bytes) {
            info!(
                operation = operations::RESTORE,
                status = status::HIT,
                manifest = %manifest.path.display(),
                "manifest unchanged, skipping restore"
            );
            return Ok(());
        }

        info!(
            operation = operations::RESTORE,
            status = status::MISS,
            manifest = %manifest.path.display(),
            "manifest changed or not cached"
        );
        self.clear_record(manifest);
        self.inner.restore(manifest, sources)?;
        self.write_record(manifest, &bytes);
        Ok(())
    }
}
