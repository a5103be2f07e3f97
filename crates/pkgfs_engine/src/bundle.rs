use std::path::Path;

use pkgfs_base::fs::{SystemHandle, ZipSystem, has_trailing_archive};
use tracing::{debug, info, instrument, warn};

/* 📖 # Why is the attached bundle a value and not a global?

The bundle is detected once at startup and never changes afterwards. Passing it
into the provider constructors keeps that initialization explicit, and lets tests
hand in an in-memory bundle or none at all.
*/

/// Zip archive appended to the running executable, if any.
#[derive(Debug, Clone, Default)]
pub struct AttachedBundle {
    system: Option<SystemHandle>,
}

impl AttachedBundle {
    /// Opens the running executable as a trailing zip archive.
    ///
    /// Any failure is logged and yields an empty bundle, so callers fall back to
    /// the source tree.
    #[instrument]
    pub fn detect() -> Self {
        let exe_path = match std::env::current_exe() {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Failed to get current executable path");
                return Self::none();
            }
        };
        Self::from_file(&exe_path)
    }

    /// Opens `path` as a trailing zip archive, falling back to no bundle.
    #[instrument]
    pub fn from_file(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read bundle candidate");
                return Self::none();
            }
        };
        if !has_trailing_archive(&data) {
            debug!(path = %path.display(), "No attached bundle");
            return Self::none();
        }
        let modified = std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        match ZipSystem::new(data, modified) {
            Ok(system) => {
                info!(path = %path.display(), entries = system.len(), "Using attached bundle");
                Self::from_system(SystemHandle::new(system))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open attached bundle");
                Self::none()
            }
        }
    }

    /// No bundle; packages are served from the source tree.
    pub fn none() -> Self {
        Self { system: None }
    }

    /// Uses `system` as the bundle.
    pub fn from_system(system: SystemHandle) -> Self {
        Self {
            system: Some(system),
        }
    }

    pub fn system(&self) -> Option<&SystemHandle> {
        self.system.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.system.is_some()
    }
}
