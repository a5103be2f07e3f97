use std::collections::BTreeMap;
use std::path::Path;

use pkgfs_base::fs::{
    EmptySystem, FilePath, LimitConfig, LimitSystem, RealSystem, System, SystemHandle,
};
use pkgfs_base::PkgfsResult;
use tracing::{debug, instrument, warn};

use crate::bundle::AttachedBundle;
use crate::config::{Config, PackageConfig};

fn directory_exists(system: &dyn System, name: &str) -> bool {
    match system.open(name) {
        Ok(mut file) => {
            let is_dir = file.stat().is_ok_and(|info| info.is_dir());
            let _ = file.close();
            is_dir
        }
        Err(_) => false,
    }
}

/// File system exposing one package.
///
/// With an attached bundle the package is looked up inside it. Without one it is
/// read from `source_root`, and a package directory that does not exist yields
/// an empty system. A view that cannot be constructed (an invalid glob, say)
/// yields a system that reports the construction error on every `open`.
#[instrument(skip(bundle), fields(bundled = bundle.is_attached()))]
pub fn package_system(
    package: &PackageConfig,
    bundle: &AttachedBundle,
    source_root: &Path,
) -> SystemHandle {
    let inner = match bundle.system() {
        Some(system) => system.clone(),
        None => {
            let real = RealSystem::new(source_root);
            if directory_exists(&real, &package.import_path) {
                SystemHandle::new(real)
            } else {
                debug!("Package directory not found below source root");
                SystemHandle::new(EmptySystem::new())
            }
        }
    };
    let config = LimitConfig {
        root: package.import_path.clone(),
        recursive: package.recursive,
        glob: package.glob.clone(),
    };
    match LimitSystem::new(config, inner) {
        Ok(view) => SystemHandle::new(view),
        Err(err) => {
            warn!(error = %err, "Failed to construct package view");
            SystemHandle::new(EmptySystem::with_error(err))
        }
    }
}

/// Paths of every file visible in `system`, depth first in listing order.
pub fn walk_files(system: &dyn System) -> PkgfsResult<Vec<FilePath>> {
    let mut files = Vec::new();
    let mut pending = vec![FilePath::root()];
    while let Some(dir) = pending.pop() {
        let mut handle = system.open(&dir.to_string())?;
        let page = handle.readdir(0)?;
        handle.close()?;
        let mut subdirs = Vec::new();
        for entry in page.entries {
            let path = dir.child(entry.name());
            if entry.is_dir() {
                subdirs.push(path);
            } else {
                files.push(path);
            }
        }
        pending.extend(subdirs.into_iter().rev());
    }
    files.sort();
    Ok(files)
}

/// The configured packages, keyed by import path.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    packages: BTreeMap<String, SystemHandle>,
}

impl Resources {
    /// Builds one system per configured package. `base_dir` is the directory the
    /// configuration's `source_root` is relative to.
    #[instrument(skip(config, bundle), fields(packages = config.package.len()))]
    pub fn from_config(config: &Config, bundle: &AttachedBundle, base_dir: &Path) -> Self {
        let source_root = match &config.source_root {
            Some(root) => base_dir.join(root),
            None => base_dir.to_path_buf(),
        };
        let packages = config
            .package
            .iter()
            .map(|package| {
                (
                    package.import_path.clone(),
                    package_system(package, bundle, &source_root),
                )
            })
            .collect();
        Self { packages }
    }

    pub fn get(&self, import_path: &str) -> Option<&SystemHandle> {
        self.packages.get(import_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SystemHandle)> {
        self.packages
            .iter()
            .map(|(import_path, system)| (import_path.as_str(), system))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
