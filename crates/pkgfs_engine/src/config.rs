use pkgfs_base::fs::System;
use pkgfs_base::{ErrorKind, PkgfsResult, ResultExt};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Contents of `pkgfs.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directory holding the package trees when no bundle is attached.
    /// Relative to the directory of the configuration file.
    pub source_root: Option<String>,
    /// Packages made available as resources.
    #[serde(default)]
    pub package: Vec<PackageConfig>,
}

/// Selects the files of one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageConfig {
    /// Path of the package below the source root, or inside the bundle.
    pub import_path: String,
    /// Whether nested directories of the package are visible.
    #[serde(default)]
    pub recursive: bool,
    /// Only files matching this glob are visible.
    pub glob: Option<String>,
}

impl PackageConfig {
    pub fn new(import_path: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            ..Default::default()
        }
    }
}

/// Parses configuration text.
pub fn parse_config(text: &str) -> PkgfsResult<Config> {
    let config: Config = toml::from_str(text).map_err(|e| {
        Box::new(pkgfs_base::PkgfsError::new(ErrorKind::Config {
            message: e.to_string(),
        }))
    })?;
    Ok(config)
}

/// Reads and parses a configuration file through any file system.
#[instrument(skip(system))]
pub fn load_config(system: &dyn System, name: &str) -> PkgfsResult<Config> {
    let text = system
        .read_file_to_string(name)
        .with_context(|| format!("reading {}", name))?;
    let config = parse_config(&text).with_context(|| format!("parsing {}", name))?;
    debug!(packages = config.package.len(), "loaded configuration");
    Ok(config)
}
