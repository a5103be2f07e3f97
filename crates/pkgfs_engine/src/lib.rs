/* 📖 # What does pkgfs_engine add on top of pkgfs_base?

pkgfs_base knows how to open files from many backends. The engine decides which
backend serves a package: the zip bundle attached to the running executable when
there is one, otherwise the source tree on disk, always behind a limited view
shaped by the package configuration.
*/

pub mod bundle;
pub mod config;
pub mod provider;

pub use bundle::AttachedBundle;
pub use config::{Config, PackageConfig, load_config, parse_config};
pub use provider::{Resources, package_system, walk_files};
