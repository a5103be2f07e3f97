/* 📖 # Why have pkgfs_base as a core library?
pkgfs_base provides the error handling, tracing setup and the file system abstraction
used across all crates. Every backend lives here so the engine composes them without
depending on any one of them directly.
*/

pub mod error;
pub mod fs;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{Error as PkgfsError, ErrorKind, Result as PkgfsResult, ResultExt};
