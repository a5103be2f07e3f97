use relative_path::{RelativePath, RelativePathBuf};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/* 📖 # Why use RelativePathBuf for FilePath?

FilePath stores the cleaned path relative to the namespace root. Every backend
keys its entries by this form, so "d/foo", "/d/foo" and "d/./x/../foo" all name
the same entry. `..` at the root is dropped, a cleaned path can never point
above the root it is later joined onto.
*/

/// Normalized, validated path inside a file system namespace.
///
/// Displays in the rooted form (`/src/main.rs`); [`FilePath::as_str`] gives the
/// root-relative form (`src/main.rs`, empty for the root itself).
///
/// # Examples
///
/// ```
/// use pkgfs_base::fs::FilePath;
///
/// let path = FilePath::clean("src/./lib/../main.rs").unwrap();
/// assert_eq!(path.as_str(), "src/main.rs");
/// assert_eq!(path.to_string(), "/src/main.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// The namespace root.
    pub fn root() -> Self {
        Self(RelativePathBuf::new())
    }

    /// Canonicalize a caller-supplied name.
    ///
    /// Roots the name at `/`, collapses `.`, `..` and repeated separators. Fails with
    /// `InvalidPath` on a NUL byte, or on a literal host separator when the host
    /// separator is not `/`. Cleaning an already clean path is a no-op.
    pub fn clean(name: &str) -> Result<Self> {
        if name.contains('\0') || (MAIN_SEPARATOR != '/' && name.contains(MAIN_SEPARATOR)) {
            return Err(ErrorKind::InvalidPath {
                path: name.to_string(),
            }
            .into());
        }
        let mut segments: Vec<&str> = Vec::new();
        for segment in name.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
        Ok(Self(RelativePathBuf::from(segments.join("/"))))
    }

    /// Returns the underlying RelativePath as a reference.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Root-relative form, empty for the root.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    /// Number of path segments; zero for the root.
    pub fn segment_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.as_str().split('/').count()
        }
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<FilePath> {
        if self.is_root() {
            return None;
        }
        match self.0.as_str().rfind('/') {
            Some(idx) => Some(Self(RelativePathBuf::from(&self.0.as_str()[..idx]))),
            None => Some(Self::root()),
        }
    }

    /// Last segment, empty for the root.
    pub fn file_name(&self) -> &str {
        self.0.file_name().unwrap_or("")
    }

    /// Appends another clean path.
    pub fn join(&self, other: &FilePath) -> FilePath {
        if self.is_root() {
            return other.clone();
        }
        if other.is_root() {
            return self.clone();
        }
        Self(self.0.join(&other.0))
    }

    /// Appends a single base name as reported by a directory listing.
    pub fn child(&self, name: &str) -> FilePath {
        if self.is_root() {
            Self(RelativePathBuf::from(name))
        } else {
            Self(self.0.join(name))
        }
    }

    /// Rooted form using the host separator.
    pub fn to_native_string(&self) -> String {
        let rooted = self.to_string();
        if MAIN_SEPARATOR == '/' {
            rooted
        } else {
            rooted.replace('/', &MAIN_SEPARATOR.to_string())
        }
    }

    /// Resolves the path below a host directory.
    pub fn to_path(&self, base: &Path) -> PathBuf {
        self.0.to_path(base)
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}
