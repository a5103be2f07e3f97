use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};

use super::file_info::{FileInfo, FileMode};
use super::file_path::FilePath;
use super::traits::{DirPage, File, System, SystemHandle, Whence};

/// Selects the part of a system that a [`LimitSystem`] exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitConfig {
    /// Directory of the wrapped system that becomes the root of the view.
    pub root: String,
    /// Whether nested directories are reachable.
    pub recursive: bool,
    /// Only files whose path below the wrapped root matches are visible.
    pub glob: Option<String>,
}

impl LimitConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }
}

#[derive(Debug)]
struct Policy {
    root: FilePath,
    recursive: bool,
    glob: Option<GlobMatcher>,
}

impl Policy {
    fn file_visible(&self, path: &FilePath) -> bool {
        self.glob
            .as_ref()
            .is_none_or(|glob| glob.is_match(path.as_str()))
    }

    fn entry_visible(&self, dir: &FilePath, entry: &FileInfo) -> bool {
        if entry.is_dir() {
            return self.recursive;
        }
        self.file_visible(&dir.child(entry.name()))
    }

    fn filter(&self, dir: &FilePath, entries: Vec<FileInfo>) -> Vec<FileInfo> {
        entries
            .into_iter()
            .filter(|entry| self.entry_visible(dir, entry))
            .collect()
    }
}

fn limited(path: &FilePath) -> Box<Error> {
    ErrorKind::LimitedOrNotFound {
        path: path.to_string(),
    }
    .into()
}

/* 📖 # Why does a limited view answer "limited or not found" instead of a distinct error?

A caller probing the view must not learn whether a hidden name exists in the
wrapped system. Both kinds classify as not-exist, the separate kind is only there
for diagnostics.
*/

/// View on another system, narrowed to a root directory, optionally to a single
/// level of nesting and to files matching a glob.
///
/// # Examples
///
/// ```
/// use pkgfs_base::fs::{FileMode, LimitConfig, LimitSystem, MemFile, MemSystem, System};
/// use std::time::SystemTime;
///
/// let file = |name: &str| MemFile::new(name, FileMode::new(0o644), SystemTime::now(), vec![]);
/// let system = MemSystem::build([("d/file", file("file")), ("d/sub/file", file("file"))]);
/// let view = LimitSystem::new(LimitConfig::new("d"), system).unwrap();
/// assert!(view.open("file").is_ok());
/// let err = view.open("sub/file").unwrap_err();
/// assert!(view.is_not_exist(&err));
/// ```
#[derive(Debug, Clone)]
pub struct LimitSystem {
    policy: Arc<Policy>,
    inner: SystemHandle,
}

impl LimitSystem {
    /// Wraps `inner`, failing with `InvalidGlob` when the glob does not compile.
    #[instrument(skip(inner))]
    pub fn new(config: LimitConfig, inner: SystemHandle) -> Result<Self> {
        let root = FilePath::clean(&config.root)?;
        let glob = match &config.glob {
            Some(pattern) => {
                let compiled = GlobBuilder::new(pattern).build().map_err(|e| {
                    debug!(pattern = %pattern, error = %e, "failed to compile glob pattern");
                    ErrorKind::InvalidGlob {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    }
                })?;
                Some(compiled.compile_matcher())
            }
            None => None,
        };
        Ok(Self {
            policy: Arc::new(Policy {
                root,
                recursive: config.recursive,
                glob,
            }),
            inner,
        })
    }

    /// Root of the view inside the wrapped system.
    pub fn root(&self) -> &FilePath {
        &self.policy.root
    }
}

impl System for LimitSystem {
    #[instrument(skip(self), fields(root = %self.policy.root))]
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = FilePath::clean(name)?;
        if !self.policy.recursive && path.segment_count() > 1 {
            debug!("Nested path {} outside non-recursive view", path);
            return Err(limited(&path));
        }

        let joined = self.policy.root.join(&path);
        let mut file = self.inner.open(&joined.to_string())?;
        let info = match file.stat() {
            Ok(info) => info,
            Err(e) => {
                let _ = file.close();
                return Err(e);
            }
        };

        if info.is_dir() {
            if !self.policy.recursive && !path.is_root() {
                debug!("Directory {} hidden by non-recursive view", path);
                let _ = file.close();
                return Err(limited(&path));
            }
            return Ok(Box::new(LimitedDir::new(file, joined, self.policy.clone())));
        }

        if !self.policy.file_visible(&joined) {
            debug!("File {} does not match glob", joined);
            let _ = file.close();
            return Err(limited(&path));
        }
        Ok(file)
    }

    fn is_not_exist(&self, err: &Error) -> bool {
        matches!(
            err.kind(),
            ErrorKind::NotFound { .. } | ErrorKind::LimitedOrNotFound { .. }
        ) || self.inner.is_not_exist(err)
    }
}

/// Directory handle whose listings only show what the view admits.
#[derive(Debug)]
struct LimitedDir {
    inner: Box<dyn File>,
    path: FilePath,
    policy: Arc<Policy>,
    // Error hit while a page was half filled, reported on the next listing call.
    deferred: Option<Box<Error>>,
}

impl LimitedDir {
    fn new(inner: Box<dyn File>, path: FilePath, policy: Arc<Policy>) -> Self {
        Self {
            inner,
            path,
            policy,
            deferred: None,
        }
    }
}

impl File for LimitedDir {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn chmod(&mut self, mode: FileMode) -> Result<()> {
        self.inner.chmod(mode)
    }

    fn chown(&mut self, uid: u32, gid: u32) -> Result<()> {
        self.inner.chown(uid, gid)
    }

    fn owner_uid(&self) -> Result<u32> {
        self.inner.owner_uid()
    }

    fn owner_gid(&self) -> Result<u32> {
        self.inner.owner_gid()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.inner.read_at(buf, offset)
    }

    // Keeps pulling from the wrapped directory until `n` visible entries are
    // collected, the listing ends, or the wrapped handle fails.
    fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if n <= 0 {
            let raw = self.inner.readdir(n)?;
            let end_of_stream = raw.end_of_stream;
            return Ok(DirPage::new(self.policy.filter(&self.path, raw.entries), end_of_stream));
        }

        let wanted = n as usize;
        let mut entries = Vec::with_capacity(wanted);
        while entries.len() < wanted {
            let pending = (wanted - entries.len()) as isize;
            let raw = match self.inner.readdir(pending) {
                Ok(raw) => raw,
                Err(err) if entries.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    return Ok(DirPage::new(entries, false));
                }
            };
            let exhausted = raw.end_of_stream || raw.entries.is_empty();
            entries.extend(self.policy.filter(&self.path, raw.entries));
            if exhausted {
                return Ok(DirPage::new(entries, true));
            }
        }
        Ok(DirPage::new(entries, false))
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.inner.seek(offset, whence)
    }

    fn stat(&self) -> Result<FileInfo> {
        self.inner.stat()
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.inner.truncate(size)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.inner.write_at(buf, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{EmptySystem, MemFile, MemSystem};
    use std::time::SystemTime;

    fn file(name: &str) -> MemFile {
        MemFile::new(name, FileMode::new(0o644), SystemTime::now(), name.as_bytes().to_vec())
    }

    fn backing() -> SystemHandle {
        MemSystem::build(
            ["d/a.txt", "d/b.md", "d/c.txt", "d/e.md", "d/f.txt", "d/sub/g.txt", "d/sub/h.md", "top.txt"]
                .map(|path| (path, file(path))),
        )
    }

    fn view(config: LimitConfig) -> LimitSystem {
        LimitSystem::new(config, backing()).unwrap()
    }

    fn pages(dir: &mut dyn File, n: isize) -> Vec<Vec<String>> {
        let mut pages = vec![];
        loop {
            let page = dir.readdirnames(n).unwrap();
            pages.push(page.entries);
            if page.end_of_stream {
                return pages;
            }
        }
    }

    #[test]
    fn test_non_recursive_view_opens_direct_children() {
        let view = view(LimitConfig::new("d"));
        assert_eq!(view.read_file("a.txt").unwrap(), b"d/a.txt");
        assert_eq!(view.read_file("/b.md").unwrap(), b"d/b.md");
    }

    #[test]
    fn test_non_recursive_view_hides_nested_paths() {
        let view = view(LimitConfig::new("d"));
        for name in ["sub/g.txt", "sub", "sub/missing"] {
            let err = view.open(name).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::LimitedOrNotFound { .. }), "{}: {}", name, err);
            assert!(view.is_not_exist(&err));
        }
    }

    #[test]
    fn test_non_recursive_listing_drops_directories() {
        let view = view(LimitConfig::new("d"));
        let mut root = view.open("/").unwrap();
        assert_eq!(
            root.readdirnames(0).unwrap().entries,
            ["a.txt", "b.md", "c.txt", "e.md", "f.txt"]
        );
    }

    #[test]
    fn test_view_cannot_escape_root() {
        let view = view(LimitConfig::new("d").recursive(true));
        let err = view.open("../top.txt").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { path } if path == "/d/top.txt"));
        assert!(view.is_not_exist(&err));
    }

    #[test]
    fn test_recursive_view_opens_nested_files() {
        let view = view(LimitConfig::new("d").recursive(true));
        assert_eq!(view.read_file("sub/h.md").unwrap(), b"d/sub/h.md");
        let mut sub = view.open("sub").unwrap();
        assert_eq!(sub.readdirnames(0).unwrap().entries, ["g.txt", "h.md"]);
    }

    #[test]
    fn test_glob_rejects_non_matching_files() {
        let view = view(LimitConfig::new("d").recursive(true).glob("*.txt"));
        assert_eq!(view.read_file("a.txt").unwrap(), b"d/a.txt");
        assert_eq!(view.read_file("sub/g.txt").unwrap(), b"d/sub/g.txt");
        let err = view.open("b.md").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LimitedOrNotFound { path } if path == "/b.md"));
        assert!(view.is_not_exist(&err));
    }

    #[test]
    fn test_glob_matches_path_below_wrapped_root() {
        let view = view(LimitConfig::new("d").recursive(true).glob("d/sub/*"));
        assert!(view.open("sub/h.md").is_ok());
        assert!(view.open("a.txt").is_err());
    }

    #[test]
    fn test_glob_listing_is_independent_of_page_size() {
        let view = view(LimitConfig::new("d").recursive(true).glob("*.txt"));
        let expected = ["a.txt", "c.txt", "f.txt", "sub"];
        for n in [1, 2, 3, 4, 10] {
            let mut root = view.open("/").unwrap();
            let listed: Vec<String> = pages(root.as_mut(), n).into_iter().flatten().collect();
            assert_eq!(listed, expected, "page size {}", n);
        }
        let mut root = view.open("/").unwrap();
        assert_eq!(root.readdirnames(0).unwrap().entries, expected);
    }

    #[test]
    fn test_glob_listing_fills_pages() {
        let view = view(LimitConfig::new("d").recursive(true).glob("*.txt"));
        let mut root = view.open("/").unwrap();
        let pages = pages(root.as_mut(), 2);
        assert_eq!(pages, [vec!["a.txt", "c.txt"], vec!["f.txt", "sub"]]);
    }

    #[test]
    fn test_glob_listing_in_nested_directory() {
        let view = view(LimitConfig::new("d").recursive(true).glob("*.md"));
        let mut sub = view.open("sub").unwrap();
        let page = sub.readdir(5).unwrap();
        let names: Vec<&str> = page.entries.iter().map(|info| info.name()).collect();
        assert_eq!(names, ["h.md"]);
        assert!(page.end_of_stream);
    }

    #[test]
    fn test_invalid_glob() {
        let err = LimitSystem::new(LimitConfig::new("d").glob("a[b"), backing()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidGlob { pattern, .. } if pattern == "a[b"));
    }

    #[test]
    fn test_missing_root() {
        let view = view(LimitConfig::new("nowhere"));
        let err = view.open("/").unwrap_err();
        assert!(view.is_not_exist(&err));
    }

    #[test]
    fn test_is_not_exist_delegates_to_wrapped_system() {
        let fixed: Box<Error> = Box::new(Error::message("no bundle"));
        let inner = SystemHandle::new(EmptySystem::with_error(fixed.clone()));
        let view = LimitSystem::new(LimitConfig::new("d"), inner).unwrap();
        let err = view.open("x").unwrap_err();
        assert_eq!(err, fixed);
        assert!(view.is_not_exist(&err));
        assert!(!view.is_not_exist(&Error::message("other")));
    }

    /// Directory that fails once its entries run out without reporting the end.
    #[derive(Debug)]
    struct FailingDir {
        entries: Vec<FileInfo>,
    }

    fn unsupported() -> Box<Error> {
        ErrorKind::CapabilityNotSupported {
            backend: "test",
            operation: "io",
        }
        .into()
    }

    impl File for FailingDir {
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn chmod(&mut self, _mode: FileMode) -> Result<()> {
            Err(unsupported())
        }
        fn chown(&mut self, _uid: u32, _gid: u32) -> Result<()> {
            Err(unsupported())
        }
        fn owner_uid(&self) -> Result<u32> {
            Err(unsupported())
        }
        fn owner_gid(&self) -> Result<u32> {
            Err(unsupported())
        }
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(unsupported())
        }
        fn read_at(&mut self, _buf: &mut [u8], _offset: u64) -> Result<usize> {
            Err(unsupported())
        }
        fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>> {
            if self.entries.is_empty() {
                return Err(Box::new(Error::message("listing broke")));
            }
            let take = (n.max(1) as usize).min(self.entries.len());
            Ok(DirPage::new(self.entries.drain(..take).collect(), false))
        }
        fn seek(&mut self, _offset: i64, _whence: Whence) -> Result<u64> {
            Err(unsupported())
        }
        fn stat(&self) -> Result<FileInfo> {
            Err(unsupported())
        }
        fn sync(&mut self) -> Result<()> {
            Ok(())
        }
        fn truncate(&mut self, _size: u64) -> Result<()> {
            Err(unsupported())
        }
        fn write(&mut self, _buf: &[u8]) -> Result<usize> {
            Err(unsupported())
        }
        fn write_at(&mut self, _buf: &[u8], _offset: u64) -> Result<usize> {
            Err(unsupported())
        }
    }

    #[test]
    fn test_error_after_partial_page_keeps_entries() {
        let entries = ["a.txt", "b.md"]
            .map(|name| FileInfo::new(name, 0, FileMode::new(0o644), SystemTime::UNIX_EPOCH))
            .to_vec();
        let policy = Arc::new(Policy {
            root: FilePath::root(),
            recursive: true,
            glob: Some(GlobBuilder::new("*.txt").build().unwrap().compile_matcher()),
        });
        let mut dir = LimitedDir::new(Box::new(FailingDir { entries }), FilePath::root(), policy);

        let page = dir.readdirnames(5).unwrap();
        assert_eq!(page.entries, ["a.txt"]);
        assert!(!page.end_of_stream);
        let err = dir.readdirnames(5).unwrap_err();
        expect_test::expect!["listing broke"].assert_eq(&err.to_string());
    }
}
