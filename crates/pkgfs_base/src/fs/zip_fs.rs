use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, ErrorKind, Result, ResultExt};

use super::file_info::{FileInfo, FileMode};
use super::file_path::FilePath;
use super::mem_file::MemFile;
use super::traits::{DirPage, File, System, Whence};

const BACKEND: &str = "zipfs";

/// End of central directory signature.
const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

/// The end of central directory record sits within this many bytes of the end:
/// 22 bytes of fixed fields plus a comment of at most 65535 bytes.
const EOCD_SEARCH_WINDOW: usize = 22 + u16::MAX as usize;

/// Upper bound on the buffer reserved up front when extracting an entry.
const MAX_PREALLOCATION: usize = 1 << 20;

/* 📖 # How is a zip appended to a binary found?

A zip archive is read from its end: the end of central directory record points
at the central directory, which points at every entry. Whatever comes before the
first entry (a compiled executable, for instance) is never looked at, so the
archive can trail arbitrary bytes:

[Leading bytes][Zip Local Files][Zip Central Directory][End of Central Directory Record]
*/

#[derive(Debug, Clone, Copy)]
struct Entry {
    // None for directories implied by entry names
    index: Option<usize>,
    size: u64,
    mode: FileMode,
}

/// Read-only backend over the entries of a zip archive.
///
/// Entries are matched by their normalized name. Directories implied by entry
/// names are synthesized so they can be opened and listed.
pub struct ZipSystem {
    label: PathBuf,
    modified: SystemTime,
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    entries: BTreeMap<FilePath, Entry>,
}

impl std::fmt::Debug for ZipSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipSystem")
            .field("label", &self.label)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Reports whether `data` ends with something that looks like a zip archive.
pub fn has_trailing_archive(data: &[u8]) -> bool {
    let tail = &data[data.len().saturating_sub(EOCD_SEARCH_WINDOW)..];
    tail.windows(EOCD_SIGNATURE.len())
        .rev()
        .any(|window| window == EOCD_SIGNATURE)
}

impl ZipSystem {
    /// Parses the archive at the end of `data`. Every entry reports `modified` as
    /// its modification time.
    pub fn new(data: Vec<u8>, modified: SystemTime) -> Result<Self> {
        Self::with_label(PathBuf::from("<memory>"), data, modified)
    }

    /// Reads `path` and parses the archive at its end.
    #[instrument]
    pub fn open_archive(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Box::new(Error::file(path, e)))?;
        let modified = std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        debug!(size = data.len(), "read archive file");
        Self::with_label(path.to_path_buf(), data, modified)
    }

    fn with_label(label: PathBuf, data: Vec<u8>, modified: SystemTime) -> Result<Self> {
        let archive_error = |e: ZipError| -> Box<Error> {
            ErrorKind::Archive {
                path: label.clone(),
                source: Arc::new(e),
            }
            .into()
        };
        let mut archive = ZipArchive::new(Cursor::new(data)).map_err(archive_error)?;

        let mut entries = BTreeMap::new();
        entries.insert(
            FilePath::root(),
            Entry {
                index: None,
                size: 0,
                mode: FileMode::dir(0o755),
            },
        );
        for index in 0..archive.len() {
            let raw = archive.by_index_raw(index).map_err(archive_error)?;
            let path = match FilePath::clean(raw.name()) {
                Ok(path) if !path.is_root() => path,
                _ => {
                    warn!(name = raw.name(), "skipping zip entry with unusable name");
                    continue;
                }
            };
            let is_dir = raw.is_dir();
            let perm = raw
                .unix_mode()
                .map(|mode| mode & 0o777)
                .unwrap_or(if is_dir { 0o755 } else { 0o644 });
            let entry = if is_dir {
                Entry {
                    index: None,
                    size: 0,
                    mode: FileMode::dir(perm),
                }
            } else {
                Entry {
                    index: Some(index),
                    size: raw.size(),
                    mode: FileMode::new(perm),
                }
            };
            debug!(name = raw.name(), size = entry.size, "indexed zip entry");
            let mut ancestor = path.parent();
            entries.insert(path, entry);
            while let Some(dir) = ancestor {
                ancestor = dir.parent();
                entries.entry(dir).or_insert(Entry {
                    index: None,
                    size: 0,
                    mode: FileMode::dir(0o755),
                });
            }
        }
        debug!(count = entries.len(), "indexed zip archive");
        Ok(Self {
            label,
            modified,
            archive: Mutex::new(archive),
            entries,
        })
    }

    /// Number of entries, synthesized directories and the root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn info(&self, path: &FilePath, entry: &Entry) -> FileInfo {
        FileInfo::new(path.file_name(), entry.size, entry.mode, self.modified)
    }

    fn extract(&self, path: &FilePath, index: usize) -> Result<Vec<u8>> {
        let archive_error = |e: ZipError| -> Box<Error> {
            ErrorKind::Archive {
                path: self.label.clone(),
                source: Arc::new(e),
            }
            .into()
        };
        let mut archive = self.archive.lock();
        let mut zip_file = archive.by_index(index).map_err(archive_error)?;
        let declared = usize::try_from(zip_file.size()).unwrap_or(usize::MAX);
        let mut data = Vec::with_capacity(declared.min(MAX_PREALLOCATION));
        zip_file
            .read_to_end(&mut data)
            .map_err(|e| Box::new(Error::file(&self.label, e)))
            .with_context(|| format!("extracting {}", path))?;
        Ok(data)
    }
}

impl System for ZipSystem {
    #[instrument(skip(self), fields(archive = %self.label.display()))]
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = FilePath::clean(name)?;
        let entry = self.entries.get(&path).ok_or_else(|| ErrorKind::NotFound {
            path: path.to_string(),
        })?;
        let file = match entry.index {
            Some(index) => {
                let data = self.extract(&path, index)?;
                debug!(size = data.len(), "extracted entry");
                MemFile::new(path.to_string(), entry.mode, self.modified, data)
            }
            None => {
                let children = self
                    .entries
                    .iter()
                    .filter(|(child, _)| child.parent().as_ref() == Some(&path))
                    .map(|(child, entry)| self.info(child, entry))
                    .collect();
                MemFile::new_dir(path.to_string(), entry.mode, self.modified, children)
            }
        };
        Ok(Box::new(ZipFile { inner: file }))
    }
}

/// Read-only handle on an extracted archive entry.
#[derive(Debug)]
pub struct ZipFile {
    inner: MemFile,
}

impl ZipFile {
    fn unsupported(&self, operation: &'static str) -> Box<Error> {
        if self.inner.is_closed() {
            return ErrorKind::AlreadyClosed.into();
        }
        ErrorKind::CapabilityNotSupported {
            backend: BACKEND,
            operation,
        }
        .into()
    }
}

impl File for ZipFile {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn chmod(&mut self, _mode: FileMode) -> Result<()> {
        Err(self.unsupported("chmod"))
    }

    fn chown(&mut self, _uid: u32, _gid: u32) -> Result<()> {
        Err(self.unsupported("chown"))
    }

    fn owner_uid(&self) -> Result<u32> {
        Err(self.unsupported("owner_uid"))
    }

    fn owner_gid(&self) -> Result<u32> {
        Err(self.unsupported("owner_gid"))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.inner.read_at(buf, offset)
    }

    fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>> {
        self.inner.readdir(n)
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

    fn truncate(&mut self, _size: u64) -> Result<()> {
        Err(self.unsupported("truncate"))
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(self.unsupported("write"))
    }

    fn write_at(&mut self, _buf: &[u8], _offset: u64) -> Result<usize> {
        Err(self.unsupported("write_at"))
    }

    fn write_str(&mut self, _s: &str) -> Result<usize> {
        Err(self.unsupported("write_str"))
    }
}
