use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};

use super::file_info::{FileInfo, FileMode};
use super::file_path::FilePath;
use super::traits::{DirPage, File, System, Whence, paginate};

#[cfg(not(unix))]
const BACKEND: &str = "realfs";

/* 📖 # Why is RealSystem rooted at a base directory?

Names handed to `open` are cleaned first, so `..` can never climb above the
namespace root. Resolving the cleaned name below a base directory keeps every
lookup inside that directory, the same way the in-memory backend keys its arena.
*/

/// Backend over the host file system below a base directory.
///
/// Files are opened read-only; the mutating methods pass the host's refusal
/// through. Directories list their entries sorted by name.
#[derive(Debug, Clone)]
pub struct RealSystem {
    base_dir: PathBuf,
}

impl RealSystem {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl System for RealSystem {
    #[instrument(skip(self), fields(base_dir = %self.base_dir.display()))]
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = FilePath::clean(name)?;
        let resolved = path.to_path(&self.base_dir);
        debug!(resolved = %resolved.display(), "opening");
        let metadata = fs::metadata(&resolved).map_err(|e| {
            debug!(error = %e, "failed to stat");
            Box::new(Error::file(&resolved, e))
        })?;

        let handle = if metadata.is_dir() {
            Handle::Dir {
                listing: None,
                cursor: 0,
            }
        } else {
            let file = fs::File::open(&resolved).map_err(|e| {
                debug!(error = %e, "failed to open file");
                Box::new(Error::file(&resolved, e))
            })?;
            Handle::File(file)
        };
        Ok(Box::new(RealFile {
            name: name.to_string(),
            path: resolved,
            handle: Some(handle),
        }))
    }
}

#[derive(Debug)]
enum Handle {
    File(fs::File),
    Dir {
        listing: Option<Vec<FileInfo>>,
        cursor: usize,
    },
}

/// Open file or directory of a [`RealSystem`].
#[derive(Debug)]
pub struct RealFile {
    name: String,
    path: PathBuf,
    // None once closed
    handle: Option<Handle>,
}

fn info_from_metadata(name: impl Into<String>, metadata: fs::Metadata) -> FileInfo {
    let perm = permission_bits(&metadata);
    let mode = if metadata.is_dir() {
        FileMode::dir(perm)
    } else {
        FileMode::new(perm)
    };
    let size = if metadata.is_dir() { 0 } else { metadata.len() };
    let modified = metadata.modified().unwrap_or(std::time::UNIX_EPOCH);
    FileInfo::new(name, size, mode, modified).with_sys(Arc::new(metadata))
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(not(unix))]
fn not_implemented(operation: &'static str) -> Box<Error> {
    ErrorKind::NotImplemented {
        backend: BACKEND,
        operation,
    }
    .into()
}

impl RealFile {
    /// Host path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> Box<Error> {
        Box::new(Error::file(&self.path, e))
    }

    fn handle(&self) -> Result<&Handle> {
        self.handle
            .as_ref()
            .ok_or_else(|| ErrorKind::AlreadyClosed.into())
    }

    fn file(&mut self) -> Result<&mut fs::File> {
        match self.handle.as_mut() {
            None => Err(ErrorKind::AlreadyClosed.into()),
            Some(Handle::File(file)) => Ok(file),
            Some(Handle::Dir { .. }) => Err(ErrorKind::IsADirectory {
                path: self.name.clone(),
            }
            .into()),
        }
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        let result = match self.handle()? {
            Handle::File(file) => file.metadata(),
            Handle::Dir { .. } => fs::metadata(&self.path),
        };
        result.map_err(|e| self.io_error(e))
    }

    fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }

    fn load_listing(path: &Path) -> std::io::Result<Vec<FileInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(info_from_metadata(name, entry.metadata()?));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }
}

impl File for RealFile {
    fn close(&mut self) -> Result<()> {
        self.handle = None;
        Ok(())
    }

    fn chmod(&mut self, mode: FileMode) -> Result<()> {
        let mut permissions = self.metadata()?.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(mode.perm());
        }
        #[cfg(not(unix))]
        permissions.set_readonly(mode.perm() & 0o222 == 0);
        fs::set_permissions(&self.path, permissions).map_err(|e| self.io_error(e))
    }

    #[cfg(unix)]
    fn chown(&mut self, uid: u32, gid: u32) -> Result<()> {
        self.handle()?;
        std::os::unix::fs::chown(&self.path, Some(uid), Some(gid)).map_err(|e| self.io_error(e))
    }

    #[cfg(not(unix))]
    fn chown(&mut self, _uid: u32, _gid: u32) -> Result<()> {
        self.handle()?;
        Err(not_implemented("chown"))
    }

    #[cfg(unix)]
    fn owner_uid(&self) -> Result<u32> {
        use std::os::unix::fs::MetadataExt;
        Ok(self.metadata()?.uid())
    }

    #[cfg(not(unix))]
    fn owner_uid(&self) -> Result<u32> {
        self.handle()?;
        Err(not_implemented("owner_uid"))
    }

    #[cfg(unix)]
    fn owner_gid(&self) -> Result<u32> {
        use std::os::unix::fs::MetadataExt;
        Ok(self.metadata()?.gid())
    }

    #[cfg(not(unix))]
    fn owner_gid(&self) -> Result<u32> {
        self.handle()?;
        Err(not_implemented("owner_gid"))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.file()?.read(buf);
        match result {
            Ok(0) if !buf.is_empty() => Err(ErrorKind::EndOfStream.into()),
            Ok(n) => Ok(n),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let result = self.file()?.seek(SeekFrom::Start(offset));
        result.map_err(|e| self.io_error(e))?;
        self.read(buf)
    }

    fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>> {
        let path = self.path.clone();
        let name = self.name.clone();
        match self.handle.as_mut() {
            None => Err(ErrorKind::AlreadyClosed.into()),
            Some(Handle::File(_)) => Err(ErrorKind::NotADirectory { path: name }.into()),
            Some(Handle::Dir { listing, cursor }) => {
                if listing.is_none() {
                    debug!(path = %path.display(), "loading directory listing");
                    let loaded = Self::load_listing(&path).map_err(|e| Box::new(Error::file(&path, e)))?;
                    *listing = Some(loaded);
                }
                let entries = listing.as_deref().unwrap_or_default();
                Ok(paginate(entries, cursor, n))
            }
        }
    }

    // Host convention: End adds the offset to the length.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let from = match whence {
            Whence::Start => SeekFrom::Start(u64::try_from(offset).map_err(|_| {
                ErrorKind::OutOfRange {
                    operation: "seek",
                    requested: offset,
                    length: 0,
                    cursor: 0,
                }
            })?),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let result = self.file()?.seek(from);
        result.map_err(|e| self.io_error(e))
    }

    fn stat(&self) -> Result<FileInfo> {
        let metadata = self.metadata()?;
        Ok(info_from_metadata(self.base_name(), metadata))
    }

    fn sync(&mut self) -> Result<()> {
        if let Handle::File(file) = self.handle()? {
            file.sync_all().map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let result = self.file()?.set_len(size);
        result.map_err(|e| self.io_error(e))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = self.file()?.write(buf);
        result.map_err(|e| self.io_error(e))
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        let file = self.file()?;
        let result = file.stream_position().and_then(|cursor| {
            file.seek(SeekFrom::Start(offset))?;
            let written = file.write(buf);
            file.seek(SeekFrom::Start(cursor))?;
            written
        });
        result.map_err(|e| self.io_error(e))
    }
}
