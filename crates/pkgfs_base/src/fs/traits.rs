use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};

use super::file_info::{FileInfo, FileMode};

/// Origin of a [`File::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute position.
    Start,
    /// Relative to the current cursor.
    Current,
    /// Measured from the end of the file.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = Box<Error>;

    fn try_from(whence: i32) -> Result<Self> {
        match whence {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(ErrorKind::InvalidSeekWhence { whence }.into()),
        }
    }
}

/// One page of a directory listing.
///
/// `end_of_stream` is set when the listing cursor reached the end; the entries of
/// that final page are still valid and must not be discarded.
#[derive(Debug, Clone)]
pub struct DirPage<T> {
    pub entries: Vec<T>,
    pub end_of_stream: bool,
}

impl<T> DirPage<T> {
    pub fn new(entries: Vec<T>, end_of_stream: bool) -> Self {
        Self {
            entries,
            end_of_stream,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> DirPage<U> {
        DirPage {
            entries: self.entries.into_iter().map(f).collect(),
            end_of_stream: self.end_of_stream,
        }
    }
}

/// Slices one page out of a directory's entries and advances the listing cursor.
///
/// `n <= 0` returns everything from the cursor on and rewinds the cursor to 0.
/// `n > 0` returns up to `n` entries and flags the end once the cursor reaches it.
pub(crate) fn paginate(entries: &[FileInfo], cursor: &mut usize, n: isize) -> DirPage<FileInfo> {
    let start = (*cursor).min(entries.len());
    if n <= 0 {
        *cursor = 0;
        return DirPage::new(entries[start..].to_vec(), false);
    }
    let wanted = start.saturating_add(n as usize);
    let end = wanted.min(entries.len());
    *cursor = end;
    DirPage::new(entries[start..end].to_vec(), wanted >= entries.len())
}

/* 📖 # Why is File a trait object and not a generic?

Backends return different handle types (buffers, host files, archive entries,
filtered wrappers around other handles). Decorators wrap whatever the inner system
returned, so handles travel as `Box<dyn File>`.
*/

/// A single open file or directory.
///
/// A handle is owned by one caller; it is not synchronized for shared use. Once
/// closed, every operation other than `close` fails with `AlreadyClosed`.
pub trait File: std::fmt::Debug + Send {
    /// Closes the handle, rendering it unusable for I/O.
    fn close(&mut self) -> Result<()>;

    /// Changes the permission bits.
    fn chmod(&mut self, mode: FileMode) -> Result<()>;

    /// Changes the numeric owner.
    fn chown(&mut self, uid: u32, gid: u32) -> Result<()>;

    fn owner_uid(&self) -> Result<u32>;

    fn owner_gid(&self) -> Result<u32>;

    /// Reads up to `buf.len()` bytes at the cursor. At the end, a non-empty
    /// `buf` yields `EndOfStream`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads at `offset`.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Lists up to `n` entries from the listing cursor, or all remaining for `n <= 0`.
    fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>>;

    /// Same contract as [`File::readdir`], projected to entry names.
    fn readdirnames(&mut self, n: isize) -> Result<DirPage<String>> {
        Ok(self.readdir(n)?.map(|info| info.name().to_string()))
    }

    /// Repositions the cursor and returns the new position.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;

    fn stat(&self) -> Result<FileInfo>;

    fn sync(&mut self) -> Result<()>;

    /// Changes the size of the file without moving the cursor.
    fn truncate(&mut self, size: u64) -> Result<()>;

    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Writes at `offset` without moving the cursor.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize>;

    fn write_str(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }
}

/// Reads from the cursor to the end of the file.
pub fn read_all(file: &mut dyn File) -> Result<Vec<u8>> {
    let mut contents = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match file.read(&mut chunk) {
            Ok(n) => contents.extend_from_slice(&chunk[..n]),
            Err(e) if e.is_end_of_stream() => return Ok(contents),
            Err(e) => return Err(e),
        }
    }
}

/// A collection of named files.
///
/// Implementations normalize the requested name with
/// [`FilePath::clean`](super::FilePath::clean) before resolving it.
pub trait System: std::fmt::Debug + Send + Sync + 'static {
    /// Opens a named file or directory.
    fn open(&self, name: &str) -> Result<Box<dyn File>>;

    /// Reports whether `err` means the name does not exist in this system.
    ///
    /// Decorators must also recognize the errors of the systems they wrap.
    fn is_not_exist(&self, err: &Error) -> bool {
        err.is_not_exist()
    }

    /// Opens a file and reads its entire contents.
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.open(name)?;
        let contents = read_all(file.as_mut())?;
        file.close()?;
        Ok(contents)
    }

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, name: &str) -> Result<String> {
        let contents = self.read_file(name)?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", name))
    }
}

/* 📖 # Why use Arc<dyn System> with SystemHandle?

Decorators hold the system they wrap, and the same backend (for example the
attached bundle) is shared by many package views. SystemHandle wraps the Arc for
cheap cloning and Deref access without lifetime parameters.
*/

/// Shared handle to a [`System`] implementation.
#[derive(Debug, Clone)]
pub struct SystemHandle(Arc<dyn System>);

impl SystemHandle {
    pub fn new(system: impl System + 'static) -> Self {
        Self(Arc::new(system))
    }
}

impl std::ops::Deref for SystemHandle {
    type Target = dyn System;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
