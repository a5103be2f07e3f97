use std::time::SystemTime;

use crate::error::{ErrorKind, Result};

use super::file_info::{FileInfo, FileMode};
use super::traits::{DirPage, File, Whence, paginate};

#[derive(Debug, Clone)]
enum Content {
    File(Vec<u8>),
    Dir(Vec<FileInfo>),
}

/// In-memory file or directory.
///
/// Regular files own a growable buffer, directories own the descriptors of their
/// immediate children. One cursor serves both reads/writes and listing.
///
/// # Examples
///
/// ```
/// use pkgfs_base::fs::{File, FileMode, MemFile, Whence};
/// use std::time::SystemTime;
///
/// let mut file = MemFile::new("notes.txt", FileMode::new(0o644), SystemTime::now(), vec![]);
/// file.write_str("hello").unwrap();
/// file.seek(0, Whence::Start).unwrap();
/// let mut buf = [0u8; 5];
/// assert_eq!(file.read(&mut buf).unwrap(), 5);
/// assert_eq!(&buf, b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct MemFile {
    name: String,
    info: FileInfo,
    uid: u32,
    gid: u32,
    closed: bool,
    cursor: u64,
    content: Content,
}

fn base_name(name: &str) -> &str {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

impl MemFile {
    /// Creates a regular file holding `data`.
    pub fn new(name: impl Into<String>, mode: FileMode, modified: SystemTime, data: Vec<u8>) -> Self {
        let name = name.into();
        let info = FileInfo::new(base_name(&name), data.len() as u64, mode, modified);
        Self {
            name,
            info,
            uid: 0,
            gid: 0,
            closed: false,
            cursor: 0,
            content: Content::File(data),
        }
    }

    /// Creates a directory listing `entries`. The directory type bit is always set.
    pub fn new_dir(
        name: impl Into<String>,
        mode: FileMode,
        modified: SystemTime,
        entries: Vec<FileInfo>,
    ) -> Self {
        let name = name.into();
        let info = FileInfo::new(base_name(&name), 0, mode | FileMode::DIR, modified);
        Self {
            name,
            info,
            uid: 0,
            gid: 0,
            closed: false,
            cursor: 0,
            content: Content::Dir(entries),
        }
    }

    /// Name as presented to `Open`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the file; the descriptor keeps the base name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.info.set_name(base_name(&self.name));
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.content, Content::Dir(_))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rewinds the read/write/listing cursor.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Replaces the listing of a directory and rewinds the cursor.
    pub fn set_entries(&mut self, entries: Vec<FileInfo>) -> Result<()> {
        self.ensure_open()?;
        match &mut self.content {
            Content::Dir(current) => *current = entries,
            Content::File(_) => return Err(self.not_a_directory()),
        }
        self.reset();
        Ok(())
    }

    /// Appends one entry to a directory and rewinds the cursor.
    pub fn append_entry(&mut self, entry: FileInfo) -> Result<()> {
        self.ensure_open()?;
        match &mut self.content {
            Content::Dir(current) => current.push(entry),
            Content::File(_) => return Err(self.not_a_directory()),
        }
        self.reset();
        Ok(())
    }

    /// Live descriptor, without the closed check.
    pub(crate) fn info(&self) -> &FileInfo {
        &self.info
    }

    /// Fresh handle on the same content: cursor at 0, open again.
    pub(crate) fn reopened(&self, name: impl Into<String>) -> MemFile {
        let mut file = self.clone();
        file.name = name.into();
        file.closed = false;
        file.cursor = 0;
        file
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ErrorKind::AlreadyClosed.into());
        }
        Ok(())
    }

    fn not_a_directory(&self) -> Box<crate::error::Error> {
        ErrorKind::NotADirectory {
            path: self.name.clone(),
        }
        .into()
    }

    fn buffer(&self) -> Result<&Vec<u8>> {
        self.ensure_open()?;
        match &self.content {
            Content::File(buf) => Ok(buf),
            Content::Dir(_) => Err(ErrorKind::IsADirectory {
                path: self.name.clone(),
            }
            .into()),
        }
    }

    fn buffer_mut(&mut self) -> Result<&mut Vec<u8>> {
        self.ensure_open()?;
        match &mut self.content {
            Content::File(buf) => Ok(buf),
            Content::Dir(_) => Err(ErrorKind::IsADirectory {
                path: self.name.clone(),
            }
            .into()),
        }
    }

    fn out_of_range(&self, operation: &'static str, requested: i64, length: usize) -> Box<crate::error::Error> {
        ErrorKind::OutOfRange {
            operation,
            requested,
            length: length as u64,
            cursor: self.cursor,
        }
        .into()
    }

    /// Copies `data` into the buffer at `offset`, growing it as needed. Fails
    /// with `OutOfRange` when the write would end beyond [`MAX_FILE_SIZE`].
    fn write_into(&mut self, operation: &'static str, data: &[u8], offset: u64) -> Result<usize> {
        let len = self.buffer()?.len();
        let bounds = offset
            .checked_add(data.len() as u64)
            .filter(|end| *end <= MAX_FILE_SIZE)
            .and_then(|end| Some((usize::try_from(offset).ok()?, usize::try_from(end).ok()?)));
        let Some((offset, end)) = bounds else {
            return Err(self.out_of_range(operation, requested(offset), len));
        };
        let buf = self.buffer_mut()?;
        grow(buf, end);
        buf[offset..end].copy_from_slice(data);
        let len = buf.len() as u64;
        self.info.set_size(len);
        Ok(data.len())
    }
}

/// Largest buffer a write may produce.
const MAX_FILE_SIZE: u64 = 1 << 32;

fn requested(offset: u64) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

/// Extends `buf` to at least `end` bytes. When capacity runs out, reserves at least
/// twice the old capacity plus the requested growth. Never shrinks.
fn grow(buf: &mut Vec<u8>, end: usize) {
    let len = buf.len();
    if end <= len {
        return;
    }
    let capacity = buf.capacity();
    if end > capacity {
        let target = 2 * capacity + (end - len);
        buf.reserve_exact(target - len);
    }
    buf.resize(end, 0);
}

impl File for MemFile {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn chmod(&mut self, mode: FileMode) -> Result<()> {
        self.ensure_open()?;
        let updated = self.info.mode().with_perm(mode);
        self.info.set_mode(updated);
        Ok(())
    }

    fn chown(&mut self, uid: u32, gid: u32) -> Result<()> {
        self.ensure_open()?;
        self.uid = uid;
        self.gid = gid;
        Ok(())
    }

    fn owner_uid(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.uid)
    }

    fn owner_gid(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.gid)
    }

    fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let buf = self.buffer()?;
        if out.is_empty() {
            return Ok(0);
        }
        let start = self.cursor as usize;
        if start >= buf.len() {
            return Err(ErrorKind::EndOfStream.into());
        }
        let n = out.len().min(buf.len() - start);
        out[..n].copy_from_slice(&buf[start..start + n]);
        self.cursor += n as u64;
        Ok(n)
    }

    // Moves the shared cursor to `offset` before reading; this is not a
    // cursor-independent positional read.
    fn read_at(&mut self, out: &mut [u8], offset: u64) -> Result<usize> {
        self.buffer()?;
        self.cursor = offset;
        self.read(out)
    }

    fn readdir(&mut self, n: isize) -> Result<DirPage<FileInfo>> {
        self.ensure_open()?;
        let entries = match &self.content {
            Content::Dir(entries) => entries,
            Content::File(_) => return Err(self.not_a_directory()),
        };
        let mut cursor = self.cursor as usize;
        let page = paginate(entries, &mut cursor, n);
        self.cursor = cursor as u64;
        Ok(page)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let len = self.buffer()?.len();
        let length = len as i64;
        let cursor = self.cursor as i64;
        // End is "distance back from the end": the offset is subtracted.
        let target = match whence {
            Whence::Start => Some(offset),
            Whence::Current => cursor.checked_add(offset),
            Whence::End => length.checked_sub(offset),
        };
        match target {
            Some(position) if (0..=length).contains(&position) => {
                self.cursor = position as u64;
                Ok(self.cursor)
            }
            Some(position) => Err(self.out_of_range("seek", position, len)),
            None => Err(self.out_of_range("seek", offset, len)),
        }
    }

    fn stat(&self) -> Result<FileInfo> {
        self.ensure_open()?;
        Ok(self.info.clone())
    }

    fn sync(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let len = self.buffer()?.len();
        if size > len as u64 {
            return Err(self.out_of_range("truncate", requested(size), len));
        }
        let buf = self.buffer_mut()?;
        buf.truncate(size as usize);
        self.info.set_size(size);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.write_into("write", data, self.cursor)?;
        self.cursor += n as u64;
        Ok(n)
    }

    fn write_at(&mut self, data: &[u8], offset: u64) -> Result<usize> {
        let len = self.buffer()?.len();
        if offset > len as u64 {
            return Err(self.out_of_range("write_at", requested(offset), len));
        }
        self.write_into("write_at", data, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> FileMode {
        FileMode::new(0o666)
    }

    fn file(data: &[u8]) -> MemFile {
        MemFile::new("foo", mode(), SystemTime::UNIX_EPOCH, data.to_vec())
    }

    fn dir(names: &[&str]) -> MemFile {
        let entries = names
            .iter()
            .map(|name| FileInfo::new(*name, 0, mode(), SystemTime::UNIX_EPOCH))
            .collect();
        MemFile::new_dir("dir", FileMode::dir(0o755), SystemTime::UNIX_EPOCH, entries)
    }

    fn contents(f: &mut MemFile) -> Vec<u8> {
        f.seek(0, Whence::Start).unwrap();
        super::super::read_all(f).unwrap()
    }

    #[test]
    fn test_chmod() {
        let mut f = file(b"");
        assert_eq!(f.stat().unwrap().mode(), mode());
        f.chmod(FileMode::new(0o777)).unwrap();
        assert_eq!(f.stat().unwrap().mode(), FileMode::new(0o777));
    }

    #[test]
    fn test_chmod_keeps_directory_bit() {
        let mut d = dir(&[]);
        d.chmod(FileMode::new(0o700)).unwrap();
        let info = d.stat().unwrap();
        assert!(info.is_dir());
        assert_eq!(info.mode().perm(), 0o700);
    }

    #[test]
    fn test_default_owner_and_chown() {
        let mut f = file(b"");
        assert_eq!(f.owner_uid().unwrap(), 0);
        assert_eq!(f.owner_gid().unwrap(), 0);
        f.chown(1, 2).unwrap();
        assert_eq!(f.owner_uid().unwrap(), 1);
        assert_eq!(f.owner_gid().unwrap(), 2);
    }

    #[test]
    fn test_name_on_create_and_set() {
        let mut f = file(b"");
        assert_eq!(f.stat().unwrap().name(), "foo");
        f.set_name("bar/baz");
        assert_eq!(f.name(), "bar/baz");
        assert_eq!(f.stat().unwrap().name(), "baz");
    }

    #[test]
    fn test_read_less() {
        let mut f = file(b"ab");
        let mut b = [0u8; 1];
        assert_eq!(f.read(&mut b).unwrap(), 1);
        assert_eq!(b[0], b'a');
        assert_eq!(f.read(&mut b).unwrap(), 1);
        assert_eq!(b[0], b'b');
        assert_eq!(f.read(&mut []).unwrap(), 0);
        let err = f.read(&mut b).unwrap_err();
        assert!(err.is_end_of_stream());
        assert_eq!(b[0], b'b');
    }

    #[test]
    fn test_read_more() {
        let mut f = file(b"ab");
        let mut b = [0u8; 10];
        assert_eq!(f.read(&mut b).unwrap(), 2);
        assert_eq!(&b[..2], b"ab");
    }

    #[test]
    fn test_read_reset() {
        let mut f = file(b"ab");
        let mut b = [0u8; 1];
        f.read(&mut b).unwrap();
        f.reset();
        f.read(&mut b).unwrap();
        assert_eq!(b[0], b'a');
    }

    #[test]
    fn test_read_empty_buffer_at_end_is_ok() {
        let mut f = file(b"");
        assert_eq!(f.read(&mut []).unwrap(), 0);
        assert!(f.read(&mut [0u8; 4]).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_read_at_moves_cursor() {
        let mut f = file(b"abcd");
        let mut b = [0u8; 2];
        assert_eq!(f.read_at(&mut b, 1).unwrap(), 2);
        assert_eq!(&b, b"bc");
        // The cursor now sits after the positional read.
        assert_eq!(f.read(&mut b).unwrap(), 1);
        assert_eq!(b[0], b'd');
        assert!(f.read_at(&mut b, 4).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_write_after_read_at_far_past_end() {
        for offset in [u64::MAX, MAX_FILE_SIZE, 1 << 45] {
            let mut f = file(b"abc");
            assert!(f.read_at(&mut [0u8; 1], offset).unwrap_err().is_end_of_stream());
            let err = f.write(b"x").unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::OutOfRange { operation: "write", length: 3, cursor, .. } if *cursor == offset),
                "{}: {}",
                offset,
                err
            );
            assert_eq!(f.stat().unwrap().size(), 3);
            assert_eq!(contents(&mut f), b"abc");
        }
    }

    #[test]
    fn test_write_after_read_at_past_end_fills_gap() {
        let mut f = file(b"abc");
        assert!(f.read_at(&mut [0u8; 1], 5).unwrap_err().is_end_of_stream());
        assert_eq!(f.write(b"x").unwrap(), 1);
        assert_eq!(contents(&mut f), b"abc\0\0x");
    }

    #[test]
    fn test_write_then_read_back() {
        let mut f = file(b"");
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        assert_eq!(f.write(&data).unwrap(), data.len());
        assert_eq!(f.stat().unwrap().size(), data.len() as u64);
        assert_eq!(contents(&mut f), data);
    }

    #[test]
    fn test_write_overwrites_in_place() {
        let mut f = file(b"hello world");
        f.write(b"J").unwrap();
        assert_eq!(f.stat().unwrap().size(), 11);
        assert_eq!(contents(&mut f), b"Jello world");
    }

    #[test]
    fn test_write_extends_past_end() {
        let mut f = file(b"abc");
        f.seek(2, Whence::Start).unwrap();
        f.write_str("XYZ").unwrap();
        assert_eq!(contents(&mut f), b"abXYZ");
        assert_eq!(f.stat().unwrap().size(), 5);
    }

    #[test]
    fn test_write_after_truncate_fills_gap_with_zeros() {
        let mut f = file(b"abcdef");
        f.seek(0, Whence::End).unwrap();
        f.truncate(2).unwrap();
        f.write(b"!").unwrap();
        assert_eq!(contents(&mut f), b"ab\0\0\0\0!");
    }

    #[test]
    fn test_grow_doubles_capacity() {
        let mut buf = Vec::with_capacity(4);
        buf.extend_from_slice(b"abcd");
        let before = buf.capacity();
        grow(&mut buf, 6);
        assert_eq!(buf.len(), 6);
        assert_eq!(&buf[4..], [0, 0]);
        if before < 6 {
            assert!(buf.capacity() >= 2 * before + 2);
        }
        let capacity = buf.capacity();
        grow(&mut buf, 3);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.capacity(), capacity);
    }

    #[test]
    fn test_write_at_keeps_cursor() {
        let mut f = file(b"abcd");
        f.seek(1, Whence::Start).unwrap();
        assert_eq!(f.write_at(b"XY", 3).unwrap(), 2);
        assert_eq!(f.seek(0, Whence::Current).unwrap(), 1);
        assert_eq!(f.stat().unwrap().size(), 5);
        assert_eq!(contents(&mut f), b"abcXY");
    }

    #[test]
    fn test_write_at_rejects_holes() {
        let mut f = file(b"ab");
        let err = f.write_at(b"x", 3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfRange { operation: "write_at", .. }));
        assert_eq!(f.write_at(b"x", 2).unwrap(), 1);
        assert_eq!(contents(&mut f), b"abx");
    }

    #[test]
    fn test_truncate() {
        let mut f = file(b"hello");
        f.seek(4, Whence::Start).unwrap();
        f.truncate(2).unwrap();
        assert_eq!(f.stat().unwrap().size(), 2);
        // Cursor is left where it was, past the new end.
        assert!(f.read(&mut [0u8; 1]).unwrap_err().is_end_of_stream());
        f.write(b"!").unwrap();
        assert_eq!(f.stat().unwrap().size(), 5);
        f.truncate(2).unwrap();
        assert_eq!(contents(&mut f), b"he");
    }

    #[test]
    fn test_truncate_out_of_range() {
        let mut f = file(b"ab");
        let err = f.truncate(3).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::OutOfRange {
                operation: "truncate",
                requested: 3,
                length: 2,
                ..
            }
        ));
        assert_eq!(f.stat().unwrap().size(), 2);
    }

    #[test]
    fn test_seek_conventions() {
        let mut f = file(b"abcdef");
        assert_eq!(f.seek(2, Whence::Start).unwrap(), 2);
        assert_eq!(f.seek(1, Whence::Current).unwrap(), 3);
        assert_eq!(f.seek(-3, Whence::Current).unwrap(), 0);
        assert_eq!(f.seek(0, Whence::End).unwrap(), 6);
        assert_eq!(f.seek(2, Whence::End).unwrap(), 4);
        assert_eq!(f.seek(6, Whence::End).unwrap(), 0);
    }

    #[test]
    fn test_seek_out_of_range_keeps_cursor() {
        let mut f = file(b"abc");
        f.seek(1, Whence::Start).unwrap();
        for (offset, whence) in [(4, Whence::Start), (-2, Whence::Current), (-1, Whence::End), (4, Whence::End)] {
            let err = f.seek(offset, whence).unwrap_err();
            match err.kind() {
                ErrorKind::OutOfRange { cursor, length, .. } => {
                    assert_eq!(*cursor, 1);
                    assert_eq!(*length, 3);
                }
                other => panic!("Expected OutOfRange, got {:?}", other),
            }
        }
        assert_eq!(f.seek(0, Whence::Current).unwrap(), 1);
    }

    #[test]
    fn test_seek_overflow_is_out_of_range() {
        let mut f = file(b"abc");
        f.seek(3, Whence::Start).unwrap();
        let err = f.seek(i64::MAX, Whence::Current).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfRange { .. }));
        let err = f.seek(i64::MIN, Whence::End).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfRange { .. }));
    }

    #[test]
    fn test_closed_file_rejects_everything() {
        let mut f = file(b"abc");
        f.close().unwrap();
        assert!(f.is_closed());
        let errors = [
            f.read(&mut [0u8; 1]).unwrap_err(),
            f.read_at(&mut [0u8; 1], 0).unwrap_err(),
            f.write(b"x").unwrap_err(),
            f.write_at(b"x", 0).unwrap_err(),
            f.write_str("x").unwrap_err(),
            f.seek(0, Whence::Start).unwrap_err(),
            f.truncate(0).unwrap_err(),
            f.stat().unwrap_err(),
            f.sync().unwrap_err(),
            f.chmod(mode()).unwrap_err(),
            f.chown(1, 1).unwrap_err(),
            f.owner_uid().unwrap_err(),
            f.owner_gid().unwrap_err(),
            f.readdir(0).unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(err.kind(), ErrorKind::AlreadyClosed), "got {}", err);
        }
        assert!(f.close().is_ok());
    }

    #[test]
    fn test_file_ops_on_directory() {
        let mut d = dir(&["a"]);
        let err = d.read(&mut [0u8; 1]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IsADirectory { .. }));
        let err = d.write(b"x").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IsADirectory { .. }));
        let err = d.seek(0, Whence::Start).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IsADirectory { .. }));
        let err = d.truncate(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IsADirectory { .. }));
    }

    #[test]
    fn test_readdir_on_file() {
        let mut f = file(b"abc");
        let err = f.readdir(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
        let err = f.readdirnames(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
        let err = f.append_entry(FileInfo::new("x", 0, mode(), SystemTime::UNIX_EPOCH)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
        let err = f.set_entries(vec![]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
    }

    #[test]
    fn test_readdir_all() {
        let mut d = dir(&["a", "b", "c"]);
        let page = d.readdirnames(0).unwrap();
        assert_eq!(page.entries, ["a", "b", "c"]);
        assert!(!page.end_of_stream);
        // A full listing rewinds, so it can be repeated.
        assert_eq!(d.readdirnames(-1).unwrap().entries, ["a", "b", "c"]);
    }

    #[test]
    fn test_readdir_pages() {
        let mut d = dir(&["a", "b", "c"]);
        let page = d.readdirnames(2).unwrap();
        assert_eq!(page.entries, ["a", "b"]);
        assert!(!page.end_of_stream);
        let page = d.readdirnames(2).unwrap();
        assert_eq!(page.entries, ["c"]);
        assert!(page.end_of_stream);
        let page = d.readdirnames(2).unwrap();
        assert!(page.entries.is_empty());
        assert!(page.end_of_stream);
    }

    #[test]
    fn test_readdir_single_steps_partition_full_listing() {
        let mut d = dir(&["a", "b", "c", "d"]);
        let all = d.readdirnames(0).unwrap().entries;
        let mut paged = vec![];
        loop {
            let page = d.readdirnames(1).unwrap();
            paged.extend(page.entries);
            if page.end_of_stream {
                break;
            }
        }
        assert_eq!(paged, all);
    }

    #[test]
    fn test_readdir_remaining_after_partial_page() {
        let mut d = dir(&["a", "b", "c"]);
        d.readdirnames(1).unwrap();
        assert_eq!(d.readdirnames(0).unwrap().entries, ["b", "c"]);
        assert_eq!(d.readdirnames(0).unwrap().entries, ["a", "b", "c"]);
    }

    #[test]
    fn test_append_and_set_entries_rewind() {
        let mut d = dir(&["a", "b"]);
        d.readdirnames(1).unwrap();
        d.append_entry(FileInfo::new("c", 0, mode(), SystemTime::UNIX_EPOCH)).unwrap();
        assert_eq!(d.readdirnames(0).unwrap().entries, ["a", "b", "c"]);

        d.readdirnames(2).unwrap();
        d.set_entries(vec![FileInfo::new("z", 0, mode(), SystemTime::UNIX_EPOCH)]).unwrap();
        let page = d.readdirnames(5).unwrap();
        assert_eq!(page.entries, ["z"]);
        assert!(page.end_of_stream);
    }

    #[test]
    fn test_stat_tracks_size() {
        let mut f = file(b"");
        f.write(b"abc").unwrap();
        assert_eq!(f.stat().unwrap().size(), 3);
        f.write_at(b"defg", 3).unwrap();
        assert_eq!(f.stat().unwrap().size(), 7);
        f.truncate(1).unwrap();
        assert_eq!(f.stat().unwrap().size(), 1);
    }

    #[test]
    fn test_reopened_is_independent() {
        let mut f = file(b"abc");
        f.read(&mut [0u8; 2]).unwrap();
        f.close().unwrap();
        let mut copy = f.reopened("/foo");
        assert!(!copy.is_closed());
        assert_eq!(copy.name(), "/foo");
        copy.write(b"X").unwrap();
        assert_eq!(contents(&mut copy), b"Xbc");
        assert!(f.is_closed());
    }
}
