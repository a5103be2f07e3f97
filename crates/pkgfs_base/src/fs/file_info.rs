use std::any::Any;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;
use std::time::SystemTime;

/// Permission bits plus a directory type bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Type bit marking a directory.
    pub const DIR: FileMode = FileMode(1 << 31);

    const PERM_MASK: u32 = 0o777;
    const TYPE_MASK: u32 = !Self::PERM_MASK;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Directory mode with the given permission bits.
    pub const fn dir(perm: u32) -> Self {
        Self(Self::DIR.0 | (perm & Self::PERM_MASK))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn perm(self) -> u32 {
        self.0 & Self::PERM_MASK
    }

    pub const fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }

    /// Replaces the permission bits, keeping the type bits.
    pub const fn with_perm(self, perm: FileMode) -> Self {
        Self((self.0 & Self::TYPE_MASK) | (perm.0 & Self::PERM_MASK))
    }
}

impl BitOr for FileMode {
    type Output = FileMode;

    fn bitor(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 | rhs.0)
    }
}

impl From<u32> for FileMode {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        write!(f, "{}{:03o}", kind, self.perm())
    }
}

/// Opaque backend-specific payload attached to a descriptor.
pub type SysPayload = Arc<dyn Any + Send + Sync>;

/// Descriptor of a file or directory: base name, size, mode, modification time.
#[derive(Clone)]
pub struct FileInfo {
    name: String,
    size: u64,
    mode: FileMode,
    modified: SystemTime,
    sys: Option<SysPayload>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, mode: FileMode, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            size,
            mode,
            modified,
            sys: None,
        }
    }

    /// Attaches a backend payload.
    pub fn with_sys(mut self, sys: SysPayload) -> Self {
        self.sys = Some(sys);
        self
    }

    /// Base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Length in bytes; zero for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FileMode) {
        self.mode = mode;
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn set_modified(&mut self, modified: SystemTime) {
        self.modified = modified;
    }

    /// Abbreviation for `mode().is_dir()`.
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Backend payload, if any.
    pub fn sys(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.sys.as_deref()
    }
}

impl fmt::Debug for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileInfo")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mode", &self.mode)
            .field("modified", &self.modified)
            .field("sys", &self.sys.is_some())
            .finish()
    }
}
