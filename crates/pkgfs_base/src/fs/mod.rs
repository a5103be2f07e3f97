/* 📖 # What is the fs module?

A small capability contract (`System` opens names, `File` is an open handle) and
the backends that implement it: an in-memory namespace, the host file system, a
zip archive, an empty stub, and a decorator that narrows another system to a
limited view. Backends compose by wrapping a `SystemHandle`, never by sharing
mutable state.
*/

mod empty_fs;
mod file_info;
mod file_path;
mod limit_fs;
mod mem_file;
mod mem_system;
mod real_fs;
mod traits;
mod zip_fs;

pub use empty_fs::EmptySystem;
pub use file_info::{FileInfo, FileMode, SysPayload};
pub use file_path::FilePath;
pub use limit_fs::{LimitConfig, LimitSystem};
pub use mem_file::MemFile;
pub use mem_system::MemSystem;
pub use real_fs::{RealFile, RealSystem};
pub use traits::{DirPage, File, System, SystemHandle, Whence, read_all};
pub use zip_fs::{ZipFile, ZipSystem, has_trailing_archive};
