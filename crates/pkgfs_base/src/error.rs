use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_error::SpanTrace;
use zip::result::ZipError;

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
 */

/// Error variants that can occur in pkgfs operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// The name has no backing entry
    NotFound { path: String },

    /// The name may exist in a wrapped system but is excluded by a view limit
    LimitedOrNotFound { path: String },

    /// The name contains a NUL byte or a literal host separator
    InvalidPath { path: String },

    /// The file handle has been closed
    AlreadyClosed,

    /// A directory operation was attempted on a regular file
    NotADirectory { path: String },

    /// A regular-file operation was attempted on a directory
    IsADirectory { path: String },

    /// Seek, truncate or positional write outside `0..=length`, or a write
    /// that would grow a file past its size limit
    OutOfRange {
        operation: &'static str,
        requested: i64,
        length: u64,
        /// Cursor position, left unchanged by the failed operation
        cursor: u64,
    },

    /// Seek whence other than 0, 1 or 2
    InvalidSeekWhence { whence: i32 },

    /// The backend cannot perform this operation (e.g. writes to an archive)
    CapabilityNotSupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Host metadata not available on this platform
    NotImplemented {
        backend: &'static str,
        operation: &'static str,
    },

    /// The read or listing cursor reached the end
    EndOfStream,

    /// File system operation failed
    FileError {
        path: PathBuf,
        source: Arc<io::Error>,
    },

    /// Zip archive could not be parsed or read
    Archive {
        path: PathBuf,
        source: Arc<ZipError>,
    },

    /// A view-limit glob pattern does not compile
    InvalidGlob { pattern: String, message: String },

    /// A configuration file could not be parsed
    Config { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        use ErrorKind::*;
        match (self, other) {
            (NotFound { path: a }, NotFound { path: b })
            | (LimitedOrNotFound { path: a }, LimitedOrNotFound { path: b })
            | (InvalidPath { path: a }, InvalidPath { path: b })
            | (NotADirectory { path: a }, NotADirectory { path: b })
            | (IsADirectory { path: a }, IsADirectory { path: b }) => a == b,
            (AlreadyClosed, AlreadyClosed) | (EndOfStream, EndOfStream) => true,
            (
                OutOfRange {
                    operation: op_a,
                    requested: req_a,
                    length: len_a,
                    cursor: cur_a,
                },
                OutOfRange {
                    operation: op_b,
                    requested: req_b,
                    length: len_b,
                    cursor: cur_b,
                },
            ) => op_a == op_b && req_a == req_b && len_a == len_b && cur_a == cur_b,
            (InvalidSeekWhence { whence: a }, InvalidSeekWhence { whence: b }) => a == b,
            (
                CapabilityNotSupported {
                    backend: ba,
                    operation: oa,
                },
                CapabilityNotSupported {
                    backend: bb,
                    operation: ob,
                },
            )
            | (
                NotImplemented {
                    backend: ba,
                    operation: oa,
                },
                NotImplemented {
                    backend: bb,
                    operation: ob,
                },
            ) => ba == bb && oa == ob,
            // Host errors are not comparable by value, only by identity
            (
                FileError {
                    path: pa,
                    source: sa,
                },
                FileError {
                    path: pb,
                    source: sb,
                },
            ) => pa == pb && Arc::ptr_eq(sa, sb),
            (
                Archive {
                    path: pa,
                    source: sa,
                },
                Archive {
                    path: pb,
                    source: sb,
                },
            ) => pa == pb && Arc::ptr_eq(sa, sb),
            (
                InvalidGlob {
                    pattern: pa,
                    message: ma,
                },
                InvalidGlob {
                    pattern: pb,
                    message: mb,
                },
            ) => pa == pb && ma == mb,
            (Config { message: a }, Config { message: b })
            | (Message { message: a }, Message { message: b }) => a == b,
            _ => false,
        }
    }
}

/* 📖 # Why separate ErrorKind and Error?
This two-layer design provides a clear separation of concerns:
- ErrorKind: structural variants with specific contexts (file paths, offsets, etc.)
- Error: wraps ErrorKind with additional runtime context strings and a span trace

Users pattern match on ErrorKind for specific handling, Error carries the context
attached during propagation.
*/

/// Comprehensive error type wrapping ErrorKind with optional context.
/// Error implements the standard Error trait and supports context attachment.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl Error {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a catch-all error from a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Wraps a host I/O error for the given path.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::new(ErrorKind::FileError {
            path: path.into(),
            source: Arc::new(source),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    /// Useful to avoid expensive string construction for successful paths.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    /// Allows pattern matching on specific error variants.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in attachment order.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    /// Traverses the error source chain to find the root cause.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// Reports whether this error means the requested name does not exist.
    ///
    /// Policy exclusions (`LimitedOrNotFound`) are reported as not existing too,
    /// so a restricted view cannot be probed for hidden names.
    pub fn is_not_exist(&self) -> bool {
        match &self.kind {
            ErrorKind::NotFound { .. } | ErrorKind::LimitedOrNotFound { .. } => true,
            ErrorKind::FileError { source, .. } => source.kind() == io::ErrorKind::NotFound,
            ErrorKind::Archive { source, .. } => matches!(**source, ZipError::FileNotFound),
            _ => false,
        }
    }

    /// Reports whether this error signals the end of a read or listing.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.kind, ErrorKind::EndOfStream)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.context == other.context
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorKind> for Box<Error> {
    fn from(kind: ErrorKind) -> Self {
        Box::new(Error::new(kind))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(&**source),
            ErrorKind::Archive { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display context first if present
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        match &self.kind {
            ErrorKind::NotFound { path } => write!(f, "file not found: {}", path),
            ErrorKind::LimitedOrNotFound { path } => {
                write!(f, "file limited or not found: {}", path)
            }
            ErrorKind::InvalidPath { path } => {
                write!(f, "invalid character in file path: {:?}", path)
            }
            ErrorKind::AlreadyClosed => write!(f, "file already closed"),
            ErrorKind::NotADirectory { path } => write!(f, "file is not a directory: {}", path),
            ErrorKind::IsADirectory { path } => write!(f, "file is a directory: {}", path),
            ErrorKind::OutOfRange {
                operation,
                requested,
                length,
                ..
            } => write!(
                f,
                "{} out of range: {} is outside 0..={}",
                operation, requested, length
            ),
            ErrorKind::InvalidSeekWhence { whence } => {
                write!(f, "invalid seek whence: {}", whence)
            }
            ErrorKind::CapabilityNotSupported { backend, operation } => {
                write!(f, "{}: {} not supported", backend, operation)
            }
            ErrorKind::NotImplemented { backend, operation } => {
                write!(f, "{}: {} not implemented", backend, operation)
            }
            ErrorKind::EndOfStream => write!(f, "end of stream"),
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Archive { path, source } => {
                write!(f, "Archive error at {}: {}", path.display(), source)
            }
            ErrorKind::InvalidGlob { pattern, message } => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, message)
            }
            ErrorKind::Config { message } => write!(f, "Invalid configuration: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why use Box<Error> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.

*/

/// Standard result type for pkgfs_base operations.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Extension trait for attaching context to Results.
/// Provides ergonomic error context attachment during error propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    /// Eager evaluation: context is evaluated immediately.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed catch-all error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::error::Error::message(format!($($arg)*)))
    };
}
