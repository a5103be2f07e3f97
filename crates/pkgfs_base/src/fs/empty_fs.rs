use tracing::instrument;

use crate::error::{Error, ErrorKind, Result};

use super::file_path::FilePath;
use super::traits::{File, System};

/// Backend with nothing in it.
///
/// Either every name is missing, or every name fails with one fixed error. The
/// second form stands in for a backend whose construction failed, so callers see
/// the construction error on each `open` instead of a half-built namespace.
#[derive(Debug, Clone, Default)]
pub struct EmptySystem {
    error: Option<Box<Error>>,
}

impl EmptySystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that fails every `open` with `error`.
    pub fn with_error(error: Box<Error>) -> Self {
        Self { error: Some(error) }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_deref()
    }
}

impl System for EmptySystem {
    #[instrument(skip(self))]
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let path = FilePath::clean(name)?;
        Err(ErrorKind::NotFound {
            path: path.to_string(),
        }
        .into())
    }

    fn is_not_exist(&self, err: &Error) -> bool {
        self.error.as_deref().is_some_and(|fixed| fixed == err) || err.is_not_exist()
    }
}
