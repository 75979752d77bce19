//! Error types for nativejar.
//!
//! Every failure is fatal to the build that raised it. Nothing is retried:
//! each stage is deterministic given its inputs, so the caller starts over.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for nativejar operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A precondition was violated before any external process started.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A bundled tool, template or archive is missing. This is a packaging defect.
    #[error("Resource '{name}' not found in the {platform} resource bundle")]
    ResourceNotFound { name: String, platform: String },

    /// An external tool exited non-zero. Signal termination is reported as code -1.
    #[error("Subprocess {name} failed with error code {code}")]
    SubprocessFailed { name: String, code: i32 },

    /// An external tool reported success but did not produce its output.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl Error {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}

/// Attach a path to a bare `io::Result`.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
