//! Per-build scratch directory.
//!
//! Each build gets its own freshly created directory. It is removed when the
//! [`Workspace`] is dropped, whether the build succeeded or failed, unless the
//! caller asked for it to be retained for inspection.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{IoContext, Result};

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    retain: bool,
}

impl Workspace {
    /// Create a new, empty workspace under `parent_dir`.
    ///
    /// The directory name is unique, so concurrent builds sharing a parent
    /// never see each other's files.
    pub fn create(parent_dir: &Path, retain: bool) -> Result<Self> {
        std::fs::create_dir_all(parent_dir).at(parent_dir)?;
        let mut dir = tempfile::Builder::new()
            .prefix("nativejar-")
            .tempdir_in(parent_dir)
            .at(parent_dir)?;
        dir.disable_cleanup(retain);
        let root = dir.path().to_path_buf();
        debug!(path = %root.display(), retain, "created workspace");
        Ok(Self {
            dir: Some(dir),
            root,
            retain,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Retained directories have cleanup disabled and survive the TempDir.
        if self.retain {
            return;
        }
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.root.display(), error = %e, "failed to remove workspace");
            }
        }
    }
}
