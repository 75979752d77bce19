//! What to build.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::pipeline::bootstrap::{MAX_ENTRY_POINT_LEN, SLOT_LEN};
use crate::pipeline::Stage;
use crate::platform::Platform;

/// A single build. Not modified once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Archives and class directories, in classpath order.
    pub inputs: Vec<PathBuf>,
    /// Class holding the launch method, e.g. `com.example.Main`.
    pub entry_point: String,
    /// Where the finished executable is written.
    pub output: PathBuf,
    pub shrink: bool,
    pub compress: bool,
    pub platform: Platform,
    /// Keep the workspace after the build instead of deleting it.
    pub keep_workspace: bool,
}

impl BuildRequest {
    /// A request with shrinking on and compression off.
    pub fn new(
        inputs: Vec<PathBuf>,
        entry_point: impl Into<String>,
        output: impl Into<PathBuf>,
        platform: Platform,
    ) -> Self {
        Self {
            inputs,
            entry_point: entry_point.into(),
            output: output.into(),
            shrink: true,
            compress: false,
            platform,
            keep_workspace: false,
        }
    }

    pub fn shrink(mut self, enabled: bool) -> Self {
        self.shrink = enabled;
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    /// Check every precondition that can be checked before the first stage.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::invalid("no input archives or directories given"));
        }
        if self.entry_point.is_empty() {
            return Err(Error::invalid("entry point class name is empty"));
        }
        if self.entry_point.len() > MAX_ENTRY_POINT_LEN {
            return Err(Error::invalid(format!(
                "Main class name is too long, cannot be more than {} characters",
                SLOT_LEN - 2
            )));
        }
        if self.entry_point.bytes().any(|b| b == 0) {
            return Err(Error::invalid("entry point class name contains a NUL byte"));
        }
        if self.output.is_dir() {
            return Err(Error::invalid(format!(
                "The output path must be a file name, not a directory: {}",
                self.output.display()
            )));
        }
        Ok(())
    }

    /// The stages this request runs, in order. Depends only on the flags.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| match stage {
                Stage::Shrink => self.shrink,
                Stage::Compress => self.compress,
                _ => true,
            })
            .collect()
    }

    /// Dotted form used by the shrinker keep rule.
    pub fn class_name(&self) -> String {
        self.entry_point.replace('/', ".")
    }

    /// Slash-separated form the bootstrap code looks up at startup.
    pub fn internal_name(&self) -> String {
        self.entry_point.replace('.', "/")
    }
}
