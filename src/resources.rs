//! Bundled platform resources and the tools that run from them.
//!
//! The converter, compressor, bootstrap template and runtime archives ship
//! with nativejar. They are never run in place: each build stages a private
//! copy into its workspace, restoring the executable bit where needed.
//!
//! Bundle layout:
//!
//! ```text
//! <root>/
//! ├── common/          runtime-stdlib.jar, vm.pro, openjdk.pro, proguard.jar
//! ├── mac64/           bin-to-obj, lzma, bootstrap.o, libavian.a
//! └── linux64/         bin-to-obj, lzma, bootstrap.o, libavian.a
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, IoContext, Result};
use crate::platform::Platform;
use crate::process::{self, Cmd};
use crate::workspace::Workspace;

pub const BIN_TO_OBJ: &str = "bin-to-obj";
pub const COMPRESSOR: &str = "lzma";
pub const BOOTSTRAP_OBJECT: &str = "bootstrap.o";
pub const RUNTIME_ARCHIVE: &str = "libavian.a";
pub const RUNTIME_IMAGE: &str = "runtime-stdlib.jar";
pub const VM_RULES: &str = "vm.pro";
pub const STDLIB_RULES: &str = "openjdk.pro";

/// Sub-directory for resources shared by all platforms.
pub const COMMON_DIR: &str = "common";

/// Read-only store of named resources for one platform.
pub trait ResourceBundle {
    fn platform(&self) -> Platform;

    /// Open a resource for reading.
    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>>;

    fn contains(&self, name: &str) -> bool;

    fn read_to_string(&self, name: &str) -> Result<String> {
        let mut text = String::new();
        self.open(name)?
            .read_to_string(&mut text)
            .map_err(|e| Error::io(name, e))?;
        Ok(text)
    }

    fn not_found(&self, name: &str) -> Error {
        Error::ResourceNotFound {
            name: name.to_string(),
            platform: self.platform().to_string(),
        }
    }
}

/// Resources installed on disk.
#[derive(Debug, Clone)]
pub struct DirBundle {
    root: PathBuf,
    platform: Platform,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    /// Platform directory first, then the shared one.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        [self.platform.resource_dir(), COMMON_DIR]
            .iter()
            .map(|dir| self.root.join(dir).join(name))
            .find(|p| p.is_file())
    }
}

impl ResourceBundle for DirBundle {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>> {
        let path = self.locate(name).ok_or_else(|| self.not_found(name))?;
        Ok(Box::new(File::open(&path).at(&path)?))
    }

    fn contains(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }
}

/// Resources held in memory, e.g. compiled into the calling binary.
#[derive(Debug, Clone)]
pub struct MemoryBundle {
    platform: Platform,
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryBundle {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl ResourceBundle for MemoryBundle {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>> {
        let bytes = self.entries.get(name).ok_or_else(|| self.not_found(name))?;
        Ok(Box::new(bytes.as_slice()))
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Copy a resource byte-for-byte into the workspace under its base name.
pub fn stage(
    bundle: &dyn ResourceBundle,
    workspace: &Workspace,
    name: &str,
    executable: bool,
) -> Result<PathBuf> {
    let base = Path::new(name)
        .file_name()
        .ok_or_else(|| Error::invalid(format!("resource name '{name}' has no file name")))?;
    let dest = workspace.join(base);

    let mut input = bundle.open(name)?;
    let mut output = File::create(&dest).at(&dest)?;
    let bytes = io::copy(&mut input, &mut output).at(&dest)?;
    drop(output);

    if executable {
        process::make_executable(&dest)?;
    }
    debug!(resource = name, bytes, dest = %dest.display(), "staged resource");
    Ok(dest)
}

/// Stages bundled tools into one workspace and runs them there.
pub struct ToolRunner<'a> {
    bundle: &'a dyn ResourceBundle,
    workspace: &'a Workspace,
}

impl<'a> ToolRunner<'a> {
    pub fn new(bundle: &'a dyn ResourceBundle, workspace: &'a Workspace) -> Self {
        Self { bundle, workspace }
    }

    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }

    /// Stage a resource that is data rather than a program.
    pub fn stage_file(&self, name: &str) -> Result<PathBuf> {
        stage(self.bundle, self.workspace, name, false)
    }

    /// Stage a bundled tool and run it with the workspace as its directory.
    pub fn stage_and_run<I, S>(&self, name: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tool = stage(self.bundle, self.workspace, name, true)?;
        Cmd::new(&tool).dir(self.workspace.path()).args(args).run()
    }

    /// Run a host program (not from the bundle) in the workspace.
    pub fn run_host<I, S>(&self, program: &Path, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        process::run_in(self.workspace.path(), program, args)
    }
}
