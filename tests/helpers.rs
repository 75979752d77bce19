//! Shared test utilities for nativejar tests.
//!
//! External tools are replaced by small shell scripts. Scripts that would be
//! bundled go into a [`MemoryBundle`]; host tools (linker, strip, java) are
//! written to a tools directory and referenced from the [`Config`].

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nativejar::editor::SENTINEL;
use nativejar::pipeline::bootstrap::SLOT_LEN;
use nativejar::resources::{
    MemoryBundle, BIN_TO_OBJ, BOOTSTRAP_OBJECT, COMPRESSOR, RUNTIME_ARCHIVE, RUNTIME_IMAGE,
    STDLIB_RULES, VM_RULES,
};
use nativejar::{Config, Platform};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const PLATFORM: Platform = Platform::Linux64;

pub const FAILING_TOOL: &str = "#!/bin/sh\nexit 3\n";

pub const BIN_TO_OBJ_SCRIPT: &str = "#!/bin/sh\n\
echo \"$3 $4 $5 $6\" > bin-to-obj.args\n\
cp \"$1\" \"$2\"\n";

pub const LZMA_SCRIPT: &str = "#!/bin/sh\n\
[ \"$1\" = encode ] || exit 9\n\
cp \"$2\" \"$3\"\n";

pub const LINKER_SCRIPT: &str = "#!/bin/sh\n\
echo \"$@\" > link.args\n\
out=\n\
while [ $# -gt 0 ]; do\n\
  if [ \"$1\" = -o ]; then shift; out=\"$1\"; fi\n\
  shift\n\
done\n\
cat bootstrap.o uber.jar.o > \"$out\"\n";

pub const STRIP_SCRIPT: &str = "#!/bin/sh\necho \"$@\" > strip.args\n";

pub const JAVA_SCRIPT: &str = "#!/bin/sh\n\
echo \"shrinking with $*\"\n\
cp uber-preopt.jar uber.jar\n";

/// Test environment with a work root, host tools and input files.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Parent of build workspaces
    pub work_root: PathBuf,
    /// Host tool stand-ins
    pub tools: PathBuf,
    /// Application inputs
    pub inputs: PathBuf,
    /// Where the executable is emitted
    pub output: PathBuf,
    pub config: Config,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let work_root = base.join("work");
        let tools = base.join("tools");
        let inputs = base.join("inputs");
        for dir in [&work_root, &tools, &inputs] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        write_script(&tools.join("g++"), LINKER_SCRIPT);
        write_script(&tools.join("strip"), STRIP_SCRIPT);
        write_script(&tools.join("java"), JAVA_SCRIPT);

        let config = Config {
            resources: base.join("resources"),
            linker: Some(tools.join("g++")),
            strip: tools.join("strip"),
            java: Some(tools.join("java")),
            shrinker_jar: base.join("resources/common/proguard.jar"),
            work_root: work_root.clone(),
        };

        Self {
            output: base.join("out/app"),
            _temp_dir: temp_dir,
            work_root,
            tools,
            inputs,
            config,
        }
    }

    /// Write an application jar into the inputs directory.
    pub fn app_jar(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.inputs.join(name);
        fs::write(&path, jar(entries)).expect("Failed to write jar");
        path
    }

    /// Replace a host tool stand-in.
    pub fn host_tool(&self, name: &str, body: &str) {
        write_script(&self.tools.join(name), body);
    }

    /// Workspaces currently present under the work root.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        fs::read_dir(&self.work_root)
            .expect("Failed to list work root")
            .map(|e| e.expect("Failed to read entry").path())
            .collect()
    }

    /// The single retained workspace.
    pub fn workspace(&self) -> PathBuf {
        let mut all = self.workspaces();
        assert_eq!(all.len(), 1, "expected exactly one workspace: {all:?}");
        all.remove(0)
    }
}

/// Resources for a successful build.
pub fn bundle() -> MemoryBundle {
    MemoryBundle::new(PLATFORM)
        .with(RUNTIME_IMAGE, jar(&[("java/lang/Object.class", b"object")]))
        .with(BIN_TO_OBJ, BIN_TO_OBJ_SCRIPT)
        .with(COMPRESSOR, LZMA_SCRIPT)
        .with(BOOTSTRAP_OBJECT, bootstrap_template())
        .with(RUNTIME_ARCHIVE, b"!<arch>\n".to_vec())
        .with(VM_RULES, "-keep class avian.** { *; }\n")
        .with(STDLIB_RULES, "-keep class java.lang.Object\n")
}

/// A fake object file with a metadata slot after a short header.
pub fn bootstrap_template() -> Vec<u8> {
    let mut bytes = b"\x7fELF-header-".to_vec();
    bytes.extend(std::iter::repeat(SENTINEL).take(SLOT_LEN));
    bytes.extend_from_slice(b"-trailer");
    bytes
}

pub fn jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        w.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        w.write_all(data).expect("Failed to write entry");
    }
    w.finish().expect("Failed to finish jar").into_inner()
}

/// A jar written forward-only, the way `jar` and `JarOutputStream` do it:
/// entry sizes follow the data in a descriptor instead of the local header.
pub fn streamed_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = ZipWriter::new_stream(Vec::new());
    for (name, data) in entries {
        w.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        w.write_all(data).expect("Failed to write entry");
    }
    w.finish().expect("Failed to finish jar").into_inner()
}

/// Create an executable shell script.
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");
}

/// Position of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

/// Assert that a file does not exist.
pub fn assert_file_absent(path: &Path) {
    assert!(!path.exists(), "Expected no file at: {}", path.display());
}
