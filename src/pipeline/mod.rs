//! Build pipeline orchestrator.
//!
//! Stages run strictly in order, each only after the previous one returned
//! and its output file was confirmed to exist:
//!
//! ```text
//! Merge ─▶ [Shrink] ─▶ [Compress] ─▶ ConvertToObject ─▶ PatchBootstrap ─▶ Link
//! ```
//!
//! The bracketed stages are selected once from the request flags. The first
//! failing stage aborts the build and its error is returned unchanged. All
//! intermediate files live in a workspace owned by this build alone.

pub mod bootstrap;
pub mod request;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use request::BuildRequest;

use crate::archive;
use crate::config::Config;
use crate::error::{Error, IoContext, Result};
use crate::platform::{Platform, BOOT_JAR_END, BOOT_JAR_START};
use crate::resources::{
    ResourceBundle, ToolRunner, BIN_TO_OBJ, BOOTSTRAP_OBJECT, COMPRESSOR, RUNTIME_ARCHIVE,
    RUNTIME_IMAGE, STDLIB_RULES, VM_RULES,
};
use crate::shrink::{self, ShrinkJob, ShrinkLogs, Shrinker};
use crate::timing::{step, Timer};
use crate::workspace::Workspace;

pub const UBER_ARCHIVE: &str = "uber.jar";
pub const PREOPT_ARCHIVE: &str = "uber-preopt.jar";
pub const COMPRESSED_ARCHIVE: &str = "uber.jar.lzma";
pub const ARCHIVE_OBJECT: &str = "uber.jar.o";
pub const LINKED_BINARY: &str = "app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Merge,
    Shrink,
    Compress,
    ConvertToObject,
    PatchBootstrap,
    Link,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Merge,
        Stage::Shrink,
        Stage::Compress,
        Stage::ConvertToObject,
        Stage::PatchBootstrap,
        Stage::Link,
    ];

    /// Progress line shown when the stage starts.
    pub fn describe(&self) -> &'static str {
        match self {
            Stage::Merge => "Generating application archive",
            Stage::Shrink => "Scanning for and eliminating dead code",
            Stage::Compress => "Compressing code",
            Stage::ConvertToObject => "Converting archive to native object file",
            Stage::PatchBootstrap => "Creating bootstrap code",
            Stage::Link => "Linking executable",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The executable, at the requested output path.
    pub artifact: PathBuf,
    /// Stages that ran, in order.
    pub stages: Vec<Stage>,
    /// Workspace location, if it was retained.
    pub workspace: Option<PathBuf>,
}

/// Drives one build at a time against a resource bundle.
pub struct Pipeline<'a> {
    linker: PathBuf,
    strip: PathBuf,
    work_root: PathBuf,
    bundle: &'a dyn ResourceBundle,
    shrinker: Option<&'a dyn Shrinker>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &Config, bundle: &'a dyn ResourceBundle) -> Self {
        Self {
            linker: config.linker_for(bundle.platform()),
            strip: config.strip.clone(),
            work_root: config.work_root.clone(),
            bundle,
            shrinker: None,
        }
    }

    pub fn with_shrinker(mut self, shrinker: &'a dyn Shrinker) -> Self {
        self.shrinker = Some(shrinker);
        self
    }

    /// Run every stage the request selects and emit the executable.
    pub fn run(&self, request: &BuildRequest) -> Result<BuildReport> {
        self.check(request)?;

        let workspace = Workspace::create(&self.work_root, request.keep_workspace)?;
        if workspace.is_retained() {
            println!(
                "Temporary working files can be found in {}",
                workspace.path().display()
            );
        }
        let tools = ToolRunner::new(self.bundle, &workspace);

        let mut archive = workspace.join(UBER_ARCHIVE);
        let mut ran = Vec::new();
        for stage in request.stages() {
            step(stage.describe());
            let timer = Timer::start(&stage.to_string());
            match stage {
                Stage::Merge => self.merge(request, &tools)?,
                Stage::Shrink => self.shrink(request, &tools)?,
                Stage::Compress => archive = self.compress(&tools)?,
                Stage::ConvertToObject => self.convert(request.platform, &tools, &archive)?,
                Stage::PatchBootstrap => self.patch_bootstrap(request, &tools)?,
                Stage::Link => self.link(request.platform, &tools)?,
            }
            timer.finish();
            ran.push(stage);
        }

        let artifact = emit(&workspace.join(LINKED_BINARY), &request.output)?;
        Ok(BuildReport {
            artifact,
            stages: ran,
            workspace: workspace.is_retained().then(|| workspace.path().to_path_buf()),
        })
    }

    /// Preconditions checked before any stage or workspace exists.
    fn check(&self, request: &BuildRequest) -> Result<()> {
        request.validate()?;
        if self.bundle.platform() != request.platform {
            return Err(Error::invalid(format!(
                "requested platform {} but resources are for {}",
                request.platform,
                self.bundle.platform()
            )));
        }
        if request.shrink && self.shrinker.is_none() {
            return Err(Error::invalid(
                "dead code elimination requested but no shrinker is available",
            ));
        }
        if let Some(name) = required_resources(request)
            .into_iter()
            .find(|name| !self.bundle.contains(name))
        {
            return Err(self.bundle.not_found(name));
        }
        Ok(())
    }

    fn merge(&self, request: &BuildRequest, tools: &ToolRunner) -> Result<()> {
        let out_path = tools.workspace().join(UBER_ARCHIVE);
        let runtime_path = tools.stage_file(RUNTIME_IMAGE)?;
        let runtime = File::open(&runtime_path).at(&runtime_path)?;
        let out = File::create(&out_path).at(&out_path)?;
        let summary = archive::merge(
            &request.inputs,
            [BufReader::new(runtime)],
            BufWriter::new(out),
        )?;
        info!(
            entries = summary.entries,
            skipped = summary.skipped.len(),
            duplicates = summary.duplicates,
            "merged uber-archive"
        );
        require_output(&out_path, "archive merge")
    }

    fn shrink(&self, request: &BuildRequest, tools: &ToolRunner) -> Result<()> {
        let shrinker = self
            .shrinker
            .ok_or_else(|| Error::invalid("no shrinker available"))?;
        let ws = tools.workspace();
        let input = ws.join(PREOPT_ARCHIVE);
        let output = ws.join(UBER_ARCHIVE);
        std::fs::rename(&output, &input).at(&output)?;

        let vm_rules = self.bundle.read_to_string(VM_RULES)?;
        let stdlib_rules = self.bundle.read_to_string(STDLIB_RULES)?;
        let class_name = request.class_name();
        let job = ShrinkJob {
            working_dir: ws.path().to_path_buf(),
            input,
            output: output.clone(),
            config: shrink::shrink_config(
                PREOPT_ARCHIVE,
                UBER_ARCHIVE,
                &class_name,
                &[vm_rules.as_str(), stdlib_rules.as_str()],
            ),
            keep_symbol: class_name,
        };
        shrinker.shrink(&job, ShrinkLogs::create_in(ws.path())?)?;
        require_output(&output, "shrinker")
    }

    /// Returns the archive later stages must reference.
    fn compress(&self, tools: &ToolRunner) -> Result<PathBuf> {
        tools.stage_and_run(COMPRESSOR, ["encode", UBER_ARCHIVE, COMPRESSED_ARCHIVE])?;
        let compressed = tools.workspace().join(COMPRESSED_ARCHIVE);
        require_output(&compressed, COMPRESSOR)?;
        Ok(compressed)
    }

    fn convert(&self, platform: Platform, tools: &ToolRunner, archive: &Path) -> Result<()> {
        let object = tools.workspace().join(ARCHIVE_OBJECT);
        let input_arg = archive.to_string_lossy().into_owned();
        let output_arg = object.to_string_lossy().into_owned();
        tools.stage_and_run(
            BIN_TO_OBJ,
            [
                input_arg.as_str(),
                output_arg.as_str(),
                BOOT_JAR_START,
                BOOT_JAR_END,
                platform.object_format(),
                platform.architecture(),
            ],
        )?;
        require_output(&object, BIN_TO_OBJ)
    }

    fn patch_bootstrap(&self, request: &BuildRequest, tools: &ToolRunner) -> Result<()> {
        let block = bootstrap::metadata_block(request.compress, &request.internal_name())?;
        let template = self.bundle.open(BOOTSTRAP_OBJECT)?;
        let out_path = tools.workspace().join(BOOTSTRAP_OBJECT);
        let out = File::create(&out_path).at(&out_path)?;
        let summary = bootstrap::patch(template, out, block)?;
        debug!(bytes = summary.bytes, slot = ?summary.substituted_at, "patched bootstrap");
        require_output(&out_path, "bootstrap patch")
    }

    fn link(&self, platform: Platform, tools: &ToolRunner) -> Result<()> {
        let runtime = tools.stage_file(RUNTIME_ARCHIVE)?;
        let args = platform.link_args(
            &runtime.to_string_lossy(),
            BOOTSTRAP_OBJECT,
            ARCHIVE_OBJECT,
            LINKED_BINARY,
        );
        tools.run_host(&self.linker, &args)?;
        let binary = tools.workspace().join(LINKED_BINARY);
        require_output(&binary, "linker")?;

        let strip_args = platform
            .strip_args()
            .iter()
            .copied()
            .chain([LINKED_BINARY]);
        tools.run_host(&self.strip, strip_args)?;
        require_output(&binary, "strip")
    }
}

/// Resources the selected stages will open, in the order they are used.
fn required_resources(request: &BuildRequest) -> Vec<&'static str> {
    let mut names = vec![RUNTIME_IMAGE];
    if request.shrink {
        names.extend([VM_RULES, STDLIB_RULES]);
    }
    if request.compress {
        names.push(COMPRESSOR);
    }
    names.extend([BIN_TO_OBJ, BOOTSTRAP_OBJECT, RUNTIME_ARCHIVE]);
    names
}

/// A tool that exited cleanly must have produced its documented output.
fn require_output(path: &Path, producer: &str) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(Error::InvariantViolation(format!(
        "{producer} succeeded but {} does not exist",
        path.display()
    )))
}

fn emit(binary: &Path, output: &Path) -> Result<PathBuf> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).at(parent)?;
    }
    std::fs::copy(binary, output).at(output)?;
    Ok(output.to_path_buf())
}
