//! Centralized external command execution.
//!
//! Every external tool the pipeline drives goes through [`Cmd`]. Output is
//! meant for a human, so the child inherits the caller's standard streams
//! unless a stream is explicitly redirected to a file. The call blocks until
//! the child exits; a non-zero exit becomes [`Error::SubprocessFailed`].
//! Tools are deterministic given their inputs, so nothing here retries.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{Error, IoContext, Result};

/// Builder for configuring command execution.
pub struct Cmd {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdout: Option<File>,
    stderr: Option<File>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            current_dir: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Send the child's stdout to a file instead of the terminal.
    pub fn stdout_to(mut self, file: File) -> Self {
        self.stdout = Some(file);
        self
    }

    /// Send the child's stderr to a file instead of the terminal.
    pub fn stderr_to(mut self, file: File) -> Self {
        self.stderr = Some(file);
        self
    }

    /// Short name used in failure reports.
    fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Run the command to completion.
    pub fn run(self) -> Result<()> {
        if let Some(ref dir) = self.current_dir {
            ensure_owner_executable(dir, &self.program)?;
        }

        let name = self.display_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(self.stdout.map(Stdio::from).unwrap_or_else(Stdio::inherit));
        cmd.stderr(self.stderr.map(Stdio::from).unwrap_or_else(Stdio::inherit));

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program.display(), args = ?self.args, "running");
        let status = cmd.status().at(&self.program)?;
        check_status(&name, status)
    }
}

fn check_status(name: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(Error::SubprocessFailed {
        name: name.to_string(),
        code: status.code().unwrap_or(-1),
    })
}

/// Grant owner rwx on `program` if it lives under `working_dir` and is not
/// already owner-executable. Files elsewhere are left alone.
pub fn ensure_owner_executable(working_dir: &Path, program: &Path) -> Result<()> {
    let candidate = working_dir.join(program);
    if !candidate.starts_with(working_dir) || !candidate.is_file() {
        return Ok(());
    }
    make_executable(&candidate)
}

/// Set owner read/write/execute on `path` unless owner-execute is already set.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path).at(path)?.permissions().mode();
    if mode & 0o100 != 0 {
        return Ok(());
    }
    set_mode(path, 0o700)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Apply POSIX permission bits. Filesystems that cannot represent them are
/// skipped; any other failure is returned.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::Unsupported => {
            debug!(path = %path.display(), "permission change unsupported, skipping");
            Ok(())
        }
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Run `argv[0]` with the rest of `argv` as arguments inside `working_dir`.
pub fn run_in<I, S>(working_dir: &Path, program: impl AsRef<Path>, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Cmd::new(program).dir(working_dir).args(args).run()
}

/// Locate a program on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

// =============================================================================
// Tests
// =============================================================================
