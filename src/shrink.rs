//! Dead-code elimination through an external bytecode shrinker.
//!
//! The shrinker has no logging facility of its own, so its diagnostics are
//! handed explicit file sinks in the workspace instead of sharing the
//! pipeline's terminal output.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IoContext, Result};
use crate::process::Cmd;

pub const INFO_LOG: &str = "proguard-info.log";
pub const WARNINGS_LOG: &str = "proguard-warnings.log";
pub const CONFIG_FILE: &str = "proguard.conf";

/// One shrink invocation.
#[derive(Debug, Clone)]
pub struct ShrinkJob {
    /// Directory the shrinker runs in; paths in `config` are relative to it.
    pub working_dir: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Entry point whose launch method must be kept.
    pub keep_symbol: String,
    /// Complete textual configuration.
    pub config: String,
}

/// Where shrinker diagnostics go.
#[derive(Debug)]
pub struct ShrinkLogs {
    pub info: File,
    pub warnings: File,
}

impl ShrinkLogs {
    /// Create the log files inside `dir`.
    pub fn create_in(dir: &Path) -> Result<Self> {
        let info = dir.join(INFO_LOG);
        let warnings = dir.join(WARNINGS_LOG);
        Ok(Self {
            info: File::create(&info).at(&info)?,
            warnings: File::create(&warnings).at(&warnings)?,
        })
    }
}

pub trait Shrinker {
    fn shrink(&self, job: &ShrinkJob, logs: ShrinkLogs) -> Result<()>;
}

/// Build the shrinker configuration for an entry point.
///
/// `rule_sets` are appended verbatim after the generated directives.
pub fn shrink_config(input_name: &str, output_name: &str, entry_point: &str, rule_sets: &[&str]) -> String {
    let mut config = format!(
        "-ignorewarnings\n\
         -dontusemixedcaseclassnames\n\
         -dontoptimize\n\
         -dontobfuscate\n\
         -injars {input_name}\n\
         -outjars {output_name}\n\
         -keep class {entry_point} {{ public static void main(java.lang.String[]); }}\n\n"
    );
    for rules in rule_sets {
        config.push_str(rules);
        if !rules.ends_with('\n') {
            config.push('\n');
        }
    }
    config
}

/// ProGuard run as `<java> -jar <proguard.jar> @proguard.conf`.
#[derive(Debug, Clone)]
pub struct ProguardShrinker {
    java: PathBuf,
    jar: PathBuf,
}

impl ProguardShrinker {
    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }
}

impl Shrinker for ProguardShrinker {
    fn shrink(&self, job: &ShrinkJob, logs: ShrinkLogs) -> Result<()> {
        let config_path = job.working_dir.join(CONFIG_FILE);
        std::fs::write(&config_path, &job.config).at(&config_path)?;
        info!(keep = %job.keep_symbol, input = %job.input.display(), "running shrinker");

        Cmd::new(&self.java)
            .arg("-jar")
            .arg_path(&self.jar)
            .arg(format!("@{CONFIG_FILE}"))
            .dir(&job.working_dir)
            .stdout_to(logs.info)
            .stderr_to(logs.warnings)
            .run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_keeps_entry_point() {
        let config = shrink_config("uber-preopt.jar", "uber.jar", "com.example.Main", &["-keep class vm.**", "# jdk\n"]);
        assert!(config.starts_with("-ignorewarnings\n"));
        assert!(config.contains("-dontobfuscate\n"));
        assert!(config.contains("-injars uber-preopt.jar\n"));
        assert!(config.contains("-outjars uber.jar\n"));
        assert!(config.contains(
            "-keep class com.example.Main { public static void main(java.lang.String[]); }"
        ));
        assert!(config.ends_with("-keep class vm.**\n# jdk\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_diagnostics_go_to_log_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let java = dir.path().join("java");
        std::fs::write(
            &java,
            "#!/bin/sh\necho \"args: $*\"\necho 'Note: something' 1>&2\ncp uber-preopt.jar uber.jar\n",
        )
        .unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("uber-preopt.jar"), b"PK").unwrap();

        let job = ShrinkJob {
            working_dir: dir.path().to_path_buf(),
            input: dir.path().join("uber-preopt.jar"),
            output: dir.path().join("uber.jar"),
            keep_symbol: "Main".to_string(),
            config: shrink_config("uber-preopt.jar", "uber.jar", "Main", &[]),
        };
        let shrinker = ProguardShrinker::new(&java, "/opt/proguard.jar");
        shrinker.shrink(&job, ShrinkLogs::create_in(dir.path()).unwrap()).unwrap();

        let info = std::fs::read_to_string(dir.path().join(INFO_LOG)).unwrap();
        assert_eq!(info, "args: -jar /opt/proguard.jar @proguard.conf\n");
        let warnings = std::fs::read_to_string(dir.path().join(WARNINGS_LOG)).unwrap();
        assert_eq!(warnings, "Note: something\n");
        assert!(dir.path().join(CONFIG_FILE).exists());
        assert!(job.output.exists());
    }
}
