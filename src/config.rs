//! Configuration management for nativejar.
//!
//! Reads configuration from environment variables. The binary loads an
//! optional `.env` file first, so real environment variables take precedence.

use std::path::{Path, PathBuf};

use crate::platform::Platform;
use crate::process;

pub const ENV_RESOURCES: &str = "NATIVEJAR_RESOURCES";
pub const ENV_LINKER: &str = "NATIVEJAR_LINKER";
pub const ENV_STRIP: &str = "NATIVEJAR_STRIP";
pub const ENV_JAVA: &str = "NATIVEJAR_JAVA";
pub const ENV_SHRINKER_JAR: &str = "NATIVEJAR_SHRINKER_JAR";
pub const ENV_WORK_ROOT: &str = "NATIVEJAR_WORK_ROOT";

pub const DEFAULT_STRIP: &str = "/usr/bin/strip";
pub const SHRINKER_JAR_NAME: &str = "proguard.jar";

/// Host tool locations and directories.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the bundled resource tree.
    pub resources: PathBuf,
    /// Linker driver; `None` means the platform default.
    pub linker: Option<PathBuf>,
    pub strip: PathBuf,
    /// JVM launcher for the shrinker; `None` if none was found.
    pub java: Option<PathBuf>,
    pub shrinker_jar: PathBuf,
    /// Parent directory for build workspaces.
    pub work_root: PathBuf,
}

impl Config {
    /// Load configuration from the environment, with defaults.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| get(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let resources = path(ENV_RESOURCES).unwrap_or_else(default_resource_dir);
        let shrinker_jar = path(ENV_SHRINKER_JAR)
            .unwrap_or_else(|| resources.join(crate::resources::COMMON_DIR).join(SHRINKER_JAR_NAME));

        Self {
            linker: path(ENV_LINKER),
            strip: path(ENV_STRIP).unwrap_or_else(|| PathBuf::from(DEFAULT_STRIP)),
            java: path(ENV_JAVA).or_else(|| process::which("java")),
            shrinker_jar,
            work_root: path(ENV_WORK_ROOT).unwrap_or_else(std::env::temp_dir),
            resources,
        }
    }

    /// The linker to use for `platform`.
    pub fn linker_for(&self, platform: Platform) -> PathBuf {
        self.linker
            .clone()
            .unwrap_or_else(|| PathBuf::from(platform.default_linker()))
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  {ENV_RESOURCES}: {}", self.resources.display());
        match &self.linker {
            Some(l) => println!("  {ENV_LINKER}: {}", l.display()),
            None => println!("  {ENV_LINKER}: (platform default)"),
        }
        println!("  {ENV_STRIP}: {}", self.strip.display());
        match &self.java {
            Some(j) => println!("  {ENV_JAVA}: {}", j.display()),
            None => println!("  {ENV_JAVA}: NOT FOUND (shrinking unavailable)"),
        }
        println!("  {ENV_SHRINKER_JAR}: {}", self.shrinker_jar.display());
        println!("  {ENV_WORK_ROOT}: {}", self.work_root.display());
        if self.resources.is_dir() {
            println!("  Resources: FOUND");
        } else {
            println!("  Resources: NOT FOUND");
        }
    }
}

/// `<exe dir>/../share/nativejar` when installed, else the user data dir.
fn default_resource_dir() -> PathBuf {
    let installed = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .map(|prefix| prefix.join("share").join("nativejar"));
    match installed {
        Some(dir) if dir.is_dir() => dir,
        _ => dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("nativejar"),
    }
}
