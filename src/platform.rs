//! Target platforms.
//!
//! A platform is chosen once, when the build request is validated. Every
//! difference between targets is data on the variant: where its resources
//! live, the object format handed to the converter and the flags given to the
//! linker. Nothing else in the pipeline branches on the platform.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Symbol marking the start of the embedded boot archive.
pub const BOOT_JAR_START: &str = "_binary_boot_jar_start";
/// Symbol marking the end of the embedded boot archive.
pub const BOOT_JAR_END: &str = "_binary_boot_jar_end";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Mac64,
    Linux64,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Mac64, Platform::Linux64];

    /// The platform matching the host, if resources exist for it.
    pub fn host() -> Result<Self> {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "x86_64") => Ok(Self::Mac64),
            ("linux", "x86_64") => Ok(Self::Linux64),
            (os, arch) => Err(Error::invalid(format!(
                "no bundled toolchain for host {os}/{arch}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mac64 => "mac64",
            Self::Linux64 => "linux64",
        }
    }

    /// Sub-directory of the resource bundle holding this platform's tools.
    pub fn resource_dir(&self) -> &'static str {
        self.as_str()
    }

    /// Object format understood by the binary-to-object converter.
    pub fn object_format(&self) -> &'static str {
        match self {
            Self::Mac64 => "macho",
            Self::Linux64 => "elf",
        }
    }

    pub fn architecture(&self) -> &'static str {
        "x86_64"
    }

    pub fn default_linker(&self) -> &'static str {
        "/usr/bin/g++"
    }

    /// Linker arguments, given the staged runtime archive, the patched
    /// bootstrap object, the converted archive object and the output name.
    pub fn link_args(&self, runtime: &str, bootstrap: &str, object: &str, output: &str) -> Vec<String> {
        let mut args: Vec<String> = vec!["-rdynamic".into()];
        match self {
            Self::Mac64 => {
                args.push("-Wl,-all_load".into());
                args.push(runtime.into());
            }
            Self::Linux64 => {
                args.push("-Wl,--whole-archive".into());
                args.push(runtime.into());
                args.push("-Wl,--no-whole-archive".into());
            }
        }
        args.push(bootstrap.into());
        args.push(object.into());
        args.extend(self.system_libs().iter().map(|s| s.to_string()));
        args.push("-o".into());
        args.push(output.into());
        for framework in self.frameworks() {
            args.push("-framework".into());
            args.push((*framework).into());
        }
        args
    }

    fn system_libs(&self) -> &'static [&'static str] {
        match self {
            Self::Mac64 => &["-ldl", "-lpthread", "-lz", "-lobjc"],
            Self::Linux64 => &["-ldl", "-lpthread", "-lz"],
        }
    }

    fn frameworks(&self) -> &'static [&'static str] {
        match self {
            Self::Mac64 => &[
                "CoreFoundation",
                "SystemConfiguration",
                "Security",
                "CoreServices",
                "Cocoa",
            ],
            Self::Linux64 => &[],
        }
    }

    /// Flags for the symbol stripper: drop debug and local symbols.
    pub fn strip_args(&self) -> &'static [&'static str] {
        &["-S", "-x"]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid(format!("unknown platform '{s}'")))
    }
}
