//! nativejar library exports.
//!
//! Turns a classpath of JARs and class directories into one native
//! executable: the classes are merged with a runtime image, optionally
//! shrunk and compressed, converted to a linkable object, and linked against
//! a bootstrap object patched with the entry point.
//!
//! The pieces with real logic live here so integration tests can drive them:
//! - [`editor`] - length-preserving streaming byte editor
//! - [`process`] - external tool execution
//! - [`resources`] - bundled tools staged into a build workspace
//! - [`pipeline`] - the staged build itself

pub mod archive;
pub mod config;
pub mod editor;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod resources;
pub mod shrink;
pub mod timing;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{BuildReport, BuildRequest, Pipeline, Stage};
pub use platform::Platform;
