//! Shader build orchestration for glsc.
//!
//! This crate sequences the compilation of shader files and owns the state
//! machine around it. The stage algorithms themselves are reached only
//! through the [`Toolchain`] trait; [`GlslToolchain`] plugs in the reference
//! front end, optimizer, and linker.
//!
//! - [`SourceLoader`] reads a file into an owned [`SourceBuffer`].
//! - [`ShaderUnit`] runs one source through preprocess, parse, lower, and
//!   optimize, exactly once.
//! - [`optimize`] drives the optimization passes to a fixed point.
//! - [`Program`] owns compiled units and links them.
//! - [`build`] ties it together for a [`BuildConfig`], the way the `glsc`
//!   binary uses it.

pub mod build;
pub mod config;
pub mod error;
pub mod loader;
pub mod optimize;
pub mod program;
pub mod stages;
pub mod unit;

pub use build::{build, shader_kind};
pub use config::{BuildConfig, Dumps};
pub use error::{BuildError, CompileError, LinkError, LoadError, UsageError};
pub use glsc_opt::DEFAULT_PASS_BUDGET;
pub use loader::{FsLoader, SourceBuffer, SourceLoader};
pub use optimize::{OptimizeSummary, optimize};
pub use program::{LinkStatus, Program};
pub use stages::{GlslToolchain, Preprocessed, Toolchain};
pub use unit::{CompileOptions, CompileStatus, MAX_BUILTIN_REFS, ShaderUnit};
