#![warn(missing_docs)]
//! Capability context for glsc.
//!
//! Every pipeline stage is parameterized by a [`CapabilityContext`]: the
//! shading-language [`Dialect`], the numeric [`Limits`] a shader may not
//! exceed, and the [`Extensions`] the implementation advertises. The context
//! is built once per build and never mutated afterwards.

mod context;
mod kind;
mod version;

pub use context::{CapabilityContext, Dialect, Extensions, Limits};
pub use kind::ShaderKind;
pub use version::Version;
