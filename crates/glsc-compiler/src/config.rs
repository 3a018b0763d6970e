//! Build configuration.

use std::path::PathBuf;

use glsc_context::Dialect;

/// Which intermediate forms to print while compiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dumps {
    /// The parsed syntax tree.
    pub ast: bool,
    /// IR right after lowering.
    pub hir: bool,
    /// IR after optimization.
    pub lir: bool,
}

/// Everything a build needs to know, fixed before the first file is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Shader sources, in build order.
    pub inputs: Vec<PathBuf>,
    /// Language profile, selecting the capability context.
    pub dialect: Dialect,
    /// Intermediate forms to print.
    pub dumps: Dumps,
    /// Link the compiled shaders into a program.
    pub link: bool,
    /// Rewrites a single optimization pass may perform.
    pub pass_budget: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            dialect: Dialect::Desktop,
            dumps: Dumps::default(),
            link: false,
            pass_budget: glsc_opt::DEFAULT_PASS_BUDGET,
        }
    }
}

impl BuildConfig {
    /// A configuration compiling `inputs` with default settings.
    pub fn new(inputs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
