//! Module-scope variables.

use std::fmt;

use crate::arena::Handle;
use crate::expr::Expression;
use crate::types::Type;

/// Where a module-scope variable lives.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum AddressSpace {
    /// Plain global, private to one invocation.
    Private,
    /// Stage input: `attribute`, or `varying`/`in` in consuming stages.
    Input,
    /// Stage output: `varying`/`out` in producing stages.
    Output,
    /// `uniform`.
    Uniform,
    /// `const`, initialized at compile time.
    Constant,
}

impl AddressSpace {
    /// Returns `true` if shaders may not store to variables of this space.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Input | Self::Uniform | Self::Constant)
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Private => "private",
            Self::Input => "in",
            Self::Output => "out",
            Self::Uniform => "uniform",
            Self::Constant => "const",
        })
    }
}

/// A module-scope variable.
#[derive(Clone, Debug)]
pub struct GlobalVariable {
    /// Source name.
    pub name: String,
    /// Variable type.
    pub ty: Handle<Type>,
    /// Storage class.
    pub space: AddressSpace,
    /// Initializer in [`Module::global_expressions`](crate::Module::global_expressions).
    pub init: Option<Handle<Expression>>,
    /// `true` for `gl_*` variables provided by the implementation.
    pub builtin: bool,
    /// `invariant` qualifier.
    pub invariant: bool,
}

impl GlobalVariable {
    /// A user-declared variable without initializer.
    pub fn new(name: impl Into<String>, ty: Handle<Type>, space: AddressSpace) -> Self {
        Self {
            name: name.into(),
            ty,
            space,
            init: None,
            builtin: false,
            invariant: false,
        }
    }
}
