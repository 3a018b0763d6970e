//! glsc intermediate representation.
//!
//! An arena-based, tree-structured IR for one shader. A lowered shader is a
//! [`Module`]; the module owns every node, so handing a module to another
//! owner transfers the whole artifact at once.

pub mod arena;
mod diag;
mod display;
mod error;
mod expr;
mod func;
mod global;
mod stmt;
mod types;
mod validate;

pub use arena::{Arena, Handle, UniqueArena};
pub use diag::{InfoLog, Message, Severity, SourceLocation};
pub use display::{dump_module, format_type};
pub use error::IrError;
pub use expr::{BinaryOp, BuiltinFunction, Expression, Literal, SwizzleComponent, UnaryOp};
pub use func::{Function, FunctionArgument, LocalVariable};
pub use global::{AddressSpace, GlobalVariable};
pub use stmt::{Block, Statement};
pub use types::{SamplerDim, ScalarKind, Type, VectorSize};
pub use validate::{PointerRoot, pointer_root, validate};

/// The lowered form of one shader, or of one linked stage.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Interned types.
    pub types: UniqueArena<Type>,
    /// Module-scope variables.
    pub global_variables: Arena<GlobalVariable>,
    /// Initializers of module-scope variables.
    pub global_expressions: Arena<Expression>,
    /// Function definitions and prototypes.
    pub functions: Arena<Function>,
}

impl Module {
    /// Returns `true` if the shader produced no translatable constructs.
    pub fn is_empty(&self) -> bool {
        self.global_variables.is_empty() && self.functions.is_empty()
    }

    /// Looks a module-scope variable up by name.
    pub fn find_global(&self, name: &str) -> Option<Handle<GlobalVariable>> {
        self.global_variables
            .iter()
            .find(|(_, var)| var.name == name)
            .map(|(h, _)| h)
    }

    /// The `void main()` definition, if present.
    pub fn entry_point(&self) -> Option<Handle<Function>> {
        self.functions
            .iter()
            .find(|(_, f)| f.is_entry_point())
            .map(|(h, _)| h)
    }

    /// Returns `true` if any function body stores to `var` (directly or
    /// through an element/component).
    pub fn writes_global(&self, var: Handle<GlobalVariable>) -> bool {
        fn block_writes(block: &[Statement], func: &Function, var: Handle<GlobalVariable>) -> bool {
            block.iter().any(|stmt| match stmt {
                Statement::Store { pointer, .. } => {
                    pointer_root(&func.expressions, *pointer) == Some(PointerRoot::Global(var))
                }
                Statement::If { accept, reject, .. } => {
                    block_writes(accept, func, var) || block_writes(reject, func, var)
                }
                Statement::Loop {
                    body, continuing, ..
                } => block_writes(body, func, var) || block_writes(continuing, func, var),
                _ => false,
            })
        }
        self.functions
            .iter()
            .any(|(_, func)| block_writes(&func.body, func, var))
    }
}
