//! Functions and local variables.

use crate::arena::{Arena, Handle};
use crate::expr::Expression;
use crate::stmt::Block;
use crate::types::Type;

/// A formal parameter.
#[derive(Clone, Debug)]
pub struct FunctionArgument {
    /// Parameter name, absent in nameless prototype parameters.
    pub name: Option<String>,
    /// Parameter type.
    pub ty: Handle<Type>,
}

/// A function-local variable.
#[derive(Clone, Debug)]
pub struct LocalVariable {
    /// Source name; compiler temporaries have none.
    pub name: Option<String>,
    /// Variable type.
    pub ty: Handle<Type>,
}

/// A user function: either a definition or a prototype whose body is
/// provided by another shader at link time.
#[derive(Clone, Debug)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Formal parameters.
    pub arguments: Vec<FunctionArgument>,
    /// Return type; `None` for `void`.
    pub result: Option<Handle<Type>>,
    /// Locals, including copies of the parameters.
    pub local_variables: Arena<LocalVariable>,
    /// Expression storage for the body.
    pub expressions: Arena<Expression>,
    /// The body.
    pub body: Block,
    /// `false` for a prototype.
    pub defined: bool,
}

impl Function {
    /// Creates an empty `void` definition named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            result: None,
            local_variables: Arena::new(),
            expressions: Arena::new(),
            body: Vec::new(),
            defined: true,
        }
    }

    /// Parameter types, the part of the signature used for overloading.
    pub fn parameter_types(&self) -> Vec<Handle<Type>> {
        self.arguments.iter().map(|a| a.ty).collect()
    }

    /// Returns `true` if `self` and `other` have the same name and
    /// parameter types.
    pub fn same_signature(&self, other: &Function) -> bool {
        self.name == other.name && self.parameter_types() == other.parameter_types()
    }

    /// Returns `true` for the `void main()` entry point definition.
    pub fn is_entry_point(&self) -> bool {
        self.defined && self.name == "main" && self.arguments.is_empty() && self.result.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::UniqueArena;

    #[test]
    fn new_is_void_definition() {
        let f = Function::new("main");
        assert!(f.defined);
        assert!(f.result.is_none());
        assert!(f.is_entry_point());
    }

    #[test]
    fn signature_compares_parameter_types() {
        let mut types = UniqueArena::new();
        let float = types.insert(Type::FLOAT);
        let vec4 = types.insert(Type::VEC4);

        let mut a = Function::new("shade");
        a.arguments.push(FunctionArgument {
            name: Some("x".into()),
            ty: float,
        });
        let mut b = a.clone();
        b.arguments[0].name = None;
        b.defined = false;
        assert!(a.same_signature(&b));

        b.arguments[0].ty = vec4;
        assert!(!a.same_signature(&b));
        assert!(!a.is_entry_point());
    }
}
