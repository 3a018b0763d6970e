//! Statements: side effects and control flow.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::func::Function;

/// A sequence of statements.
pub type Block = Vec<Statement>;

/// A statement of a function body.
#[derive(Clone, Debug)]
pub enum Statement {
    /// Write `value` through `pointer`.
    Store {
        pointer: Handle<Expression>,
        value: Handle<Expression>,
    },
    /// Conditional branch.
    If {
        condition: Handle<Expression>,
        accept: Block,
        reject: Block,
    },
    /// Loop construct shared by `for`, `while`, and `do`-`while`.
    ///
    /// `continuing` runs after every iteration of `body` (also after
    /// `continue`); the loop exits after `continuing` when `break_if`
    /// evaluates to `true`.
    Loop {
        body: Block,
        continuing: Block,
        break_if: Option<Handle<Expression>>,
    },
    /// Call a user function, binding its return value to `result`.
    Call {
        function: Handle<Function>,
        arguments: Vec<Handle<Expression>>,
        result: Option<Handle<Expression>>,
    },
    /// Leave the innermost loop.
    Break,
    /// Jump to the continuing block of the innermost loop.
    Continue,
    /// Return from the function.
    Return { value: Option<Handle<Expression>> },
    /// `discard`: abandon the current fragment.
    Kill,
}

impl Statement {
    /// Returns `true` if control never falls through this statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Break | Self::Continue | Self::Return { .. } | Self::Kill
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::expr::Literal;

    #[test]
    fn terminators() {
        assert!(Statement::Kill.is_terminator());
        assert!(Statement::Return { value: None }.is_terminator());
        let mut exprs = Arena::new();
        let cond = exprs.append(Expression::Literal(Literal::Bool(true)));
        let branch = Statement::If {
            condition: cond,
            accept: vec![Statement::Break],
            reject: vec![],
        };
        assert!(!branch.is_terminator());
    }
}
