//! Structural IR errors.

/// A violated structural invariant of a [`Module`](crate::Module).
///
/// These indicate a bug in the stage that produced or last transformed the
/// IR, never a problem with the shader source.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A handle does not address a node of its arena.
    #[error("{context}: {what} handle {index} out of bounds (arena size: {size})")]
    BadHandle {
        context: String,
        what: &'static str,
        index: usize,
        size: usize,
    },

    /// An expression refers to an operand allocated after itself.
    #[error("{context}: expression [{expr}] refers forward to operand [{operand}]")]
    ForwardReference {
        context: String,
        expr: usize,
        operand: usize,
    },

    /// A store target does not evaluate to a pointer.
    #[error("{context}: store target [{expr}] is not a pointer")]
    NotAPointer { context: String, expr: usize },

    /// A store writes to a read-only global.
    #[error("{context}: store to read-only global `{name}'")]
    ReadOnlyStore { context: String, name: String },

    /// `break`/`continue` outside of a loop.
    #[error("{context}: `{statement}' outside of a loop")]
    MisplacedJump {
        context: String,
        statement: &'static str,
    },

    /// A function-argument expression names a missing parameter.
    #[error("{context}: argument index {index} out of range ({count} parameters)")]
    BadArgument {
        context: String,
        index: u32,
        count: usize,
    },

    /// A call's result is not a matching `CallResult` expression.
    #[error("{context}: call result [{expr}] is not bound to the called function")]
    UnboundCallResult { context: String, expr: usize },

    /// A function prototype has a body.
    #[error("{context}: prototype has a body")]
    PrototypeWithBody { context: String },
}
