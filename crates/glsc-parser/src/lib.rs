//! GLSL front end for glsc.
//!
//! Three passes turn shader text into an [`glsc_ir::Module`]:
//!
//! 1. [`preprocess`] expands directives and macros and determines the
//!    language [`Version`](glsc_context::Version),
//! 2. [`parse`] builds a [`TranslationUnit`],
//! 3. [`lower`] checks the unit and produces IR.
//!
//! Preprocessing and lowering write their diagnostics to an
//! [`InfoLog`](glsc_ir::InfoLog); parsing stops at the first
//! [`SyntaxError`].

pub mod ast;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod preprocess;

pub use ast::TranslationUnit;
pub use lower::{Lowered, lower};
pub use parser::parse;
pub use preprocess::{Preprocessed, preprocess};

use glsc_ir::SourceLocation;

/// The first syntax error of a shader.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("syntax error, {message}")]
pub struct SyntaxError {
    /// Where the offending token starts.
    pub location: SourceLocation,
    /// What was found and what was expected.
    pub message: String,
}
