//! Error types of the build driver.
//!
//! Shader problems (syntax errors, type errors, link failures) are not
//! errors of this crate: they are recorded in info logs and reflected in
//! compile and link status. The enums here cover bad invocations, I/O
//! failures, misuse of the state machine, and broken IR.

use std::io;
use std::path::PathBuf;

use glsc_ir::IrError;

use crate::unit::CompileStatus;

/// The command line named something that cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// No shader files were given.
    #[error("no input files")]
    NoInputs,

    /// A path does not end in a recognized shader suffix.
    #[error("`{}' is not a .vert, .geom or .frag file", path.display())]
    UnknownExtension { path: PathBuf },
}

/// A source file could not be read.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be opened or read to the end.
    #[error("File \"{}\" does not exist.", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A shader unit could not be run through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The unit already reached a terminal state.
    #[error("shader `{name}' has already been compiled")]
    AlreadyCompiled { name: String },

    /// Lowered or optimized IR failed validation.
    #[error("structural invariant violated")]
    Structural(#[from] IrError),

    /// Writing a dump failed.
    #[error("failed to write dump")]
    Io(#[from] io::Error),
}

/// A program could not be linked.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A unit has not compiled successfully.
    #[error("shader `{name}' is not compiled (status: {status})")]
    UnitNotCompiled { name: String, status: CompileStatus },

    /// The program has no units.
    #[error("program has no shaders")]
    NoShaders,

    /// The program was already linked.
    #[error("program has already been linked")]
    AlreadyLinked,

    /// Linked IR failed validation.
    #[error("structural invariant violated in linked program")]
    Structural(#[from] IrError),
}

/// Why a build stopped.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// A shader failed to compile; its info log has been written out.
    #[error("failed to compile `{}'", path.display())]
    CompileFailed { path: PathBuf },

    /// IR produced for a shader or the linked program is malformed.
    #[error("structural invariant violated while building `{}'", path.display())]
    Structural {
        path: PathBuf,
        #[source]
        source: IrError,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The program failed to link; the link log has been written out.
    #[error("failed to link program")]
    LinkFailed,

    #[error(transparent)]
    Link(#[from] LinkError),

    /// Writing to the output sink failed.
    #[error("failed to write build output")]
    Output(#[from] io::Error),
}
