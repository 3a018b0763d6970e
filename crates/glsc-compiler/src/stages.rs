//! The interface between the driver and the compilation stages.
//!
//! The driver never calls a stage directly. Everything goes through
//! [`Toolchain`], so tests can count, fail, or fake individual stages, and
//! the reference implementation [`GlslToolchain`] stays swappable.

use glsc_context::{CapabilityContext, Dialect, ShaderKind, Version};
use glsc_ir::{InfoLog, IrError, Module};
use glsc_link::{LinkInput, LinkOutput};
use glsc_opt::PassManager;
use glsc_parser::{Lowered, TranslationUnit};

/// Output of the preprocessing stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Preprocessed {
    /// Source with directives applied and macros expanded.
    pub source: String,
    /// Language version the shader requested.
    pub version: Version,
    /// Set if preprocessing failed; the message is in the log.
    pub error: bool,
}

/// The stage algorithms a build runs.
///
/// Stages report problems with the shader in the [`InfoLog`] they are
/// given; only [`Toolchain::validate_ir`] fails with an error, since a
/// malformed module is a bug in a stage and not in the shader.
pub trait Toolchain {
    /// Expands directives and macros.
    fn preprocess(
        &self,
        source: &str,
        ctx: &CapabilityContext,
        dialect: Dialect,
        log: &mut InfoLog,
    ) -> Preprocessed;

    /// Parses preprocessed source. A failed parse yields whatever was
    /// recognized (possibly nothing) and logs the error.
    fn parse(&self, source: &str, version: Version, log: &mut InfoLog) -> TranslationUnit;

    /// Checks the syntax tree and translates it to IR.
    fn lower(
        &self,
        ast: &TranslationUnit,
        ctx: &CapabilityContext,
        kind: ShaderKind,
        version: Version,
        log: &mut InfoLog,
    ) -> Lowered;

    /// Runs every optimization once over `module`. Returns `true` on
    /// progress.
    fn optimize_pass(&self, module: &mut Module, budget: u32) -> bool;

    /// Checks the structural invariants of `module`.
    fn validate_ir(&self, module: &Module) -> Result<(), IrError>;

    /// Links compiled shaders into a program.
    fn link(&self, inputs: &[LinkInput<'_>], ctx: &CapabilityContext) -> LinkOutput;
}

/// The reference toolchain: `glsc-parser`, `glsc-opt`, and `glsc-link`.
#[derive(Debug, Default)]
pub struct GlslToolchain {
    passes: PassManager,
}

impl GlslToolchain {
    /// A toolchain running the standard optimization passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolchain running `passes` instead of the standard set.
    pub fn with_passes(passes: PassManager) -> Self {
        Self { passes }
    }
}

impl Toolchain for GlslToolchain {
    fn preprocess(
        &self,
        source: &str,
        ctx: &CapabilityContext,
        dialect: Dialect,
        log: &mut InfoLog,
    ) -> Preprocessed {
        debug_assert_eq!(dialect, ctx.dialect(), "context built for another dialect");
        let errors_before = log.error_count();
        let pre = glsc_parser::preprocess(source, ctx, log);
        Preprocessed {
            source: pre.source,
            version: pre.version,
            error: log.error_count() > errors_before,
        }
    }

    fn parse(&self, source: &str, version: Version, log: &mut InfoLog) -> TranslationUnit {
        match glsc_parser::parse(source, version) {
            Ok(unit) => unit,
            Err(err) => {
                log.error(Some(err.location), err.to_string());
                TranslationUnit::default()
            }
        }
    }

    fn lower(
        &self,
        ast: &TranslationUnit,
        ctx: &CapabilityContext,
        kind: ShaderKind,
        version: Version,
        log: &mut InfoLog,
    ) -> Lowered {
        glsc_parser::lower(ast, ctx, kind, version, log)
    }

    fn optimize_pass(&self, module: &mut Module, budget: u32) -> bool {
        self.passes.run_once(module, budget)
    }

    fn validate_ir(&self, module: &Module) -> Result<(), IrError> {
        glsc_ir::validate(module)
    }

    fn link(&self, inputs: &[LinkInput<'_>], ctx: &CapabilityContext) -> LinkOutput {
        glsc_link::link(inputs, ctx)
    }
}

/// Interprets a source buffer as text. Invalid UTF-8 is reported like a
/// preprocessing error.
pub(crate) fn decode_source<'a>(bytes: &'a [u8], log: &mut InfoLog) -> Option<&'a str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            let line = bytes[..err.valid_up_to()]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            log.error(
                Some(glsc_ir::SourceLocation::new(line as u32 + 1, 0)),
                "source is not valid UTF-8",
            );
            None
        }
    }
}
