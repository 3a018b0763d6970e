//! The per-shader compilation state machine.
//!
//! A [`ShaderUnit`] moves strictly forward through
//! `Created → Preprocessed → Parsed → Lowered → Optimized` and ends in a
//! terminal compile status. A stage that logs an error jumps straight to the
//! terminal state; the remaining stages never run.

use std::fmt;
use std::io::{self, Write};

use glsc_context::{CapabilityContext, ShaderKind, Version};
use glsc_ir::{InfoLog, Module, dump_module};

use crate::config::Dumps;
use crate::error::CompileError;
use crate::loader::SourceBuffer;
use crate::optimize::optimize;
use crate::stages::{Toolchain, decode_source};

/// Most built-in function references a unit may carry to link time.
pub const MAX_BUILTIN_REFS: usize = 64;

/// Outcome of a unit's single compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileStatus {
    /// Not compiled yet.
    Pending,
    /// Compiled without errors.
    Succeeded,
    /// Compilation logged at least one error.
    Failed,
}

impl fmt::Display for CompileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum Stage {
    Created,
    Preprocessed,
    Parsed,
    Lowered,
    Optimized,
}

/// State that only lives for the duration of one [`ShaderUnit::compile`].
struct CompileState {
    stage: Stage,
    log: InfoLog,
    version: Version,
    builtins: Vec<String>,
    module: Option<Module>,
    dump_error: Option<io::Error>,
}

impl CompileState {
    fn advance(&mut self, stage: Stage, name: &str) {
        log::debug!("{name}: {:?} -> {stage:?}", self.stage);
        self.stage = stage;
    }

    /// Writes one labelled dump. A write error is kept for the caller and
    /// silences later dumps; it never changes the compile outcome.
    fn dump(&mut self, out: &mut dyn Write, label: &str, name: &str, body: &dyn fmt::Display) {
        if self.dump_error.is_some() {
            return;
        }
        if let Err(err) = write!(out, "{label} for {name}:\n{body}\n") {
            log::debug!("{name}: {label} dump failed: {err}");
            self.dump_error = Some(err);
        }
    }
}

/// Options that affect a single unit's compilation.
#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Intermediate forms to print.
    pub dumps: Dumps,
    /// Rewrite budget per optimization pass.
    pub pass_budget: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dumps: Dumps::default(),
            pass_budget: glsc_opt::DEFAULT_PASS_BUDGET,
        }
    }
}

/// One shader source and everything its compilation produced.
#[derive(Debug)]
pub struct ShaderUnit {
    name: String,
    kind: ShaderKind,
    source: SourceBuffer,
    status: CompileStatus,
    version: Option<Version>,
    log: InfoLog,
    module: Option<Module>,
    builtins: Vec<String>,
}

impl ShaderUnit {
    /// A pending unit compiling `source` as a `kind` shader. The unit is
    /// named after the source path.
    pub fn new(source: SourceBuffer, kind: ShaderKind) -> Self {
        Self {
            name: source.path().display().to_string(),
            kind,
            source,
            status: CompileStatus::Pending,
            version: None,
            log: InfoLog::new(),
            module: None,
            builtins: Vec::new(),
        }
    }

    /// The source path, for messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pipeline stage.
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// The source buffer.
    pub fn source(&self) -> &SourceBuffer {
        &self.source
    }

    /// Compile status.
    pub fn status(&self) -> CompileStatus {
        self.status
    }

    /// Language version detected during preprocessing.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Diagnostics of the compilation.
    pub fn log(&self) -> &InfoLog {
        &self.log
    }

    /// The optimized IR of a successful compilation.
    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    /// Built-in functions the shader references, in first-use order.
    pub fn builtins(&self) -> &[String] {
        &self.builtins
    }

    /// Runs the pipeline. Returns the final compile status as a `bool`.
    ///
    /// Shader errors are not `Err`: they are in [`ShaderUnit::log`] and give
    /// `Ok(false)`. `Err` means the unit was already compiled, a stage
    /// produced malformed IR, or a dump could not be written. A failed dump
    /// is reported after the unit settled, so its status reflects only the
    /// shader itself.
    pub fn compile(
        &mut self,
        ctx: &CapabilityContext,
        toolchain: &dyn Toolchain,
        options: &CompileOptions,
        out: &mut dyn Write,
    ) -> Result<bool, CompileError> {
        if self.status != CompileStatus::Pending {
            return Err(CompileError::AlreadyCompiled {
                name: self.name.clone(),
            });
        }

        let mut state = CompileState {
            stage: Stage::Created,
            log: InfoLog::new(),
            version: Version::default_for(ctx.dialect()),
            builtins: Vec::new(),
            module: None,
            dump_error: None,
        };
        let outcome = self.run_stages(&mut state, ctx, toolchain, options, out);
        let dump_error = state.dump_error.take();
        let succeeded = self.finish(state, outcome.is_ok());
        log::debug!(
            "{}: compile {}",
            self.name,
            if succeeded { "succeeded" } else { "failed" }
        );
        outcome?;
        match dump_error {
            Some(err) => Err(err.into()),
            None => Ok(succeeded),
        }
    }

    fn run_stages(
        &self,
        state: &mut CompileState,
        ctx: &CapabilityContext,
        toolchain: &dyn Toolchain,
        options: &CompileOptions,
        out: &mut dyn Write,
    ) -> Result<(), CompileError> {
        let Some(text) = decode_source(self.source.bytes(), &mut state.log) else {
            return Ok(());
        };
        let pre = toolchain.preprocess(text, ctx, ctx.dialect(), &mut state.log);
        state.version = pre.version;
        if pre.error || state.log.has_errors() {
            return Ok(());
        }
        state.advance(Stage::Preprocessed, &self.name);

        let ast = toolchain.parse(&pre.source, pre.version, &mut state.log);
        if options.dumps.ast {
            state.dump(out, "AST", &self.name, &ast);
        }
        if state.log.has_errors() {
            return Ok(());
        }
        state.advance(Stage::Parsed, &self.name);

        if ast.is_empty() {
            state.module = Some(Module::default());
            return Ok(());
        }
        let lowered = toolchain.lower(&ast, ctx, self.kind, pre.version, &mut state.log);
        state.builtins = lowered.builtins;
        if state.log.has_errors() {
            return Ok(());
        }
        let mut module = lowered.module;
        toolchain.validate_ir(&module)?;
        state.advance(Stage::Lowered, &self.name);
        if options.dumps.hir {
            state.dump(out, "HIR", &self.name, &dump_module(&module));
        }

        if !module.is_empty() {
            let summary = optimize(toolchain, &mut module, options.pass_budget)?;
            log::debug!("{}: optimized in {} passes", self.name, summary.passes);
        }
        state.advance(Stage::Optimized, &self.name);
        if options.dumps.lir {
            state.dump(out, "LIR", &self.name, &dump_module(&module));
        }
        state.module = Some(module);
        Ok(())
    }

    /// Moves the results out of `state` and settles the compile status.
    fn finish(&mut self, state: CompileState, ran_to_completion: bool) -> bool {
        let CompileState {
            log,
            version,
            builtins,
            module,
            ..
        } = state;
        self.log = log;
        self.version = Some(version);

        let mut refs = Vec::with_capacity(MAX_BUILTIN_REFS);
        for name in builtins {
            if refs.len() == MAX_BUILTIN_REFS {
                self.log.error(
                    None,
                    format!("too many built-in function references (at most {MAX_BUILTIN_REFS})"),
                );
                break;
            }
            refs.push(name);
        }
        self.builtins = refs;

        let succeeded = ran_to_completion && !self.log.has_errors();
        self.module = if succeeded { module } else { None };
        self.status = if succeeded {
            CompileStatus::Succeeded
        } else {
            CompileStatus::Failed
        };
        succeeded
    }
}
